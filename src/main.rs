use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pantry::app;
use pantry::cache::DiskStorage;
use pantry::config::Config;
use pantry::server::Server;

fn init_tracing() {
    // RUST_LOG overrides, e.g. RUST_LOG=pantry=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        upstream = %config.upstream,
        cache_dir = %config.cache_dir.display(),
        version = %config.cache_version,
        "starting pantry"
    );

    let storage = DiskStorage::new(&config.cache_dir);
    let mut router = app::router(&config, storage).context("failed to build upstream client")?;
    app::bring_up(&mut router)
        .await
        .context("offline cache could not be prepared")?;

    let pipeline = app::pipeline(Arc::new(router));
    let server = Server::bind(config.listen.to_string()).await?;

    server
        .run_until(
            move |req| {
                let pipeline = pipeline.clone();
                async move { pipeline.handle(req).await }
            },
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                }
            },
        )
        .await?;

    info!("pantry stopped");
    Ok(())
}

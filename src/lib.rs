//! # pantry
//!
//! An offline-capable front proxy for a recipe and meal-planning app.
//!
//! Requests pass through a middleware [`Pipeline`](middleware::Pipeline):
//! write requests to record endpoints are checked against declarative
//! [`schema`]s and rejected with `422` before they reach the origin; every
//! request is then answered by the [`cache`] router, which serves static
//! assets and recipe reads from a versioned store, keeps a copy of chat
//! traffic, and falls back to stored copies when the origin is unreachable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pantry::{app, cache::MemoryStorage, config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let mut router = app::router(&config, MemoryStorage::new())?;
//!     app::bring_up(&mut router).await?;
//!
//!     let pipeline = app::pipeline(Arc::new(router));
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.run(move |req| {
//!         let pipeline = pipeline.clone();
//!         async move { pipeline.handle(req).await }
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod schema;
pub mod server;

pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};

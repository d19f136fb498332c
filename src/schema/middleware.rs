//! Middleware that rejects invalid records before they reach the origin.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::catalog::{SchemaRoute, stamp_timestamp, write_routes};
use super::validate;
use crate::router::RouteTable;
use crate::{
    Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

/// Validates JSON bodies on write routes.
///
/// Requests whose method and path match no route pass straight through.
/// For a matching route the body must parse as JSON (`400` otherwise); the
/// route's timestamp field is filled in when absent, and the record is
/// validated. A violation short-circuits with `422` and a body naming the
/// field and rule:
///
/// ```text
/// {"error":"missing required field `title`","field":"title","rule":"missing_field"}
/// ```
///
/// Records that pass are forwarded with the (possibly stamped) body.
pub struct SchemaMiddleware {
    routes: Arc<RouteTable<SchemaRoute>>,
}

impl Default for SchemaMiddleware {
    fn default() -> Self {
        Self::new(write_routes())
    }
}

impl SchemaMiddleware {
    pub fn new(routes: RouteTable<SchemaRoute>) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }
}

impl Middleware for SchemaMiddleware {
    fn handle(
        &self,
        mut ctx: Context,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let routes = Arc::clone(&self.routes);

        Box::pin(async move {
            let method = ctx.request().method().clone();
            if !method.is_write() {
                return next.run(ctx).await;
            }
            let Some((route, params)) = routes.find(&method, ctx.request().path()) else {
                return next.run(ctx).await;
            };

            let mut record: Value = match ctx.json() {
                Ok(record) => record,
                Err(e) => {
                    debug!(path = %ctx.request().path(), error = %e, "malformed record body");
                    return Response::json(
                        StatusCode::BadRequest,
                        &json!({ "error": format!("malformed JSON body: {e}") }),
                    );
                }
            };

            let stamped = route
                .stamp
                .is_some_and(|field| stamp_timestamp(&mut record, field, Utc::now()));

            if let Err(violation) = validate(&record, &route.schema) {
                warn!(
                    schema = route.name,
                    path = %ctx.request().path(),
                    rule = violation.rule(),
                    field = violation.field().unwrap_or("-"),
                    "record rejected"
                );
                return Response::json(
                    StatusCode::UnprocessableEntity,
                    &json!({
                        "error": violation.to_string(),
                        "field": violation.field(),
                        "rule": violation.rule(),
                    }),
                );
            }

            if stamped {
                match serde_json::to_vec(&record) {
                    Ok(body) => ctx.replace_body(body),
                    Err(e) => {
                        warn!(error = %e, "failed to re-serialize stamped record");
                        return Response::new(StatusCode::InternalServerError);
                    }
                }
            }
            debug!(
                schema = route.name,
                id = params.get("id").unwrap_or("-"),
                stamped,
                "record accepted"
            );
            next.run(ctx).await
        })
    }
}

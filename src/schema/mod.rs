//! Record validation against declarative field schemas.
//!
//! A [`Schema`] is an ordered table of [`FieldRule`]s; [`validate`] walks it
//! against a JSON record and returns the first broken rule as a
//! [`ValidationError`]. Validation is a pure function of its inputs and safe
//! to call from any task.
//!
//! [`catalog`] holds the app's document schemas and write routes, and
//! [`SchemaMiddleware`] enforces them in the request pipeline.

pub mod catalog;
mod field;
mod middleware;
mod validate;

pub use field::{FieldRule, FieldType, Schema, SchemaBuilder};
pub use middleware::SchemaMiddleware;
pub use validate::{ValidationError, validate, validate_map};

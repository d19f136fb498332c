//! Record validation against a [`Schema`].

use chrono::DateTime;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{FieldRule, FieldType, Schema};

/// The first rule a record broke.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("record must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{0}` must be of type {1}")]
    WrongType(String, FieldType),

    #[error("field `{0}` is below the minimum of {1}")]
    BelowMinimum(String, f64),

    #[error("field `{0}` is above the maximum of {1}")]
    AboveMaximum(String, f64),
}

impl ValidationError {
    /// The offending field, if the failure is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField(f)
            | Self::WrongType(f, _)
            | Self::BelowMinimum(f, _)
            | Self::AboveMaximum(f, _) => Some(f),
        }
    }

    /// A short machine-readable name for the broken rule.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::MissingField(_) => "missing_field",
            Self::WrongType(..) => "wrong_type",
            Self::BelowMinimum(..) => "below_minimum",
            Self::AboveMaximum(..) => "above_maximum",
        }
    }
}

/// Validates `record` against `schema`, stopping at the first violation.
///
/// Fields are checked in schema order. `null` counts as absent. Fields the
/// schema does not mention are ignored, and absent optional fields are
/// skipped without defaulting.
///
/// # Examples
///
/// ```
/// use pantry::schema::{validate, FieldType, Schema, ValidationError};
/// use serde_json::json;
///
/// let schema = Schema::builder()
///     .required("title", FieldType::String)
///     .optional("servings", FieldType::Number)
///     .min(1.0)
///     .build();
///
/// assert!(validate(&json!({"title": "Shakshuka", "servings": 2}), &schema).is_ok());
/// assert_eq!(
///     validate(&json!({"title": "Shakshuka", "servings": 0}), &schema),
///     Err(ValidationError::BelowMinimum("servings".into(), 1.0)),
/// );
/// ```
pub fn validate(record: &Value, schema: &Schema) -> Result<(), ValidationError> {
    let record = record.as_object().ok_or(ValidationError::NotAnObject)?;
    validate_map(record, schema)
}

/// Like [`validate`], for a record already known to be an object.
pub fn validate_map(record: &Map<String, Value>, schema: &Schema) -> Result<(), ValidationError> {
    for (name, rule) in schema.fields() {
        match record.get(name).filter(|v| !v.is_null()) {
            None if rule.required => return Err(ValidationError::MissingField(name.to_owned())),
            None => continue,
            Some(value) => check_field(name, rule, value)?,
        }
    }
    Ok(())
}

fn check_field(name: &str, rule: &FieldRule, value: &Value) -> Result<(), ValidationError> {
    let measure = measure(rule.kind, value)
        .ok_or_else(|| ValidationError::WrongType(name.to_owned(), rule.kind))?;

    // Dates carry no bounds.
    let Some(measure) = measure else {
        return Ok(());
    };

    if let Some(min) = rule.minimum {
        if measure < min {
            return Err(ValidationError::BelowMinimum(name.to_owned(), min));
        }
    }
    if let Some(max) = rule.maximum {
        if measure > max {
            return Err(ValidationError::AboveMaximum(name.to_owned(), max));
        }
    }
    Ok(())
}

// Outer `None`: wrong type. Inner `None`: type has no bounded measure.
fn measure(kind: FieldType, value: &Value) -> Option<Option<f64>> {
    match (kind, value) {
        (FieldType::Number, Value::Number(n)) => n.as_f64().map(Some),
        (FieldType::Array, Value::Array(items)) => Some(Some(items.len() as f64)),
        (FieldType::String | FieldType::ObjectId, Value::String(s)) => {
            Some(Some(s.chars().count() as f64))
        }
        (FieldType::Date, value) if is_timestamp(value) => Some(None),
        _ => None,
    }
}

fn is_timestamp(value: &Value) -> bool {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
        Value::Number(n) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

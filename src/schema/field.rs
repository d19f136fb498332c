//! Declarative field schemas.

use std::fmt;

/// The closed set of primitive kinds a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Array,
    /// An RFC 3339 string or integer epoch milliseconds.
    Date,
    /// A reference to another document; ids travel as strings at this layer.
    ObjectId,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Array => "array",
            Self::Date => "date",
            Self::ObjectId => "objectId",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules for a single field.
///
/// `minimum` and `maximum` are inclusive. They bound the number itself for
/// [`FieldType::Number`], the element count for arrays, and the character
/// count for strings and ids. Dates ignore bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub kind: FieldType,
    pub required: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl FieldRule {
    pub fn new(kind: FieldType, required: bool) -> Self {
        Self {
            kind,
            required,
            minimum: None,
            maximum: None,
        }
    }
}

/// An ordered list of field rules.
///
/// Order matters: validation walks fields in definition order and reports the
/// first violation.
///
/// # Examples
///
/// ```
/// use pantry::schema::{FieldType, Schema};
///
/// let schema = Schema::builder()
///     .required("title", FieldType::String)
///     .min(1.0)
///     .optional("servings", FieldType::Number)
///     .min(1.0)
///     .max(24.0)
///     .build();
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.field("servings").unwrap().maximum, Some(24.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Fields in definition order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    /// Looks up a field's rule by name.
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Fluent construction for [`Schema`]. `min` and `max` apply to the field
/// added last; redefining a name replaces the earlier rule in place.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldRule)>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn required(self, name: impl Into<String>, kind: FieldType) -> Self {
        self.field(name, FieldRule::new(kind, true))
    }

    #[must_use]
    pub fn optional(self, name: impl Into<String>, kind: FieldType) -> Self {
        self.field(name, FieldRule::new(kind, false))
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    #[must_use]
    pub fn min(mut self, minimum: f64) -> Self {
        if let Some((_, rule)) = self.fields.last_mut() {
            rule.minimum = Some(minimum);
        }
        self
    }

    #[must_use]
    pub fn max(mut self, maximum: f64) -> Self {
        if let Some((_, rule)) = self.fields.last_mut() {
            rule.maximum = Some(maximum);
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_definition_order() {
        let schema = Schema::builder()
            .required("userId", FieldType::ObjectId)
            .required("title", FieldType::String)
            .optional("tags", FieldType::Array)
            .build();
        let names: Vec<_> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["userId", "title", "tags"]);
    }

    #[test]
    fn redefining_replaces_in_place() {
        let schema = Schema::builder()
            .optional("rating", FieldType::String)
            .required("title", FieldType::String)
            .required("rating", FieldType::Number)
            .build();
        let names: Vec<_> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["rating", "title"]);
        assert_eq!(schema.field("rating").unwrap().kind, FieldType::Number);
    }

    #[test]
    fn bounds_without_a_field_are_ignored() {
        let schema = Schema::builder().min(1.0).max(2.0).build();
        assert!(schema.is_empty());
    }

    #[test]
    fn type_names() {
        assert_eq!(FieldType::ObjectId.to_string(), "objectId");
        assert_eq!(FieldType::Date.to_string(), "date");
    }
}

//! Schemas for the documents the meal-planning app persists, and the write
//! routes that submit them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::{FieldType, Schema};
use crate::Method;
use crate::router::RouteTable;

/// A user's saved or generated recipe.
pub fn recipe() -> Schema {
    Schema::builder()
        .required("userId", FieldType::ObjectId)
        .required("title", FieldType::String)
        .min(1.0)
        .max(200.0)
        .required("ingredients", FieldType::Array)
        .min(1.0)
        .required("instructions", FieldType::Array)
        .min(1.0)
        .optional("cuisine", FieldType::String)
        .optional("prepTime", FieldType::Number)
        .min(0.0)
        .optional("cookTime", FieldType::Number)
        .min(0.0)
        .optional("servings", FieldType::Number)
        .min(1.0)
        .max(100.0)
        .optional("calories", FieldType::Number)
        .min(0.0)
        .optional("tags", FieldType::Array)
        .required("dateAdded", FieldType::Date)
        .build()
}

/// A generated plan covering one to fourteen days.
pub fn meal_plan() -> Schema {
    Schema::builder()
        .required("userId", FieldType::ObjectId)
        .required("days", FieldType::Number)
        .min(1.0)
        .max(14.0)
        .required("meals", FieldType::Array)
        .min(1.0)
        .optional("mealsPerDay", FieldType::Number)
        .min(1.0)
        .max(6.0)
        .optional("caloriesPerDay", FieldType::Number)
        .min(800.0)
        .max(10_000.0)
        .optional("createdAt", FieldType::Date)
        .build()
}

/// Dietary preferences that steer meal-plan generation.
pub fn preferences() -> Schema {
    Schema::builder()
        .required("userId", FieldType::ObjectId)
        .optional("dietaryRestrictions", FieldType::Array)
        .optional("allergies", FieldType::Array)
        .optional("cuisines", FieldType::Array)
        .optional("caloriesPerDay", FieldType::Number)
        .min(800.0)
        .max(10_000.0)
        .optional("servingsPerMeal", FieldType::Number)
        .min(1.0)
        .max(12.0)
        .build()
}

/// A bookmark from a user to an existing recipe.
pub fn saved_recipe() -> Schema {
    Schema::builder()
        .required("userId", FieldType::ObjectId)
        .required("recipeId", FieldType::ObjectId)
        .optional("savedAt", FieldType::Date)
        .build()
}

/// A write route's schema plus the timestamp field the route fills in when
/// the client left it out.
#[derive(Debug, Clone)]
pub struct SchemaRoute {
    pub name: &'static str,
    pub schema: Schema,
    pub stamp: Option<&'static str>,
}

impl SchemaRoute {
    fn new(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            stamp: None,
        }
    }

    fn stamped(mut self, field: &'static str) -> Self {
        self.stamp = Some(field);
        self
    }
}

/// The app's write routes, keyed by method and path.
pub fn write_routes() -> RouteTable<SchemaRoute> {
    let mut table = RouteTable::new();
    let recipe = SchemaRoute::new("recipe", recipe()).stamped("dateAdded");

    table.insert(Some(Method::Post), "/api/recipes", recipe.clone());
    table.insert(Some(Method::Put), "/api/recipes/:id", recipe);
    table.insert(
        Some(Method::Post),
        "/api/meal-plans",
        SchemaRoute::new("meal_plan", meal_plan()).stamped("createdAt"),
    );
    table.insert(
        Some(Method::Put),
        "/api/preferences",
        SchemaRoute::new("preferences", preferences()),
    );
    table.insert(
        Some(Method::Post),
        "/api/saved-recipes",
        SchemaRoute::new("saved_recipe", saved_recipe()).stamped("savedAt"),
    );
    table
}

/// Sets `field` to `now` (RFC 3339, millisecond precision) when the record
/// lacks it. Returns whether the record changed.
pub fn stamp_timestamp(record: &mut Value, field: &str, now: DateTime<Utc>) -> bool {
    let Some(map) = record.as_object_mut() else {
        return false;
    };
    if map.get(field).is_some_and(|v| !v.is_null()) {
        return false;
    }
    map.insert(
        field.to_owned(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    true
}

/// Fills in a recipe's `dateAdded` when absent.
pub fn stamp_date_added(record: &mut Value, now: DateTime<Utc>) -> bool {
    stamp_timestamp(record, "dateAdded", now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ValidationError, validate};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn recipe_requires_date_added_until_stamped() {
        let mut record = json!({
            "userId": "u1",
            "title": "Chana masala",
            "ingredients": ["chickpeas", "tomato"],
            "instructions": ["simmer"],
        });
        assert_eq!(
            validate(&record, &recipe()),
            Err(ValidationError::MissingField("dateAdded".into()))
        );
        assert!(stamp_date_added(&mut record, now()));
        assert_eq!(record["dateAdded"], "2026-10-19T12:00:00.000Z");
        assert!(validate(&record, &recipe()).is_ok());
    }

    #[test]
    fn stamp_keeps_client_value() {
        let mut record = json!({"dateAdded": "2025-01-01T00:00:00Z"});
        assert!(!stamp_date_added(&mut record, now()));
        assert_eq!(record["dateAdded"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn stamp_replaces_null_and_ignores_non_objects() {
        let mut record = json!({"savedAt": null});
        assert!(stamp_timestamp(&mut record, "savedAt", now()));
        let mut list = json!([]);
        assert!(!stamp_timestamp(&mut list, "savedAt", now()));
    }

    #[test]
    fn meal_plan_bounds_days() {
        let plan = |days: u32| json!({"userId": "u1", "days": days, "meals": [{"name": "oats"}]});
        assert!(validate(&plan(7), &meal_plan()).is_ok());
        assert_eq!(
            validate(&plan(15), &meal_plan()),
            Err(ValidationError::AboveMaximum("days".into(), 14.0))
        );
    }

    #[test]
    fn preferences_only_need_a_user() {
        assert!(validate(&json!({"userId": "u1"}), &preferences()).is_ok());
        assert_eq!(
            validate(&json!({"userId": "u1", "servingsPerMeal": 0}), &preferences()),
            Err(ValidationError::BelowMinimum("servingsPerMeal".into(), 1.0))
        );
    }

    #[test]
    fn saved_recipe_needs_both_ids() {
        assert_eq!(
            validate(&json!({"userId": "u1"}), &saved_recipe()),
            Err(ValidationError::MissingField("recipeId".into()))
        );
    }

    #[test]
    fn write_routes_cover_app_endpoints() {
        let routes = write_routes();
        let (route, params) = routes.find(&Method::Put, "/api/recipes/abc").unwrap();
        assert_eq!(route.name, "recipe");
        assert_eq!(route.stamp, Some("dateAdded"));
        assert_eq!(params.get("id"), Some("abc"));

        assert!(routes.find(&Method::Get, "/api/recipes").is_none());
        assert_eq!(routes.find(&Method::Put, "/api/preferences").unwrap().0.stamp, None);
        assert_eq!(routes.find(&Method::Post, "/api/meal-plans").unwrap().0.name, "meal_plan");
    }
}

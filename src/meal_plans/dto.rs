use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::types::{iso_date_opt, Embedding};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealType {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealTypeCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealTypeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default, with = "iso_date_opt")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date_opt")]
    pub end_date: Option<Date>,
    pub user_id: Option<Uuid>,
    pub name_embedding: Option<Embedding>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealPlanCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "iso_date_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_embedding: Option<Embedding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealPlanUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "iso_date_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_embedding: Option<Embedding>,
}

/// A recipe scheduled on a day of a meal plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanRecipe {
    pub id: i64,
    pub meal_plan_id: i64,
    pub recipe_id: i64,
    pub day_of_plan: i32,
    pub meal_type_id: i64,
    pub servings: Option<i32>,
    pub notes: Option<String>,
}

/// Body of `POST /meal-plans/:id/recipes`; the plan comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanRecipeCreate {
    pub recipe_id: i64,
    pub day_of_plan: i32,
    pub meal_type_id: i64,
    #[serde(default = "default_servings")]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_servings() -> Option<i32> {
    Some(1)
}

#[derive(Debug, Serialize)]
pub(crate) struct MealPlanRecipeRow<'a> {
    pub meal_plan_id: i64,
    #[serde(flatten)]
    pub entry: &'a MealPlanRecipeCreate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealPlanRecipeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_plan: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn plan_dates_round_trip_as_iso_strings() {
        let v: MealPlanCreate = serde_json::from_value(json!({
            "name": "Week 1",
            "start_date": "2024-01-01",
            "end_date": "2024-01-07"
        }))
        .unwrap();
        assert_eq!(v.start_date, Some(date!(2024 - 01 - 01)));
        let row = crate::db::to_row(&v).unwrap();
        assert_eq!(row["end_date"], json!("2024-01-07"));
        assert!(!row.contains_key("description"));
    }

    #[test]
    fn entry_servings_default_to_one() {
        let v: MealPlanRecipeCreate = serde_json::from_value(json!({
            "meal_plan_id": 99,
            "recipe_id": 1,
            "day_of_plan": 2,
            "meal_type_id": 3
        }))
        .unwrap();
        assert_eq!(v.servings, Some(1));
        let row = crate::db::to_row(&MealPlanRecipeRow { meal_plan_id: 5, entry: &v }).unwrap();
        assert_eq!(row["meal_plan_id"], json!(5));
        assert_eq!(row["servings"], json!(1));
    }
}

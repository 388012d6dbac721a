use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Embedding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub unit_id: Option<i64>,
    pub name_embedding: Option<Embedding>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// New ingredient; (name, category) is its natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_embedding: Option<Embedding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_embedding: Option<Embedding>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::extract::default_limit")]
    pub limit: i64,
    pub category: Option<String>,
}

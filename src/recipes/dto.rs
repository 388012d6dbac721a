use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    ingredients::{Ingredient, IngredientCreate},
    types::{exact_decimal, exact_decimal_opt, Embedding, Ref},
    units::{UnitCreate, UnitWithType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    Instruction,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeInstruction {
    pub step: i32,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InstructionKind,
}

/// Ordered recipe steps.
///
/// Reads accept a JSON array, a string holding a JSON array, or older plain
/// text rows with one step per line. Always written as an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Instructions(pub Vec<RecipeInstruction>);

impl Instructions {
    fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') {
            return serde_json::from_str::<Vec<RecipeInstruction>>(trimmed).map(Self::sorted);
        }
        let steps = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| RecipeInstruction {
                step: i as i32 + 1,
                description: line.to_string(),
                kind: InstructionKind::Instruction,
            })
            .collect();
        Ok(Self(steps))
    }

    fn sorted(mut steps: Vec<RecipeInstruction>) -> Self {
        steps.sort_by_key(|s| s.step);
        Self(steps)
    }
}

impl<'de> Deserialize<'de> for Instructions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<RecipeInstruction>),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::List(steps) => Ok(Self::sorted(steps)),
            Raw::Text(text) => Self::from_text(&text).map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub instructions: Option<Instructions>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty_level: Option<String>,
    pub user_id: Option<Uuid>,
    pub title_embedding: Option<Embedding>,
    #[serde(default, skip_deserializing)]
    pub ingredients: Vec<RecipeIngredientExpanded>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Instructions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_embedding: Option<Embedding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Instructions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_embedding: Option<Embedding>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::extract::default_limit")]
    pub limit: i64,
    pub difficulty_level: Option<String>,
}

// --- ingredient links ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredientLink {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    #[serde(deserialize_with = "exact_decimal")]
    pub quantity: BigDecimal,
    pub unit_id: Option<i64>,
    pub preparation: Option<String>,
    pub notes: Option<String>,
}

/// A link with its ingredient row and unit (with nested type) attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredientExpanded {
    #[serde(flatten)]
    pub link: RecipeIngredientLink,
    pub ingredient: Option<Ingredient>,
    pub unit: Option<UnitWithType>,
}

/// Ingredient to attach to a recipe. Ingredient and unit may each be given by
/// id or as an object that is upserted by natural key.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawLinkCreate")]
pub struct NewRecipeIngredient {
    pub ingredient: Ref<IngredientCreate>,
    pub unit: Option<Ref<UnitCreate>>,
    pub quantity: BigDecimal,
    pub preparation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
struct RawLinkCreate {
    #[serde(default)]
    ingredient_id: Option<i64>,
    #[serde(default)]
    ingredient: Option<IngredientCreate>,
    #[serde(deserialize_with = "exact_decimal")]
    quantity: BigDecimal,
    #[serde(default)]
    unit_id: Option<i64>,
    #[serde(default)]
    unit: Option<UnitCreate>,
    #[serde(default)]
    preparation: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl TryFrom<RawLinkCreate> for NewRecipeIngredient {
    type Error = &'static str;

    fn try_from(raw: RawLinkCreate) -> Result<Self, Self::Error> {
        let ingredient = Ref::pick(raw.ingredient_id, raw.ingredient)
            .ok_or("Either ingredient_id or ingredient object must be provided")?;
        Ok(Self {
            ingredient,
            unit: Ref::pick(raw.unit_id, raw.unit),
            quantity: raw.quantity,
            preparation: raw.preparation,
            notes: raw.notes,
        })
    }
}

/// Link payload for `/with-objects`: the ingredient must be an object.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeIngredientWithObjects {
    pub ingredient: IngredientCreate,
    #[serde(deserialize_with = "exact_decimal")]
    pub quantity: BigDecimal,
    #[serde(default)]
    pub unit: Option<UnitCreate>,
    #[serde(default)]
    pub preparation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<RecipeIngredientWithObjects> for NewRecipeIngredient {
    fn from(v: RecipeIngredientWithObjects) -> Self {
        Self {
            ingredient: Ref::ByValue(v.ingredient),
            unit: v.unit.map(Ref::ByValue),
            quantity: v.quantity,
            preparation: v.preparation,
            notes: v.notes,
        }
    }
}

/// Row written to the link table once ingredient and unit are resolved.
#[derive(Debug, Serialize)]
pub(crate) struct LinkRow<'a> {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity: &'a BigDecimal,
    pub unit_id: Option<i64>,
    pub preparation: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeIngredientLinkUpdate {
    #[serde(default, deserialize_with = "exact_decimal_opt", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

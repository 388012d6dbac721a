use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Ref;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTypeCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitTypeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub type_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// New unit; (name, type_id) is its natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
}

/// Unit with its type given either by id or as an object to match by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawUnitWithType")]
pub struct UnitCreateWithType {
    pub name: String,
    pub unit_type: Option<Ref<UnitTypeCreate>>,
}

#[derive(Deserialize)]
struct RawUnitWithType {
    name: String,
    #[serde(default)]
    type_id: Option<i64>,
    #[serde(default, rename = "type")]
    unit_type: Option<UnitTypeCreate>,
}

impl From<RawUnitWithType> for UnitCreateWithType {
    fn from(raw: RawUnitWithType) -> Self {
        Self {
            name: raw.name,
            unit_type: Ref::pick(raw.type_id, raw.unit_type),
        }
    }
}

/// A unit with its type row nested as `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitWithType {
    #[serde(flatten)]
    pub unit: Unit,
    #[serde(rename = "type")]
    pub unit_type: Option<UnitType>,
}

#[derive(Debug, Deserialize)]
pub struct UnitListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::extract::default_limit")]
    pub limit: i64,
    pub type_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_type_prefers_embedded_object() {
        let v: UnitCreateWithType =
            serde_json::from_value(json!({ "name": "cup", "type_id": 3, "type": { "name": "volume" } })).unwrap();
        assert!(matches!(v.unit_type, Some(Ref::ByValue(UnitTypeCreate { ref name })) if name == "volume"));

        let v: UnitCreateWithType = serde_json::from_value(json!({ "name": "cup", "type_id": 3 })).unwrap();
        assert!(matches!(v.unit_type, Some(Ref::ById(3))));

        let v: UnitCreateWithType = serde_json::from_value(json!({ "name": "pinch" })).unwrap();
        assert!(v.unit_type.is_none());
    }
}

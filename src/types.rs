use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serialize};

// Plain calendar dates as `YYYY-MM-DD`.
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub(crate) use iso_date::option as iso_date_opt;

/// Embedding vector attached to a name/title. Stored and returned as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl<'de> Deserialize<'de> for Embedding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // pgvector columns come back from to_jsonb as their text form "[1,2,3]"
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<f32>),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::List(v) => Ok(Embedding(v)),
            Raw::Text(s) => serde_json::from_str::<Vec<f32>>(&s)
                .map(Embedding)
                .map_err(|e| de::Error::custom(format!("invalid embedding {s:?}: {e}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Number(serde_json::Number),
    Text(String),
}

/// Reads a decimal from a JSON number or string. Numbers go through their
/// shortest text form, so a `numeric` column read back as `0.1` stays `0.1`.
pub(crate) fn exact_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    let text = match RawDecimal::deserialize(deserializer)? {
        RawDecimal::Number(n) => n.to_string(),
        RawDecimal::Text(s) => s,
    };
    BigDecimal::from_str(text.trim()).map_err(|e| de::Error::custom(format!("invalid decimal {text:?}: {e}")))
}

pub(crate) fn exact_decimal_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BigDecimal>, D::Error> {
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "exact_decimal")] BigDecimal);

    Ok(Option::<Wrap>::deserialize(deserializer)?.map(|Wrap(d)| d))
}

/// A related row named either by id or by natural-key object.
#[derive(Debug, Clone, PartialEq)]
pub enum Ref<T> {
    ById(i64),
    ByValue(T),
}

impl<T> Ref<T> {
    /// Object wins over id when a payload carries both.
    pub fn pick(id: Option<i64>, value: Option<T>) -> Option<Self> {
        match (id, value) {
            (_, Some(v)) => Some(Ref::ByValue(v)),
            (Some(id), None) => Some(Ref::ById(id)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(default, with = "iso_date_opt")]
        day: Option<time::Date>,
        embedding: Option<Embedding>,
    }

    #[test]
    fn embedding_accepts_array_and_vector_text() {
        let a: Holder = serde_json::from_value(json!({ "embedding": [0.5, 1.0] })).unwrap();
        let b: Holder = serde_json::from_value(json!({ "embedding": "[0.5,1]" })).unwrap();
        assert_eq!(a.embedding, Some(Embedding(vec![0.5, 1.0])));
        assert_eq!(a.embedding, b.embedding);
        assert!(serde_json::from_value::<Holder>(json!({ "embedding": "nope" })).is_err());
    }

    #[derive(Deserialize)]
    struct Amount {
        #[serde(deserialize_with = "exact_decimal")]
        value: BigDecimal,
        #[serde(default, deserialize_with = "exact_decimal_opt")]
        extra: Option<BigDecimal>,
    }

    #[test]
    fn decimals_keep_their_written_digits() {
        let a: Amount = serde_json::from_value(json!({ "value": 0.1 })).unwrap();
        assert_eq!(a.value.to_string(), "0.1");
        assert_eq!(a.extra, None);
        let b: Amount = serde_json::from_value(json!({ "value": "2.50", "extra": 3 })).unwrap();
        assert_eq!(b.value, BigDecimal::from_str("2.5").unwrap());
        assert_eq!(b.extra.map(|d| d.to_string()), Some("3".to_string()));
        assert!(serde_json::from_value::<Amount>(json!({ "value": "a lot" })).is_err());
    }

    #[test]
    fn ref_prefers_object() {
        assert_eq!(Ref::pick(Some(1), Some("salt")), Some(Ref::ByValue("salt")));
        assert_eq!(Ref::<&str>::pick(Some(1), None), Some(Ref::ById(1)));
        assert_eq!(Ref::<&str>::pick(None, None), None);
    }

    #[test]
    fn dates_use_iso_format() {
        let h = Holder { day: Some(date!(2024 - 01 - 07)), embedding: None };
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["day"], json!("2024-01-07"));
        let back: Holder = serde_json::from_value(v).unwrap();
        assert_eq!(back, h);

        let missing: Holder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.day, None);
    }
}

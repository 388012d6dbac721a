//! Table-level access to the backing store.
//!
//! Services speak to the store in terms of tables and JSON rows: a row goes in
//! as an object of column values and every statement hands back the rows it
//! touched. This keeps the services identical whether they run against
//! Postgres or against the in-memory store used by the tests.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// A single row as stored: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Ingredient,
    UnitOfMeasure,
    UnitOfMeasureType,
    Recipe,
    RecipeIngredientLink,
    MealPlan,
    MealType,
    MealPlanRecipe,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Ingredient => "ingredient",
            Table::UnitOfMeasure => "unit_of_measure",
            Table::UnitOfMeasureType => "unit_of_measure_type",
            Table::Recipe => "recipe",
            Table::RecipeIngredientLink => "recipe_ingredient_link",
            Table::MealPlan => "meal_plan",
            Table::MealType => "meal_type",
            Table::MealPlanRecipe => "meal_plan_recipes",
        }
    }

    /// Join tables carry no created_at/updated_at columns.
    pub fn has_timestamps(self) -> bool {
        !matches!(self, Table::RecipeIngredientLink | Table::MealPlanRecipe)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value; `Value::Null` matches SQL NULL.
    Eq(&'static str, Value),
    /// Column equals any of the values.
    In(&'static str, Vec<Value>),
    /// Case-insensitive substring match on a text column.
    Contains(&'static str, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// Filters, ordering and range of a select statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column, value.into()));
        self
    }

    pub fn eq_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn any_of<V: Into<Value>>(mut self, column: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters
            .push(Filter::In(column, values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn contains(mut self, column: &'static str, needle: &str) -> Self {
        self.filters.push(Filter::Contains(column, needle.to_string()));
        self
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order.push(Order { column, descending: false });
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order.push(Order { column, descending: true });
        self
    }

    /// Rows `skip .. skip + limit`.
    pub fn range(mut self, skip: i64, limit: i64) -> Self {
        self.offset = Some(skip);
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn into_filters(self) -> Vec<Filter> {
        self.filters
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("refusing to {0} without a filter")]
    Unfiltered(&'static str),
    #[error("{0} row collided on insert but is gone on lookup")]
    Vanished(&'static str),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts one row and returns it as stored, with defaults filled in.
    async fn insert(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError>;

    /// Like `insert`, but a row that collides with an existing one on a
    /// unique key is dropped and `None` comes back.
    async fn insert_if_absent(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError>;

    async fn select(&self, table: Table, query: Select) -> Result<Vec<Row>, StoreError>;

    /// Applies `changes` to every row matching `filters`; returns the updated rows.
    async fn update(&self, table: Table, changes: Row, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError>;

    /// Deletes every row matching `filters`; returns the deleted rows.
    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError>;
}

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").unwrap();
}

pub(crate) fn is_valid_identifier(ident: &str) -> bool {
    IDENT_RE.is_match(ident)
}

pub(crate) fn check_identifier(ident: &str) -> Result<(), StoreError> {
    if is_valid_identifier(ident) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(ident.to_string()))
    }
}

/// Serializes a payload into a row, dropping fields the payload left unset.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(StoreError::Encoding(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}

/// Returns the row matching `key`, inserting `row` when there is none. An
/// insert that loses to a concurrent writer of the same key falls back to a
/// second lookup. The flag is set when this call created the row.
pub async fn find_or_insert(store: &dyn Store, table: Table, key: Select, row: Row) -> Result<(Row, bool), StoreError> {
    if let Some(found) = store.select(table, key.clone()).await?.into_iter().next() {
        return Ok((found, false));
    }
    if let Some(created) = store.insert_if_absent(table, row).await? {
        return Ok((created, true));
    }
    store
        .select(table, key)
        .await?
        .into_iter()
        .next()
        .map(|found| (found, false))
        .ok_or(StoreError::Vanished(table.name()))
}

/// First row of a result set, if any.
pub fn first<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Option<T>, StoreError> {
    rows.into_iter().next().map(from_row).transpose()
}

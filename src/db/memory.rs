use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use time::{macros::format_description, OffsetDateTime};

use super::{Filter, Order, Row, Select, Store, StoreError, Table};

/// In-process stand-in for the Postgres store, with the same id, timestamp
/// and filter semantics.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, TableData>>,
}

#[derive(Default)]
struct TableData {
    next_id: i64,
    rows: Vec<Row>,
}

impl TableData {
    fn push(&mut self, table: Table, mut row: Row) -> Row {
        self.next_id += 1;
        row.insert("id".into(), Value::from(self.next_id));
        if table.has_timestamps() {
            let ts = now();
            row.insert("created_at".into(), ts.clone());
            row.insert("updated_at".into(), ts);
        }
        self.rows.push(row.clone());
        row
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, table: Table) -> usize {
        let tables = self.tables.lock().expect("memory store poisoned");
        tables.get(&table).map_or(0, |t| t.rows.len())
    }
}

/// RFC 3339 with a fixed-width fraction so timestamps sort as strings.
fn now() -> Value {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");
    Value::String(
        OffsetDateTime::now_utc()
            .format(&format)
            .expect("timestamp formatting"),
    )
}

/// Unique natural keys, compared with NULLs equal as in the migrations.
fn natural_key(table: Table) -> &'static [&'static str] {
    match table {
        Table::Ingredient => &["name", "category"],
        Table::UnitOfMeasure => &["name", "type_id"],
        Table::UnitOfMeasureType | Table::MealType => &["name"],
        _ => &[],
    }
}

fn same_key(a: &Row, b: &Row, key: &[&str]) -> bool {
    key.iter().all(|column| {
        let a = a.get(*column).unwrap_or(&Value::Null);
        let b = b.get(*column).unwrap_or(&Value::Null);
        a == b
    })
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, Value::Null) => row.get(*column).map_or(true, Value::is_null),
        Filter::Eq(column, value) => row.get(*column) == Some(value),
        Filter::In(column, values) => row.get(*column).is_some_and(|v| values.contains(v)),
        Filter::Contains(column, needle) => row
            .get(*column)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn sort(rows: &mut [Row], order: &[Order]) {
    let default = [Order { column: "id", descending: false }];
    let order = if order.is_empty() { &default[..] } else { order };
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|o| {
                let ord = compare(a.get(o.column), b.get(o.column));
                if o.descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError> {
        let mut tables = self.tables.lock().expect("memory store poisoned");
        let data = tables.entry(table).or_default();
        Ok(Some(data.push(table, row)))
    }

    async fn insert_if_absent(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError> {
        let mut tables = self.tables.lock().expect("memory store poisoned");
        let data = tables.entry(table).or_default();
        let key = natural_key(table);
        if !key.is_empty() && data.rows.iter().any(|existing| same_key(existing, &row, key)) {
            return Ok(None);
        }
        Ok(Some(data.push(table, row)))
    }

    async fn select(&self, table: Table, query: Select) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.lock().expect("memory store poisoned");
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|r| query.filters.iter().all(|f| matches(r, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort(&mut rows, &query.order);
        let skip = query.offset.unwrap_or(0).max(0) as usize;
        let take = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    async fn update(&self, table: Table, changes: Row, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("update"));
        }
        let mut tables = self.tables.lock().expect("memory store poisoned");
        let Some(data) = tables.get_mut(&table) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in data.rows.iter_mut().filter(|r| filters.iter().all(|f| matches(r, f))) {
            for (k, v) in &changes {
                row.insert(k.clone(), v.clone());
            }
            if table.has_timestamps() && !changes.is_empty() {
                row.insert("updated_at".into(), now());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::Unfiltered("delete"));
        }
        let mut tables = self.tables.lock().expect("memory store poisoned");
        let Some(data) = tables.get_mut(&table) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Row>, Vec<Row>) = data
            .rows
            .drain(..)
            .partition(|r| filters.iter().all(|f| matches(r, f)));
        data.rows = kept;
        Ok(removed)
    }
}

/// Wraps a `MemoryStore` so that the first lookup comes back empty, as if
/// another writer committed the row between a lookup and the insert after it.
pub struct LateLookup {
    pub inner: MemoryStore,
    missed: AtomicBool,
}

impl LateLookup {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, missed: AtomicBool::new(false) }
    }
}

#[async_trait]
impl Store for LateLookup {
    async fn insert(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn insert_if_absent(&self, table: Table, row: Row) -> Result<Option<Row>, StoreError> {
        self.inner.insert_if_absent(table, row).await
    }

    async fn select(&self, table: Table, query: Select) -> Result<Vec<Row>, StoreError> {
        if !self.missed.swap(true, AtomicOrdering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.select(table, query).await
    }

    async fn update(&self, table: Table, changes: Row, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError> {
        self.inner.update(table, changes, filters).await
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<Vec<Row>, StoreError> {
        self.inner.delete(table, filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_timestamps() {
        let store = MemoryStore::new();
        let a = store.insert(Table::MealType, row(json!({ "name": "Lunch" }))).await.unwrap().unwrap();
        let b = store.insert(Table::MealType, row(json!({ "name": "Dinner" }))).await.unwrap().unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert!(a["created_at"].is_string());

        let link = store
            .insert(Table::RecipeIngredientLink, row(json!({ "recipe_id": 1 })))
            .await
            .unwrap()
            .unwrap();
        assert!(link.get("created_at").is_none());
    }

    #[tokio::test]
    async fn null_filter_matches_missing_columns() {
        let store = MemoryStore::new();
        store.insert(Table::Ingredient, row(json!({ "name": "Salt" }))).await.unwrap();
        store
            .insert(Table::Ingredient, row(json!({ "name": "Salt", "category": "Spice" })))
            .await
            .unwrap();
        let rows = store
            .select(Table::Ingredient, Select::new().eq("name", "Salt").eq("category", Value::Null))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
    }

    #[tokio::test]
    async fn insert_if_absent_honours_natural_keys() {
        let store = MemoryStore::new();
        let salt = row(json!({ "name": "Salt" }));
        let first = store.insert_if_absent(Table::Ingredient, salt.clone()).await.unwrap();
        assert!(first.is_some());
        assert!(store.insert_if_absent(Table::Ingredient, salt).await.unwrap().is_none());

        let spiced = row(json!({ "name": "Salt", "category": "Spice" }));
        assert!(store.insert_if_absent(Table::Ingredient, spiced).await.unwrap().is_some());
        assert_eq!(store.count(Table::Ingredient), 2);

        // join tables have no natural key
        let link = row(json!({ "recipe_id": 1, "ingredient_id": 1 }));
        assert!(store.insert_if_absent(Table::RecipeIngredientLink, link.clone()).await.unwrap().is_some());
        assert!(store.insert_if_absent(Table::RecipeIngredientLink, link).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn contains_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert(Table::Recipe, row(json!({ "title": "Green Tea" }))).await.unwrap();
        store.insert(Table::Recipe, row(json!({ "title": "Coffee" }))).await.unwrap();
        let rows = store.select(Table::Recipe, Select::new().contains("title", "TEA")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn delete_returns_removed_rows() {
        let store = MemoryStore::new();
        store.insert(Table::MealType, row(json!({ "name": "Lunch" }))).await.unwrap();
        let removed = store
            .delete(Table::MealType, vec![Filter::Eq("id", json!(1))])
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.count(Table::MealType), 0);
        let again = store
            .delete(Table::MealType, vec![Filter::Eq("id", json!(1))])
            .await
            .unwrap();
        assert!(again.is_empty());
    }
}

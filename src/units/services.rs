use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use super::dto::{
    Unit, UnitCreate, UnitCreateWithType, UnitType, UnitTypeCreate, UnitTypeUpdate, UnitUpdate, UnitWithType,
};
use crate::{
    db::{find_or_insert, first, from_row, from_rows, to_row, Row, Select, Store, Table},
    extract::Page,
    types::Ref,
    validate::{not_blank, not_blank_opt},
};

/// Units of measure and their types (volume, weight, ...).
#[derive(Clone)]
pub struct UnitService {
    store: Arc<dyn Store>,
}

impl UnitService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn insert(&self, table: Table, row: Row) -> anyhow::Result<Row> {
        self.store
            .insert(table, row)
            .await?
            .ok_or_else(|| anyhow!("store returned no row"))
    }

    async fn by_id(&self, table: Table, id: i64) -> anyhow::Result<Vec<Row>> {
        Ok(self.store.select(table, Select::new().eq("id", id)).await?)
    }

    // --- unit types ---

    pub async fn create_unit_type(&self, input: &UnitTypeCreate) -> anyhow::Result<UnitType> {
        self.insert_unit_type(input).await.context("Failed to create unit type")
    }

    async fn insert_unit_type(&self, input: &UnitTypeCreate) -> anyhow::Result<UnitType> {
        not_blank("name", &input.name)?;
        let unit_type: UnitType = from_row(self.insert(Table::UnitOfMeasureType, to_row(input)?).await?)?;
        info!(unit_type_id = unit_type.id, name = %unit_type.name, "unit type created");
        Ok(unit_type)
    }

    pub async fn get_unit_type(&self, id: i64) -> anyhow::Result<Option<UnitType>> {
        let rows = self
            .by_id(Table::UnitOfMeasureType, id)
            .await
            .context("Failed to get unit type")?;
        first(rows).context("Failed to get unit type")
    }

    pub async fn list_unit_types(&self, page: Page) -> anyhow::Result<Vec<UnitType>> {
        let rows = self
            .store
            .select(Table::UnitOfMeasureType, Select::new().range(page.skip, page.limit))
            .await
            .context("Failed to get unit types")?;
        from_rows(rows).context("Failed to get unit types")
    }

    pub async fn update_unit_type(&self, id: i64, changes: &UnitTypeUpdate) -> anyhow::Result<Option<UnitType>> {
        let row = to_row(changes).context("Failed to update unit type")?;
        if row.is_empty() {
            return self.get_unit_type(id).await;
        }
        not_blank_opt("name", changes.name.as_deref()).context("Failed to update unit type")?;
        let rows = self
            .store
            .update(Table::UnitOfMeasureType, row, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to update unit type")?;
        first(rows).context("Failed to update unit type")
    }

    pub async fn delete_unit_type(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::UnitOfMeasureType, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to delete unit type")?;
        Ok(!removed.is_empty())
    }

    /// Unit type with this name, created if missing.
    pub async fn upsert_unit_type(&self, input: &UnitTypeCreate) -> anyhow::Result<UnitType> {
        async {
            not_blank("name", &input.name)?;
            let key = Select::new().eq("name", input.name.as_str()).limit(1);
            let (row, created) =
                find_or_insert(self.store.as_ref(), Table::UnitOfMeasureType, key, to_row(input)?).await?;
            let unit_type: UnitType = from_row(row)?;
            if created {
                info!(unit_type_id = unit_type.id, name = %unit_type.name, "unit type created");
            } else {
                debug!(unit_type_id = unit_type.id, "unit type matched by name");
            }
            anyhow::Ok(unit_type)
        }
        .await
        .context("Failed to upsert unit type")
    }

    // --- units ---

    pub async fn create_unit(&self, input: &UnitCreate) -> anyhow::Result<Unit> {
        self.insert_unit(input).await.context("Failed to create unit")
    }

    async fn insert_unit(&self, input: &UnitCreate) -> anyhow::Result<Unit> {
        not_blank("name", &input.name)?;
        let unit: Unit = from_row(self.insert(Table::UnitOfMeasure, to_row(input)?).await?)?;
        info!(unit_id = unit.id, name = %unit.name, "unit created");
        Ok(unit)
    }

    /// Creates a unit whose type is named by id or upserted from an object.
    pub async fn create_unit_with_type(&self, input: &UnitCreateWithType) -> anyhow::Result<UnitWithType> {
        let unit_type = self
            .resolve_unit_type(input.unit_type.as_ref())
            .await
            .context("Failed to create unit")?;
        let unit = UnitCreate {
            name: input.name.clone(),
            type_id: unit_type.as_ref().map(|t| t.id),
        };
        let unit = self.insert_unit(&unit).await.context("Failed to create unit")?;
        Ok(UnitWithType { unit, unit_type })
    }

    async fn resolve_unit_type(&self, unit_type: Option<&Ref<UnitTypeCreate>>) -> anyhow::Result<Option<UnitType>> {
        match unit_type {
            Some(Ref::ByValue(t)) => self.upsert_unit_type(t).await.map(Some),
            Some(Ref::ById(id)) => match self.get_unit_type(*id).await? {
                Some(t) => Ok(Some(t)),
                None => Err(anyhow!("unit type {id} does not exist")),
            },
            None => Ok(None),
        }
    }

    pub async fn get_unit(&self, id: i64) -> anyhow::Result<Option<Unit>> {
        let rows = self
            .by_id(Table::UnitOfMeasure, id)
            .await
            .context("Failed to get unit")?;
        first(rows).context("Failed to get unit")
    }

    pub async fn list_units(&self, type_id: Option<i64>, page: Page) -> anyhow::Result<Vec<Unit>> {
        let query = Select::new()
            .eq_opt("type_id", type_id)
            .range(page.skip, page.limit);
        let rows = self
            .store
            .select(Table::UnitOfMeasure, query)
            .await
            .context("Failed to get units")?;
        from_rows(rows).context("Failed to get units")
    }

    pub async fn update_unit(&self, id: i64, changes: &UnitUpdate) -> anyhow::Result<Option<Unit>> {
        let row = to_row(changes).context("Failed to update unit")?;
        if row.is_empty() {
            return self.get_unit(id).await;
        }
        not_blank_opt("name", changes.name.as_deref()).context("Failed to update unit")?;
        let rows = self
            .store
            .update(Table::UnitOfMeasure, row, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to update unit")?;
        first(rows).context("Failed to update unit")
    }

    pub async fn delete_unit(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::UnitOfMeasure, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to delete unit")?;
        Ok(!removed.is_empty())
    }

    /// Unit with the same (name, type_id), created if missing. A missing
    /// `type_id` only matches units without a type.
    pub async fn upsert_unit(&self, input: &UnitCreate) -> anyhow::Result<Unit> {
        async {
            not_blank("name", &input.name)?;
            let key = Select::new()
                .eq("name", input.name.as_str())
                .eq("type_id", input.type_id)
                .limit(1);
            let (row, created) = find_or_insert(self.store.as_ref(), Table::UnitOfMeasure, key, to_row(input)?).await?;
            let unit: Unit = from_row(row)?;
            if created {
                info!(unit_id = unit.id, name = %unit.name, "unit created");
            } else {
                debug!(unit_id = unit.id, "unit matched by natural key");
            }
            anyhow::Ok(unit)
        }
        .await
        .context("Failed to upsert unit")
    }

    /// Units by id with their types nested, for expanding ingredient links.
    pub async fn units_with_types(&self, ids: &[i64]) -> anyhow::Result<Vec<UnitWithType>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let units: Vec<Unit> = from_rows(
            self.store
                .select(Table::UnitOfMeasure, Select::new().any_of("id", ids.iter().copied()))
                .await?,
        )?;

        let mut type_ids: Vec<i64> = units.iter().filter_map(|u| u.type_id).collect();
        type_ids.sort_unstable();
        type_ids.dedup();
        let types: Vec<UnitType> = if type_ids.is_empty() {
            Vec::new()
        } else {
            from_rows(
                self.store
                    .select(Table::UnitOfMeasureType, Select::new().any_of("id", type_ids))
                    .await?,
            )?
        };

        Ok(units
            .into_iter()
            .map(|unit| {
                let unit_type = unit
                    .type_id
                    .and_then(|tid| types.iter().find(|t| t.id == tid).cloned());
                UnitWithType { unit, unit_type }
            })
            .collect())
    }
}

use std::sync::Arc;

use anyhow::{anyhow, ensure, Context};
use serde_json::Value;
use time::Date;
use tracing::info;
use uuid::Uuid;

use super::dto::{
    MealPlan, MealPlanCreate, MealPlanRecipe, MealPlanRecipeCreate, MealPlanRecipeRow, MealPlanRecipeUpdate,
    MealPlanUpdate, MealType, MealTypeCreate, MealTypeUpdate,
};
use crate::{
    db::{first, from_row, from_rows, to_row, Row, Select, Store, Table},
    extract::Page,
    validate::{at_least, not_blank, not_blank_opt},
};

#[derive(Clone)]
pub struct MealPlanService {
    store: Arc<dyn Store>,
}

fn check_dates(start: Option<Date>, end: Option<Date>) -> anyhow::Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        ensure!(end >= start, "end_date must not be before start_date");
    }
    Ok(())
}

fn owned(id: i64, owner: Uuid) -> Select {
    Select::new().eq("id", id).eq("user_id", owner.to_string())
}

impl MealPlanService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn insert(&self, table: Table, row: Row) -> anyhow::Result<Row> {
        self.store
            .insert(table, row)
            .await?
            .ok_or_else(|| anyhow!("store returned no row"))
    }

    // --- meal types ---

    pub async fn create_meal_type(&self, input: &MealTypeCreate) -> anyhow::Result<MealType> {
        async {
            not_blank("name", &input.name)?;
            let meal_type: MealType = from_row(self.insert(Table::MealType, to_row(input)?).await?)?;
            info!(meal_type_id = meal_type.id, name = %meal_type.name, "meal type created");
            anyhow::Ok(meal_type)
        }
        .await
        .context("Failed to create meal type")
    }

    pub async fn get_meal_type(&self, id: i64) -> anyhow::Result<Option<MealType>> {
        let rows = self
            .store
            .select(Table::MealType, Select::new().eq("id", id))
            .await
            .context("Failed to get meal type")?;
        first(rows).context("Failed to get meal type")
    }

    pub async fn list_meal_types(&self, page: Page) -> anyhow::Result<Vec<MealType>> {
        let rows = self
            .store
            .select(Table::MealType, Select::new().range(page.skip, page.limit))
            .await
            .context("Failed to get meal types")?;
        from_rows(rows).context("Failed to get meal types")
    }

    pub async fn update_meal_type(&self, id: i64, changes: &MealTypeUpdate) -> anyhow::Result<Option<MealType>> {
        let row = to_row(changes).context("Failed to update meal type")?;
        if row.is_empty() {
            return self.get_meal_type(id).await;
        }
        not_blank_opt("name", changes.name.as_deref()).context("Failed to update meal type")?;
        let rows = self
            .store
            .update(Table::MealType, row, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to update meal type")?;
        first(rows).context("Failed to update meal type")
    }

    pub async fn delete_meal_type(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::MealType, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to delete meal type")?;
        Ok(!removed.is_empty())
    }

    // --- meal plans ---

    pub async fn create(&self, input: &MealPlanCreate, owner: Uuid) -> anyhow::Result<MealPlan> {
        async {
            not_blank("name", &input.name)?;
            check_dates(input.start_date, input.end_date)?;
            let mut row = to_row(input)?;
            row.insert("user_id".into(), Value::String(owner.to_string()));
            let plan: MealPlan = from_row(self.insert(Table::MealPlan, row).await?)?;
            info!(meal_plan_id = plan.id, %owner, "meal plan created");
            anyhow::Ok(plan)
        }
        .await
        .context("Failed to create meal plan")
    }

    /// The plan, if it exists and belongs to `owner`.
    pub async fn get(&self, id: i64, owner: Uuid) -> anyhow::Result<Option<MealPlan>> {
        let rows = self
            .store
            .select(Table::MealPlan, owned(id, owner))
            .await
            .context("Failed to get meal plan")?;
        first(rows).context("Failed to get meal plan")
    }

    pub async fn list(&self, owner: Uuid, page: Page) -> anyhow::Result<Vec<MealPlan>> {
        let query = Select::new()
            .eq("user_id", owner.to_string())
            .order_desc("created_at")
            .order_desc("id")
            .range(page.skip, page.limit);
        let rows = self
            .store
            .select(Table::MealPlan, query)
            .await
            .context("Failed to get meal plans")?;
        from_rows(rows).context("Failed to get meal plans")
    }

    /// Date order is checked against the stored plan when only one bound
    /// changes.
    pub async fn update(&self, id: i64, changes: &MealPlanUpdate, owner: Uuid) -> anyhow::Result<Option<MealPlan>> {
        let row = to_row(changes).context("Failed to update meal plan")?;
        if row.is_empty() {
            return self.get(id, owner).await;
        }
        async {
            not_blank_opt("name", changes.name.as_deref())?;
            if changes.start_date.is_some() || changes.end_date.is_some() {
                let Some(current) = first::<MealPlan>(self.store.select(Table::MealPlan, owned(id, owner)).await?)?
                else {
                    return Ok(None);
                };
                check_dates(
                    changes.start_date.or(current.start_date),
                    changes.end_date.or(current.end_date),
                )?;
            }
            let rows = self
                .store
                .update(Table::MealPlan, row, owned(id, owner).into_filters())
                .await?;
            anyhow::Ok(first::<MealPlan>(rows)?)
        }
        .await
        .context("Failed to update meal plan")
    }

    pub async fn delete(&self, id: i64, owner: Uuid) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::MealPlan, owned(id, owner).into_filters())
            .await
            .context("Failed to delete meal plan")?;
        if !removed.is_empty() {
            info!(meal_plan_id = id, %owner, "meal plan deleted");
        }
        Ok(!removed.is_empty())
    }

    pub async fn search(&self, term: &str, owner: Uuid, limit: i64) -> anyhow::Result<Vec<MealPlan>> {
        let query = Select::new()
            .contains("name", term)
            .eq("user_id", owner.to_string())
            .limit(limit);
        let rows = self
            .store
            .select(Table::MealPlan, query)
            .await
            .context("Failed to search meal plans")?;
        from_rows(rows).context("Failed to search meal plans")
    }

    // --- scheduled recipes ---

    pub async fn add_recipe(&self, plan_id: i64, input: &MealPlanRecipeCreate) -> anyhow::Result<MealPlanRecipe> {
        async {
            at_least("day_of_plan", Some(input.day_of_plan), 1)?;
            at_least("servings", input.servings, 1)?;
            let row = to_row(&MealPlanRecipeRow { meal_plan_id: plan_id, entry: input })?;
            let entry: MealPlanRecipe = from_row(self.insert(Table::MealPlanRecipe, row).await?)?;
            info!(entry_id = entry.id, meal_plan_id = plan_id, recipe_id = entry.recipe_id, "recipe scheduled");
            anyhow::Ok(entry)
        }
        .await
        .context("Failed to add recipe to meal plan")
    }

    /// Entries of a plan ordered by day.
    pub async fn recipes(&self, plan_id: i64) -> anyhow::Result<Vec<MealPlanRecipe>> {
        let query = Select::new()
            .eq("meal_plan_id", plan_id)
            .order_by("day_of_plan")
            .order_by("id");
        let rows = self
            .store
            .select(Table::MealPlanRecipe, query)
            .await
            .context("Failed to get meal plan recipes")?;
        from_rows(rows).context("Failed to get meal plan recipes")
    }

    pub async fn get_recipe_entry(&self, entry_id: i64) -> anyhow::Result<Option<MealPlanRecipe>> {
        let rows = self
            .store
            .select(Table::MealPlanRecipe, Select::new().eq("id", entry_id))
            .await
            .context("Failed to get meal plan recipe")?;
        first(rows).context("Failed to get meal plan recipe")
    }

    pub async fn update_recipe_entry(
        &self,
        entry_id: i64,
        changes: &MealPlanRecipeUpdate,
    ) -> anyhow::Result<Option<MealPlanRecipe>> {
        let row = to_row(changes).context("Failed to update meal plan recipe")?;
        if row.is_empty() {
            return self.get_recipe_entry(entry_id).await;
        }
        at_least("day_of_plan", changes.day_of_plan, 1)
            .and_then(|_| at_least("servings", changes.servings, 1))
            .context("Failed to update meal plan recipe")?;
        let rows = self
            .store
            .update(Table::MealPlanRecipe, row, Select::new().eq("id", entry_id).into_filters())
            .await
            .context("Failed to update meal plan recipe")?;
        first(rows).context("Failed to update meal plan recipe")
    }

    pub async fn remove_recipe_entry(&self, entry_id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::MealPlanRecipe, Select::new().eq("id", entry_id).into_filters())
            .await
            .context("Failed to remove recipe from meal plan")?;
        Ok(!removed.is_empty())
    }
}

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use super::dto::{Ingredient, IngredientCreate, IngredientUpdate};
use crate::{
    db::{find_or_insert, first, from_row, from_rows, to_row, Select, Store, Table},
    extract::Page,
    validate::{not_blank, not_blank_opt},
};

const TABLE: Table = Table::Ingredient;

#[derive(Clone)]
pub struct IngredientService {
    store: Arc<dyn Store>,
}

impl IngredientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: &IngredientCreate) -> anyhow::Result<Ingredient> {
        self.insert(input).await.context("Failed to create ingredient")
    }

    async fn insert(&self, input: &IngredientCreate) -> anyhow::Result<Ingredient> {
        not_blank("name", &input.name)?;
        let row = self
            .store
            .insert(TABLE, to_row(input)?)
            .await?
            .ok_or_else(|| anyhow!("store returned no row"))?;
        let ingredient: Ingredient = from_row(row)?;
        info!(ingredient_id = ingredient.id, name = %ingredient.name, "ingredient created");
        Ok(ingredient)
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<Ingredient>> {
        let rows = self
            .store
            .select(TABLE, Select::new().eq("id", id))
            .await
            .context("Failed to get ingredient")?;
        first(rows).context("Failed to get ingredient")
    }

    pub async fn list(&self, category: Option<&str>, page: Page) -> anyhow::Result<Vec<Ingredient>> {
        let query = Select::new()
            .eq_opt("category", category)
            .range(page.skip, page.limit);
        let rows = self
            .store
            .select(TABLE, query)
            .await
            .context("Failed to get ingredients")?;
        from_rows(rows).context("Failed to get ingredients")
    }

    pub async fn update(&self, id: i64, changes: &IngredientUpdate) -> anyhow::Result<Option<Ingredient>> {
        let row = to_row(changes).context("Failed to update ingredient")?;
        if row.is_empty() {
            return self.get(id).await;
        }
        not_blank_opt("name", changes.name.as_deref()).context("Failed to update ingredient")?;
        let rows = self
            .store
            .update(TABLE, row, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to update ingredient")?;
        first(rows).context("Failed to update ingredient")
    }

    pub async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(TABLE, Select::new().eq("id", id).into_filters())
            .await
            .context("Failed to delete ingredient")?;
        Ok(!removed.is_empty())
    }

    pub async fn search(&self, term: &str, limit: i64) -> anyhow::Result<Vec<Ingredient>> {
        let query = Select::new().contains("name", term).order_by("name").limit(limit);
        let rows = self
            .store
            .select(TABLE, query)
            .await
            .context("Failed to search ingredients")?;
        from_rows(rows).context("Failed to search ingredients")
    }

    /// Ingredients with any of the given ids, in id order.
    pub async fn get_many(&self, ids: &[i64]) -> anyhow::Result<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .store
            .select(TABLE, Select::new().any_of("id", ids.iter().copied()))
            .await?;
        Ok(from_rows(rows)?)
    }

    /// Returns the ingredient with the same (name, category), creating it first
    /// if there is none.
    pub async fn upsert(&self, input: &IngredientCreate) -> anyhow::Result<Ingredient> {
        async {
            not_blank("name", &input.name)?;
            let key = Select::new()
                .eq("name", input.name.as_str())
                .eq("category", input.category.clone())
                .limit(1);
            let (row, created) = find_or_insert(self.store.as_ref(), TABLE, key, to_row(input)?).await?;
            let ingredient: Ingredient = from_row(row)?;
            if created {
                info!(ingredient_id = ingredient.id, name = %ingredient.name, "ingredient created");
            } else {
                debug!(ingredient_id = ingredient.id, "ingredient matched by natural key");
            }
            anyhow::Ok(ingredient)
        }
        .await
        .context("Failed to upsert ingredient")
    }
}

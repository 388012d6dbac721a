use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, ensure, Context};
use bigdecimal::{BigDecimal, Zero};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::{
    LinkRow, NewRecipeIngredient, Recipe, RecipeCreate, RecipeIngredientExpanded, RecipeIngredientLink,
    RecipeIngredientLinkUpdate, RecipeUpdate,
};
use crate::{
    db::{first, from_row, from_rows, to_row, Row, Select, Store, Table},
    extract::Page,
    ingredients::IngredientService,
    types::Ref,
    units::UnitService,
    validate::{at_least, not_blank, not_blank_opt},
};

#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn Store>,
    ingredients: IngredientService,
    units: UnitService,
}

fn check_recipe_fields(
    servings: Option<i32>,
    prep_time_minutes: Option<i32>,
    cook_time_minutes: Option<i32>,
) -> anyhow::Result<()> {
    at_least("servings", servings, 1)?;
    at_least("prep_time_minutes", prep_time_minutes, 0)?;
    at_least("cook_time_minutes", cook_time_minutes, 0)
}

fn check_quantity(quantity: &BigDecimal) -> anyhow::Result<()> {
    ensure!(*quantity >= BigDecimal::zero(), "quantity must not be negative");
    Ok(())
}

impl RecipeService {
    pub fn new(store: Arc<dyn Store>, ingredients: IngredientService, units: UnitService) -> Self {
        Self { store, ingredients, units }
    }

    pub async fn create(&self, input: &RecipeCreate, owner: Uuid) -> anyhow::Result<Recipe> {
        self.insert(input, owner).await.context("Failed to create recipe")
    }

    async fn insert(&self, input: &RecipeCreate, owner: Uuid) -> anyhow::Result<Recipe> {
        not_blank("title", &input.title)?;
        check_recipe_fields(input.servings, input.prep_time_minutes, input.cook_time_minutes)?;

        let mut row = to_row(input)?;
        row.insert("user_id".into(), Value::String(owner.to_string()));
        let row = self
            .store
            .insert(Table::Recipe, row)
            .await?
            .ok_or_else(|| anyhow!("store returned no row"))?;
        let recipe: Recipe = from_row(row)?;
        info!(recipe_id = recipe.id, %owner, "recipe created");
        Ok(recipe)
    }

    /// Point lookup with ingredients expanded. With an owner, only that
    /// owner's recipe is returned.
    pub async fn get(&self, id: i64, owner: Option<Uuid>) -> anyhow::Result<Option<Recipe>> {
        self.fetch(id, owner).await.context("Failed to get recipe")
    }

    async fn fetch(&self, id: i64, owner: Option<Uuid>) -> anyhow::Result<Option<Recipe>> {
        let query = Select::new()
            .eq("id", id)
            .eq_opt("user_id", owner.map(|u| u.to_string()));
        let rows = self.store.select(Table::Recipe, query).await?;
        let Some(recipe) = first::<Recipe>(rows)? else {
            return Ok(None);
        };
        let mut recipes = vec![recipe];
        self.expand(&mut recipes).await?;
        Ok(recipes.pop())
    }

    pub async fn list(&self, owner: Uuid, difficulty_level: Option<&str>, page: Page) -> anyhow::Result<Vec<Recipe>> {
        let query = Select::new()
            .eq("user_id", owner.to_string())
            .eq_opt("difficulty_level", difficulty_level)
            .order_desc("created_at")
            .order_desc("id")
            .range(page.skip, page.limit);
        self.select_expanded(query).await.context("Failed to get recipes")
    }

    pub async fn update(&self, id: i64, changes: &RecipeUpdate, owner: Uuid) -> anyhow::Result<Option<Recipe>> {
        let row = to_row(changes).context("Failed to update recipe")?;
        if row.is_empty() {
            return self.get(id, Some(owner)).await;
        }
        self.apply_update(id, row, changes, owner)
            .await
            .context("Failed to update recipe")
    }

    async fn apply_update(
        &self,
        id: i64,
        row: Row,
        changes: &RecipeUpdate,
        owner: Uuid,
    ) -> anyhow::Result<Option<Recipe>> {
        not_blank_opt("title", changes.title.as_deref())?;
        check_recipe_fields(changes.servings, changes.prep_time_minutes, changes.cook_time_minutes)?;
        let filters = Select::new()
            .eq("id", id)
            .eq("user_id", owner.to_string())
            .into_filters();
        let rows = self.store.update(Table::Recipe, row, filters).await?;
        let mut recipes: Vec<Recipe> = from_rows(rows)?;
        self.expand(&mut recipes).await?;
        Ok(recipes.into_iter().next())
    }

    pub async fn delete(&self, id: i64, owner: Uuid) -> anyhow::Result<bool> {
        let filters = Select::new()
            .eq("id", id)
            .eq("user_id", owner.to_string())
            .into_filters();
        let removed = self
            .store
            .delete(Table::Recipe, filters)
            .await
            .context("Failed to delete recipe")?;
        if !removed.is_empty() {
            info!(recipe_id = id, %owner, "recipe deleted");
        }
        Ok(!removed.is_empty())
    }

    /// Title substring search, limited to the owner's recipes when given.
    pub async fn search(&self, term: &str, owner: Option<Uuid>, limit: i64) -> anyhow::Result<Vec<Recipe>> {
        let query = Select::new()
            .contains("title", term)
            .eq_opt("user_id", owner.map(|u| u.to_string()))
            .limit(limit);
        self.select_expanded(query).await.context("Failed to search recipes")
    }

    async fn select_expanded(&self, query: Select) -> anyhow::Result<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> = from_rows(self.store.select(Table::Recipe, query).await?)?;
        self.expand(&mut recipes).await?;
        Ok(recipes)
    }

    /// Attaches ingredient links with their ingredient and unit rows, using
    /// one query per table for the whole batch.
    async fn expand(&self, recipes: &mut [Recipe]) -> anyhow::Result<()> {
        if recipes.is_empty() {
            return Ok(());
        }
        let recipe_ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
        let links: Vec<RecipeIngredientLink> = from_rows(
            self.store
                .select(Table::RecipeIngredientLink, Select::new().any_of("recipe_id", recipe_ids))
                .await?,
        )?;
        if links.is_empty() {
            return Ok(());
        }

        let mut ingredient_ids: Vec<i64> = links.iter().map(|l| l.ingredient_id).collect();
        ingredient_ids.sort_unstable();
        ingredient_ids.dedup();
        let mut unit_ids: Vec<i64> = links.iter().filter_map(|l| l.unit_id).collect();
        unit_ids.sort_unstable();
        unit_ids.dedup();

        let ingredients: HashMap<i64, _> = self
            .ingredients
            .get_many(&ingredient_ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let units: HashMap<i64, _> = self
            .units
            .units_with_types(&unit_ids)
            .await?
            .into_iter()
            .map(|u| (u.unit.id, u))
            .collect();

        let mut by_recipe: HashMap<i64, Vec<RecipeIngredientExpanded>> = HashMap::new();
        for link in links {
            let expanded = RecipeIngredientExpanded {
                ingredient: ingredients.get(&link.ingredient_id).cloned(),
                unit: link.unit_id.and_then(|id| units.get(&id).cloned()),
                link,
            };
            by_recipe.entry(expanded.link.recipe_id).or_default().push(expanded);
        }
        for recipe in recipes.iter_mut() {
            recipe.ingredients = by_recipe.remove(&recipe.id).unwrap_or_default();
        }
        Ok(())
    }

    // --- ingredient links ---

    /// Links an ingredient to a recipe, upserting embedded ingredient and unit
    /// objects first. The upserts and the link insert are separate statements;
    /// a failed insert leaves any upserted rows in place.
    pub async fn add_ingredient(&self, recipe_id: i64, input: &NewRecipeIngredient) -> anyhow::Result<RecipeIngredientLink> {
        self.insert_link(recipe_id, input)
            .await
            .context("Failed to add ingredient to recipe")
    }

    async fn insert_link(&self, recipe_id: i64, input: &NewRecipeIngredient) -> anyhow::Result<RecipeIngredientLink> {
        check_quantity(&input.quantity)?;
        let ingredient_id = match &input.ingredient {
            Ref::ById(id) => *id,
            Ref::ByValue(ingredient) => self.ingredients.upsert(ingredient).await?.id,
        };
        let unit_id = match &input.unit {
            Some(Ref::ById(id)) => Some(*id),
            Some(Ref::ByValue(unit)) => Some(self.units.upsert_unit(unit).await?.id),
            None => None,
        };

        let row = LinkRow {
            recipe_id,
            ingredient_id,
            quantity: &input.quantity,
            unit_id,
            preparation: input.preparation.as_deref(),
            notes: input.notes.as_deref(),
        };
        let inserted = self
            .store
            .insert(Table::RecipeIngredientLink, to_row(&row)?)
            .await;
        let row = match inserted {
            Ok(Some(row)) => row,
            Ok(None) => return Err(anyhow!("store returned no row")),
            Err(e) => {
                if matches!(input.ingredient, Ref::ByValue(_)) {
                    warn!(recipe_id, ingredient_id, "link insert failed after ingredient upsert");
                }
                return Err(e.into());
            }
        };
        let link: RecipeIngredientLink = from_row(row)?;
        debug!(link_id = link.id, recipe_id, ingredient_id, "ingredient linked to recipe");
        Ok(link)
    }

    pub async fn ingredients(&self, recipe_id: i64) -> anyhow::Result<Vec<RecipeIngredientLink>> {
        let rows = self
            .store
            .select(Table::RecipeIngredientLink, Select::new().eq("recipe_id", recipe_id))
            .await
            .context("Failed to get recipe ingredients")?;
        from_rows(rows).context("Failed to get recipe ingredients")
    }

    pub async fn get_link(&self, link_id: i64) -> anyhow::Result<Option<RecipeIngredientLink>> {
        let rows = self
            .store
            .select(Table::RecipeIngredientLink, Select::new().eq("id", link_id))
            .await
            .context("Failed to get recipe ingredient")?;
        first(rows).context("Failed to get recipe ingredient")
    }

    pub async fn update_link(
        &self,
        link_id: i64,
        changes: &RecipeIngredientLinkUpdate,
    ) -> anyhow::Result<Option<RecipeIngredientLink>> {
        let row = to_row(changes).context("Failed to update recipe ingredient")?;
        if row.is_empty() {
            return self.get_link(link_id).await;
        }
        if let Some(quantity) = &changes.quantity {
            check_quantity(quantity).context("Failed to update recipe ingredient")?;
        }
        let rows = self
            .store
            .update(Table::RecipeIngredientLink, row, Select::new().eq("id", link_id).into_filters())
            .await
            .context("Failed to update recipe ingredient")?;
        first(rows).context("Failed to update recipe ingredient")
    }

    pub async fn remove_link(&self, link_id: i64) -> anyhow::Result<bool> {
        let removed = self
            .store
            .delete(Table::RecipeIngredientLink, Select::new().eq("id", link_id).into_filters())
            .await
            .context("Failed to remove ingredient from recipe")?;
        Ok(!removed.is_empty())
    }
}

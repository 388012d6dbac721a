use std::sync::Arc;

use crate::{
    auth::{IdentityProvider, SupabaseAuth},
    config::AppConfig,
    db::{PgStore, Store},
    ingredients::IngredientService,
    meal_plans::MealPlanService,
    recipes::RecipeService,
    units::UnitService,
};

/// Services built once at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub ingredients: IngredientService,
    pub units: UnitService,
    pub recipes: RecipeService,
    pub meal_plans: MealPlanService,
}

impl AppState {
    pub fn init(config: &AppConfig, store: PgStore) -> anyhow::Result<Self> {
        let identity = Arc::new(SupabaseAuth::new(&config.auth)?) as Arc<dyn IdentityProvider>;
        Ok(Self::from_parts(Arc::new(store), identity))
    }

    pub fn from_parts(store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>) -> Self {
        let ingredients = IngredientService::new(store.clone());
        let units = UnitService::new(store.clone());
        let recipes = RecipeService::new(store.clone(), ingredients.clone(), units.clone());
        let meal_plans = MealPlanService::new(store);
        Self {
            identity,
            ingredients,
            units,
            recipes,
            meal_plans,
        }
    }

    /// In-memory store and the fixed-token identity provider.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::{auth::services::fake::FakeIdentity, db::memory::MemoryStore};

        Self::fake_with(Arc::new(MemoryStore::new()), Arc::new(FakeIdentity::standard()))
    }

    #[cfg(test)]
    pub fn fake_with(store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::from_parts(store, identity)
    }
}

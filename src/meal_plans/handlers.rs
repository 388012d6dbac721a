use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    MealPlan, MealPlanCreate, MealPlanRecipe, MealPlanRecipeCreate, MealPlanRecipeUpdate, MealPlanUpdate, MealType,
    MealTypeCreate, MealTypeUpdate,
};
use crate::{
    auth::CurrentUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, PageQuery, SearchQuery},
    response::{created, done, ok, ApiResult, Created},
    state::AppState,
};

const ENTRY_NOT_FOUND: &str = "Meal plan recipe not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_meal_plans).post(create_meal_plan))
        .route("/meal-plans/search", get(search_meal_plans))
        .route("/meal-plans/types", get(list_meal_types).post(create_meal_type))
        .route(
            "/meal-plans/types/:id",
            get(get_meal_type).put(update_meal_type).delete(delete_meal_type),
        )
        .route(
            "/meal-plans/recipes/:entry_id",
            put(update_meal_plan_recipe).delete(remove_meal_plan_recipe),
        )
        .route(
            "/meal-plans/:id",
            get(get_meal_plan).put(update_meal_plan).delete(delete_meal_plan),
        )
        .route(
            "/meal-plans/:id/recipes",
            get(list_meal_plan_recipes).post(add_meal_plan_recipe),
        )
}

// --- meal types ---

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_meal_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<MealTypeCreate>,
) -> Created<MealType> {
    let meal_type = state
        .meal_plans
        .create_meal_type(&body)
        .await
        .map_err(ApiError::rejected)?;
    created("Meal type created successfully", meal_type)
}

#[instrument(skip(state))]
pub async fn get_meal_type(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<MealType> {
    match state.meal_plans.get_meal_type(id).await.map_err(ApiError::internal)? {
        Some(meal_type) => ok("Meal type retrieved successfully", meal_type),
        None => Err(ApiError::not_found("Meal type not found")),
    }
}

#[instrument(skip_all)]
pub async fn list_meal_types(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Vec<MealType>> {
    let items = state
        .meal_plans
        .list_meal_types(q.page()?)
        .await
        .map_err(ApiError::internal)?;
    ok("Meal types retrieved successfully", items)
}

#[instrument(skip(state, _user, body))]
pub async fn update_meal_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MealTypeUpdate>,
) -> ApiResult<MealType> {
    match state
        .meal_plans
        .update_meal_type(id, &body)
        .await
        .map_err(ApiError::rejected)?
    {
        Some(meal_type) => ok("Meal type updated successfully", meal_type),
        None => Err(ApiError::not_found("Meal type not found")),
    }
}

#[instrument(skip(state, _user))]
pub async fn delete_meal_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state.meal_plans.delete_meal_type(id).await.map_err(ApiError::rejected)? {
        done("Meal type deleted successfully")
    } else {
        Err(ApiError::not_found("Meal type not found"))
    }
}

// --- meal plans ---

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_meal_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<MealPlanCreate>,
) -> Created<MealPlan> {
    let plan = state
        .meal_plans
        .create(&body, user.user_id)
        .await
        .map_err(ApiError::rejected)?;
    created("Meal plan created successfully", plan)
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_meal_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<MealPlan> {
    match state
        .meal_plans
        .get(id, user.user_id)
        .await
        .map_err(ApiError::internal)?
    {
        Some(plan) => ok("Meal plan retrieved successfully", plan),
        None => Err(ApiError::not_found(
            "Meal plan not found or you don't have permission to access it",
        )),
    }
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_meal_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Vec<MealPlan>> {
    let plans = state
        .meal_plans
        .list(user.user_id, q.page()?)
        .await
        .map_err(ApiError::internal)?;
    ok("Meal plans retrieved successfully", plans)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn update_meal_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MealPlanUpdate>,
) -> ApiResult<MealPlan> {
    match state
        .meal_plans
        .update(id, &body, user.user_id)
        .await
        .map_err(ApiError::rejected)?
    {
        Some(plan) => ok("Meal plan updated successfully", plan),
        None => Err(ApiError::not_found(
            "Meal plan not found or you don't have permission to update it",
        )),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_meal_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state
        .meal_plans
        .delete(id, user.user_id)
        .await
        .map_err(ApiError::rejected)?
    {
        done("Meal plan deleted successfully")
    } else {
        Err(ApiError::not_found(
            "Meal plan not found or you don't have permission to delete it",
        ))
    }
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn search_meal_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<MealPlan>> {
    let (term, limit) = q.validate()?;
    let plans = state
        .meal_plans
        .search(term, user.user_id, limit)
        .await
        .map_err(ApiError::internal)?;
    ok("Search completed successfully", plans)
}

// --- scheduled recipes ---

async fn ensure_owned(state: &AppState, plan_id: i64, owner: Uuid, message: &str) -> Result<(), ApiError> {
    match state.meal_plans.get(plan_id, owner).await.map_err(ApiError::rejected)? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found(message)),
    }
}

/// Checks that the entry exists and its plan belongs to `owner`.
async fn ensure_entry_owned(state: &AppState, entry_id: i64, owner: Uuid) -> Result<(), ApiError> {
    let entry = state
        .meal_plans
        .get_recipe_entry(entry_id)
        .await
        .map_err(ApiError::rejected)?
        .ok_or_else(|| ApiError::not_found(ENTRY_NOT_FOUND))?;
    ensure_owned(state, entry.meal_plan_id, owner, ENTRY_NOT_FOUND).await
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn add_meal_plan_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MealPlanRecipeCreate>,
) -> Created<MealPlanRecipe> {
    ensure_owned(
        &state,
        id,
        user.user_id,
        "Meal plan not found or you don't have permission to modify it",
    )
    .await?;
    let entry = state
        .meal_plans
        .add_recipe(id, &body)
        .await
        .map_err(ApiError::rejected)?;
    created("Recipe added to meal plan successfully", entry)
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_meal_plan_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<MealPlanRecipe>> {
    let plan = state
        .meal_plans
        .get(id, user.user_id)
        .await
        .map_err(ApiError::internal)?;
    if plan.is_none() {
        return Err(ApiError::not_found(
            "Meal plan not found or you don't have permission to access it",
        ));
    }
    let entries = state.meal_plans.recipes(id).await.map_err(ApiError::internal)?;
    ok("Meal plan recipes retrieved successfully", entries)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn update_meal_plan_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(entry_id): ApiPath<i64>,
    ApiJson(body): ApiJson<MealPlanRecipeUpdate>,
) -> ApiResult<MealPlanRecipe> {
    ensure_entry_owned(&state, entry_id, user.user_id).await?;
    match state
        .meal_plans
        .update_recipe_entry(entry_id, &body)
        .await
        .map_err(ApiError::rejected)?
    {
        Some(entry) => ok("Meal plan recipe updated successfully", entry),
        None => Err(ApiError::not_found(ENTRY_NOT_FOUND)),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn remove_meal_plan_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(entry_id): ApiPath<i64>,
) -> ApiResult<()> {
    ensure_entry_owned(&state, entry_id, user.user_id).await?;
    if state
        .meal_plans
        .remove_recipe_entry(entry_id)
        .await
        .map_err(ApiError::rejected)?
    {
        done("Recipe removed from meal plan successfully")
    } else {
        Err(ApiError::not_found(ENTRY_NOT_FOUND))
    }
}

use axum::{
    extract::State,
    routing::get,
    Router,
};
use tracing::instrument;

use super::dto::{Ingredient, IngredientCreate, IngredientListQuery, IngredientUpdate};
use crate::{
    auth::CurrentUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, Page, SearchQuery},
    response::{created, done, ok, ApiResult, Created},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/ingredients/search", get(search_ingredients))
        .route(
            "/ingredients/:id",
            get(get_ingredient).put(update_ingredient).delete(delete_ingredient),
        )
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<IngredientCreate>,
) -> Created<Ingredient> {
    let ingredient = state.ingredients.create(&body).await.map_err(ApiError::rejected)?;
    created("Ingredient created successfully", ingredient)
}

#[instrument(skip_all)]
pub async fn list_ingredients(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<IngredientListQuery>,
) -> ApiResult<Vec<Ingredient>> {
    let page = Page::new(q.skip, q.limit)?;
    let items = state
        .ingredients
        .list(q.category.as_deref(), page)
        .await
        .map_err(ApiError::internal)?;
    ok("Ingredients retrieved successfully", items)
}

#[instrument(skip_all)]
pub async fn search_ingredients(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Ingredient>> {
    let (term, limit) = q.validate()?;
    let items = state.ingredients.search(term, limit).await.map_err(ApiError::internal)?;
    ok("Search completed successfully", items)
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ingredient> {
    match state.ingredients.get(id).await.map_err(ApiError::internal)? {
        Some(ingredient) => ok("Ingredient retrieved successfully", ingredient),
        None => Err(ApiError::not_found("Ingredient not found")),
    }
}

#[instrument(skip(state, _user, body))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<IngredientUpdate>,
) -> ApiResult<Ingredient> {
    match state.ingredients.update(id, &body).await.map_err(ApiError::rejected)? {
        Some(ingredient) => ok("Ingredient updated successfully", ingredient),
        None => Err(ApiError::not_found("Ingredient not found")),
    }
}

#[instrument(skip(state, _user))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state.ingredients.delete(id).await.map_err(ApiError::rejected)? {
        done("Ingredient deleted successfully")
    } else {
        Err(ApiError::not_found("Ingredient not found"))
    }
}

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    NewRecipeIngredient, Recipe, RecipeCreate, RecipeIngredientLink, RecipeIngredientLinkUpdate,
    RecipeIngredientWithObjects, RecipeListQuery, RecipeUpdate,
};
use crate::{
    auth::{CurrentUser, MaybeUser},
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, Page, SearchQuery},
    response::{created, done, ok, ApiResult, Created},
    state::AppState,
};

const NOT_MODIFIABLE: &str = "Recipe not found or you don't have permission to modify it";
const LINK_NOT_FOUND: &str = "Recipe ingredient link not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/search", get(search_recipes))
        .route(
            "/recipes/ingredients/:link_id",
            put(update_recipe_ingredient).delete(remove_recipe_ingredient),
        )
        .route("/recipes/:id", get(get_recipe).put(update_recipe).delete(delete_recipe))
        .route(
            "/recipes/:id/ingredients",
            get(list_recipe_ingredients).post(add_recipe_ingredient),
        )
        .route(
            "/recipes/:id/ingredients/with-objects",
            post(add_recipe_ingredient_with_objects),
        )
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<RecipeCreate>,
) -> Created<Recipe> {
    let recipe = state
        .recipes
        .create(&body, user.user_id)
        .await
        .map_err(ApiError::rejected)?;
    created("Recipe created successfully", recipe)
}

/// Anonymous callers see any recipe; signed-in callers only their own.
#[instrument(skip(state, user))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Recipe> {
    let owner = user.map(|u| u.user_id);
    match state.recipes.get(id, owner).await.map_err(ApiError::internal)? {
        Some(recipe) => ok("Recipe retrieved successfully", recipe),
        None => Err(ApiError::not_found("Recipe not found")),
    }
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<RecipeListQuery>,
) -> ApiResult<Vec<Recipe>> {
    let page = Page::new(q.skip, q.limit)?;
    let recipes = state
        .recipes
        .list(user.user_id, q.difficulty_level.as_deref(), page)
        .await
        .map_err(ApiError::internal)?;
    ok("Recipes retrieved successfully", recipes)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RecipeUpdate>,
) -> ApiResult<Recipe> {
    match state
        .recipes
        .update(id, &body, user.user_id)
        .await
        .map_err(ApiError::rejected)?
    {
        Some(recipe) => ok("Recipe updated successfully", recipe),
        None => Err(ApiError::not_found(
            "Recipe not found or you don't have permission to update it",
        )),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state
        .recipes
        .delete(id, user.user_id)
        .await
        .map_err(ApiError::rejected)?
    {
        done("Recipe deleted successfully")
    } else {
        Err(ApiError::not_found(
            "Recipe not found or you don't have permission to delete it",
        ))
    }
}

#[instrument(skip_all)]
pub async fn search_recipes(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Recipe>> {
    let (term, limit) = q.validate()?;
    let recipes = state
        .recipes
        .search(term, user.map(|u| u.user_id), limit)
        .await
        .map_err(ApiError::internal)?;
    ok("Search completed successfully", recipes)
}

// --- ingredient links ---

async fn ensure_owned(state: &AppState, recipe_id: i64, owner: Uuid, message: &str) -> Result<(), ApiError> {
    match state.recipes.get(recipe_id, Some(owner)).await.map_err(ApiError::rejected)? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found(message)),
    }
}

/// Loads a link and checks that its recipe belongs to `owner`.
async fn owned_link(state: &AppState, link_id: i64, owner: Uuid) -> Result<RecipeIngredientLink, ApiError> {
    let link = state
        .recipes
        .get_link(link_id)
        .await
        .map_err(ApiError::rejected)?
        .ok_or_else(|| ApiError::not_found(LINK_NOT_FOUND))?;
    ensure_owned(state, link.recipe_id, owner, LINK_NOT_FOUND).await?;
    Ok(link)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn add_recipe_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<NewRecipeIngredient>,
) -> Created<RecipeIngredientLink> {
    ensure_owned(&state, id, user.user_id, NOT_MODIFIABLE).await?;
    let link = state
        .recipes
        .add_ingredient(id, &body)
        .await
        .map_err(ApiError::rejected)?;
    created("Ingredient added to recipe successfully", link)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn add_recipe_ingredient_with_objects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RecipeIngredientWithObjects>,
) -> Created<RecipeIngredientLink> {
    ensure_owned(&state, id, user.user_id, NOT_MODIFIABLE).await?;
    let link = state
        .recipes
        .add_ingredient(id, &body.into())
        .await
        .map_err(ApiError::rejected)?;
    created("Ingredient added to recipe successfully with objects", link)
}

/// Visible under the same rule as the recipe itself.
#[instrument(skip(state, user))]
pub async fn list_recipe_ingredients(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<RecipeIngredientLink>> {
    let owner = user.map(|u| u.user_id);
    if state.recipes.get(id, owner).await.map_err(ApiError::internal)?.is_none() {
        return Err(ApiError::not_found("Recipe not found"));
    }
    let links = state.recipes.ingredients(id).await.map_err(ApiError::internal)?;
    ok("Recipe ingredients retrieved successfully", links)
}

#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn update_recipe_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(link_id): ApiPath<i64>,
    ApiJson(body): ApiJson<RecipeIngredientLinkUpdate>,
) -> ApiResult<RecipeIngredientLink> {
    owned_link(&state, link_id, user.user_id).await?;
    match state
        .recipes
        .update_link(link_id, &body)
        .await
        .map_err(ApiError::rejected)?
    {
        Some(link) => ok("Recipe ingredient updated successfully", link),
        None => Err(ApiError::not_found(LINK_NOT_FOUND)),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn remove_recipe_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(link_id): ApiPath<i64>,
) -> ApiResult<()> {
    owned_link(&state, link_id, user.user_id).await?;
    if state.recipes.remove_link(link_id).await.map_err(ApiError::rejected)? {
        done("Ingredient removed from recipe successfully")
    } else {
        Err(ApiError::not_found(LINK_NOT_FOUND))
    }
}

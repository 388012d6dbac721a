use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{
    Unit, UnitCreate, UnitCreateWithType, UnitListQuery, UnitType, UnitTypeCreate, UnitTypeUpdate, UnitUpdate,
    UnitWithType,
};
use crate::{
    auth::CurrentUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, Page, PageQuery},
    response::{created, done, ok, ApiResult, Created},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/units", get(list_units).post(create_unit))
        .route("/units/with-type", post(create_unit_with_type))
        .route("/units/types", get(list_unit_types).post(create_unit_type))
        .route(
            "/units/types/:id",
            get(get_unit_type).put(update_unit_type).delete(delete_unit_type),
        )
        .route("/units/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

// --- unit types ---

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_unit_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<UnitTypeCreate>,
) -> Created<UnitType> {
    let unit_type = state.units.create_unit_type(&body).await.map_err(ApiError::rejected)?;
    created("Unit type created successfully", unit_type)
}

#[instrument(skip(state))]
pub async fn get_unit_type(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<UnitType> {
    match state.units.get_unit_type(id).await.map_err(ApiError::internal)? {
        Some(unit_type) => ok("Unit type retrieved successfully", unit_type),
        None => Err(ApiError::not_found("Unit type not found")),
    }
}

#[instrument(skip_all)]
pub async fn list_unit_types(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Vec<UnitType>> {
    let items = state
        .units
        .list_unit_types(q.page()?)
        .await
        .map_err(ApiError::internal)?;
    ok("Unit types retrieved successfully", items)
}

#[instrument(skip(state, _user, body))]
pub async fn update_unit_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UnitTypeUpdate>,
) -> ApiResult<UnitType> {
    match state.units.update_unit_type(id, &body).await.map_err(ApiError::rejected)? {
        Some(unit_type) => ok("Unit type updated successfully", unit_type),
        None => Err(ApiError::not_found("Unit type not found")),
    }
}

#[instrument(skip(state, _user))]
pub async fn delete_unit_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state.units.delete_unit_type(id).await.map_err(ApiError::rejected)? {
        done("Unit type deleted successfully")
    } else {
        Err(ApiError::not_found("Unit type not found"))
    }
}

// --- units ---

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_unit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<UnitCreate>,
) -> Created<Unit> {
    let unit = state.units.create_unit(&body).await.map_err(ApiError::rejected)?;
    created("Unit created successfully", unit)
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_unit_with_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<UnitCreateWithType>,
) -> Created<UnitWithType> {
    let unit = state
        .units
        .create_unit_with_type(&body)
        .await
        .map_err(ApiError::rejected)?;
    created("Unit created successfully with type", unit)
}

#[instrument(skip(state))]
pub async fn get_unit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Unit> {
    match state.units.get_unit(id).await.map_err(ApiError::internal)? {
        Some(unit) => ok("Unit retrieved successfully", unit),
        None => Err(ApiError::not_found("Unit not found")),
    }
}

#[instrument(skip_all)]
pub async fn list_units(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<UnitListQuery>,
) -> ApiResult<Vec<Unit>> {
    let page = Page::new(q.skip, q.limit)?;
    let items = state
        .units
        .list_units(q.type_id, page)
        .await
        .map_err(ApiError::internal)?;
    ok("Units retrieved successfully", items)
}

#[instrument(skip(state, _user, body))]
pub async fn update_unit(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UnitUpdate>,
) -> ApiResult<Unit> {
    match state.units.update_unit(id, &body).await.map_err(ApiError::rejected)? {
        Some(unit) => ok("Unit updated successfully", unit),
        None => Err(ApiError::not_found("Unit not found")),
    }
}

#[instrument(skip(state, _user))]
pub async fn delete_unit(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if state.units.delete_unit(id).await.map_err(ApiError::rejected)? {
        done("Unit deleted successfully")
    } else {
        Err(ApiError::not_found("Unit not found"))
    }
}

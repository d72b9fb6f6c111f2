use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use budget_core::domain::budget::{Category, Expense, Income};
use budget_core::domain::contract::{
    CategoryPatch, ExpensePatch, IncomePatch, NewCategory, NewExpense, NewIncome,
};
use budget_core::storage::{categories, expenses, incomes};
use budget_core::time::resolve_period;
use serde::Deserialize;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/incomes", get(list_incomes).post(create_income))
        .route(
            "/incomes/:id",
            get(get_income).put(update_income).delete(delete_income),
        )
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let pool = state.pool()?;
    Ok(Json(categories::list(pool).await?))
}

async fn get_category(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Category>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    categories::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("category"))
}

async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;
    let created = categories::insert(pool, &payload).await?;
    tracing::info!(category_id = %created.id, "category created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_category(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(patch) = body?;
    let patch = patch.validate().map_err(ApiError::bad_request)?;
    categories::update(pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("category"))
}

async fn delete_category(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let pool = state.pool()?;
    if categories::delete(pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("category"))
    }
}

async fn list_incomes(State(state): State<AppState>) -> ApiResult<Json<Vec<Income>>> {
    let pool = state.pool()?;
    Ok(Json(incomes::list(pool).await?))
}

async fn get_income(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Income>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    incomes::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("income"))
}

async fn create_income(
    State(state): State<AppState>,
    body: Result<Json<NewIncome>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Income>)> {
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;
    let created = incomes::insert(pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_income(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<IncomePatch>, JsonRejection>,
) -> ApiResult<Json<Income>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(patch) = body?;
    let patch = patch.validate().map_err(ApiError::bad_request)?;
    incomes::update(pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("income"))
}

async fn delete_income(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let pool = state.pool()?;
    if incomes::delete(pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("income"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    year: Option<i32>,
    month: Option<u32>,
}

async fn list_expenses(
    State(state): State<AppState>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Expense>>> {
    let Query(query) = query?;
    let period = resolve_period(query.year, query.month).map_err(ApiError::bad_request)?;
    let pool = state.pool()?;
    Ok(Json(expenses::list(pool, period).await?))
}

async fn get_expense(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    expenses::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("expense"))
}

async fn create_expense(
    State(state): State<AppState>,
    body: Result<Json<NewExpense>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;
    let created = expenses::insert(pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_expense(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ExpensePatch>, JsonRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(patch) = body?;
    let patch = patch.validate().map_err(ApiError::bad_request)?;
    expenses::update(pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("expense"))
}

async fn delete_expense(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let pool = state.pool()?;
    if expenses::delete(pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("expense"))
    }
}

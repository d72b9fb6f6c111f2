use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use budget_core::domain::contract::{AddSavings, NewSavingsGoal, SavingsGoalPatch};
use budget_core::domain::savings::{SavingsGoal, SavingsTransaction};
use budget_core::storage::savings;
use budget_core::time::month_range;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/savings-goals", get(list_goals).post(create_goal))
        .route(
            "/savings-goals/:id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/savings-goals/:id/add", post(add_to_goal))
        .route(
            "/savings-transactions/:year/:month",
            get(list_month_transactions),
        )
}

async fn list_goals(State(state): State<AppState>) -> ApiResult<Json<Vec<SavingsGoal>>> {
    let pool = state.pool()?;
    Ok(Json(savings::list(pool).await?))
}

async fn get_goal(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<SavingsGoal>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    savings::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("savings goal"))
}

async fn create_goal(
    State(state): State<AppState>,
    body: Result<Json<NewSavingsGoal>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavingsGoal>)> {
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;
    let created = savings::insert(pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_goal(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SavingsGoalPatch>, JsonRejection>,
) -> ApiResult<Json<SavingsGoal>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(patch) = body?;
    let patch = patch.validate().map_err(ApiError::bad_request)?;
    savings::update(pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("savings goal"))
}

async fn delete_goal(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let pool = state.pool()?;
    if savings::delete(pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("savings goal"))
    }
}

async fn add_to_goal(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AddSavings>, JsonRejection>,
) -> ApiResult<Json<SavingsGoal>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;

    let goal = savings::add_savings(pool, id, payload.amount)
        .await?
        .ok_or_else(|| ApiError::not_found("savings goal"))?;
    tracing::info!(
        goal_id = %goal.id,
        amount = %payload.amount,
        is_completed = goal.is_completed,
        "savings added"
    );
    Ok(Json(goal))
}

async fn list_month_transactions(
    State(state): State<AppState>,
    path: Result<Path<(i32, u32)>, PathRejection>,
) -> ApiResult<Json<Vec<SavingsTransaction>>> {
    let Path((year, month)) = path?;
    let range = month_range(year, month).map_err(ApiError::bad_request)?;
    let pool = state.pool()?;
    Ok(Json(savings::list_transactions(pool, range).await?))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{degraded_app, send};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn transaction_month_is_validated() {
        let (status, body) = send(
            degraded_app(),
            Method::GET,
            "/api/savings-transactions/2025/0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("month"));

        let (status, _) = send(
            degraded_app(),
            Method::GET,
            "/api/savings-transactions/2025/7",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use budget_core::analysis::summary::unrealized_profit_loss;
use budget_core::domain::contract::{InvestmentPatch, NewInvestment};
use budget_core::domain::investment::Investment;
use budget_core::storage::investments;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/investments", get(list_investments).post(create_investment))
        .route(
            "/investments/:id",
            get(get_investment)
                .put(update_investment)
                .delete(delete_investment),
        )
        .route("/portfolio/profit-loss", get(profit_loss))
}

async fn list_investments(State(state): State<AppState>) -> ApiResult<Json<Vec<Investment>>> {
    let pool = state.pool()?;
    Ok(Json(investments::list(pool).await?))
}

async fn get_investment(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Investment>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    investments::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("investment"))
}

async fn create_investment(
    State(state): State<AppState>,
    body: Result<Json<NewInvestment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Investment>)> {
    let pool = state.pool()?;
    let Json(payload) = body?;
    let payload = payload.validate().map_err(ApiError::bad_request)?;
    let created = investments::insert(pool, &payload).await?;
    tracing::info!(investment_id = %created.id, symbol = %created.symbol, "investment created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_investment(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<InvestmentPatch>, JsonRejection>,
) -> ApiResult<Json<Investment>> {
    let Path(id) = path?;
    let pool = state.pool()?;
    let Json(patch) = body?;
    let patch = patch.validate().map_err(ApiError::bad_request)?;
    investments::update(pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("investment"))
}

async fn delete_investment(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let pool = state.pool()?;
    if investments::delete(pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("investment"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfitLoss {
    total_profit_loss: Decimal,
    priced_positions: usize,
}

async fn profit_loss(State(state): State<AppState>) -> ApiResult<Json<ProfitLoss>> {
    let pool = state.pool()?;
    let all = investments::list(pool).await?;
    Ok(Json(ProfitLoss {
        total_profit_loss: unrealized_profit_loss(&all),
        priced_positions: all.iter().filter(|i| i.current_price.is_some()).count(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{degraded_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn path_errors_precede_degraded_mode() {
        let (status, body) = send(
            degraded_app(),
            Method::PUT,
            &format!("/api/investments/{}", uuid::Uuid::new_v4()),
            Some(json!({ "quantity": "lots" })),
        )
        .await;
        // Body problems surface only once a database is available.
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("error").is_some());

        let (status, _) = send(
            degraded_app(),
            Method::DELETE,
            "/api/investments/123",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use budget_core::analysis::assistant::{answer_query, AssistantSnapshot};
use budget_core::analysis::report::{analyze_budget, analyze_portfolio, analyze_risk, AnalysisReport, RiskReport};
use budget_core::analysis::risk::{calculate_var, ConfidenceLevel, RiskResult};
use budget_core::storage::{categories, expenses, incomes, investments, savings};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolio-analysis", get(portfolio_analysis))
        .route("/budget-analysis", get(budget_analysis))
        .route("/custom-query", post(custom_query))
        .route("/risk-analysis", get(risk_analysis))
        .route("/var", post(value_at_risk))
}

async fn portfolio_analysis(State(state): State<AppState>) -> ApiResult<Json<AnalysisReport>> {
    let pool = state.pool()?;
    let all = investments::list(pool).await?;
    Ok(Json(analyze_portfolio(&all)))
}

async fn budget_analysis(State(state): State<AppState>) -> ApiResult<Json<AnalysisReport>> {
    let pool = state.pool()?;
    let (cats, exps, incs) = tokio::try_join!(
        categories::list(pool),
        expenses::list(pool, None),
        incomes::list(pool),
    )?;
    Ok(Json(analyze_budget(&cats, &exps, &incs)))
}

#[derive(Debug, Deserialize)]
struct CustomQuery {
    query: String,
}

#[derive(Debug, Serialize)]
struct CustomAnswer {
    response: String,
}

async fn custom_query(
    State(state): State<AppState>,
    body: Result<Json<CustomQuery>, JsonRejection>,
) -> ApiResult<Json<CustomAnswer>> {
    let Json(CustomQuery { query }) = body?;
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("query must be non-empty"));
    }
    let pool = state.pool()?;
    let (invs, exps, goals) = tokio::try_join!(
        investments::list(pool),
        expenses::list(pool, None),
        savings::list(pool),
    )?;
    let snapshot = AssistantSnapshot::from_records(&invs, &exps, &goals);
    Ok(Json(CustomAnswer {
        response: answer_query(&query, &snapshot),
    }))
}

async fn risk_analysis(State(state): State<AppState>) -> ApiResult<Json<RiskReport>> {
    let pool = state.pool()?;
    let all = investments::list(pool).await?;
    Ok(Json(analyze_risk(&all)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VarRequest {
    returns: Vec<f64>,
    confidence_level: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VarResponse {
    confidence_level: ConfidenceLevel,
    observations: usize,
    #[serde(flatten)]
    result: RiskResult,
}

/// Stateless: works in degraded mode too.
async fn value_at_risk(body: Result<Json<VarRequest>, JsonRejection>) -> ApiResult<Json<VarResponse>> {
    let Json(req) = body?;
    let confidence_level = match req.confidence_level {
        Some(c) => ConfidenceLevel::try_new(c).map_err(ApiError::bad_request)?,
        None => ConfidenceLevel::P95,
    };
    Ok(Json(VarResponse {
        confidence_level,
        observations: req.returns.len(),
        result: calculate_var(&req.returns, confidence_level),
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{degraded_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn var_endpoint_computes_without_a_database() {
        let (status, body) = send(
            degraded_app(),
            Method::POST,
            "/api/ai/var",
            Some(json!({ "returns": [-0.2, -0.1, 0.0, 0.05, 0.1], "confidenceLevel": 0.8 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["observations"], json!(5));
        assert_eq!(body["confidenceLevel"], json!(0.8));
        let var = body["var"].as_f64().unwrap();
        assert!((var - -0.12).abs() < 1e-12, "var = {var}");
        assert!(body["expectedShortfall"].as_f64().unwrap() <= var);
    }

    #[tokio::test]
    async fn var_endpoint_defaults_and_degenerate_input() {
        let (status, body) = send(
            degraded_app(),
            Method::POST,
            "/api/ai/var",
            Some(json!({ "returns": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["confidenceLevel"], json!(0.95));
        assert_eq!(body["var"], json!(0.0));
        assert_eq!(body["expectedShortfall"], json!(0.0));
    }

    #[tokio::test]
    async fn var_endpoint_rejects_bad_confidence() {
        for bad in [json!(0.0), json!(1.0), json!(-0.5), json!(42)] {
            let (status, body) = send(
                degraded_app(),
                Method::POST,
                "/api/ai/var",
                Some(json!({ "returns": [0.01], "confidenceLevel": bad })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
            assert!(body["error"].as_str().unwrap().contains("confidence level"));
        }
    }

    #[tokio::test]
    async fn empty_custom_query_is_rejected() {
        let (status, _) = send(
            degraded_app(),
            Method::POST,
            "/api/ai/custom-query",
            Some(json!({ "query": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

//! Narrative reports served by the analysis endpoints. Empty inputs produce a labeled neutral
//! report, never an error.

use crate::analysis::risk::{calculate_var, returns_from_holdings, ConfidenceLevel, RiskResult};
use crate::analysis::summary::{
    budget_recommendations, portfolio_recommendations, summarize_budget, summarize_portfolio,
};
use crate::domain::budget::{Category, Expense, Income};
use crate::domain::investment::Investment;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis: String,
    pub recommendations: Vec<String>,
    pub key_metrics: Value,
}

impl AnalysisReport {
    fn empty(analysis: &str, recommendation: &str) -> Self {
        Self {
            analysis: analysis.to_string(),
            recommendations: vec![recommendation.to_string()],
            key_metrics: json!({}),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    #[serde(rename = "var95")]
    pub var_95: f64,
    #[serde(rename = "var99")]
    pub var_99: f64,
    #[serde(rename = "expectedShortfall95")]
    pub expected_shortfall_95: f64,
    #[serde(rename = "expectedShortfall99")]
    pub expected_shortfall_99: f64,
    pub returns_data: Vec<f64>,
    pub recommendations: Vec<String>,
}

impl RiskReport {
    fn empty(message: &str) -> Self {
        Self {
            var_95: 0.0,
            var_99: 0.0,
            expected_shortfall_95: 0.0,
            expected_shortfall_99: 0.0,
            returns_data: Vec::new(),
            recommendations: vec![message.to_string()],
        }
    }
}

pub fn analyze_portfolio(investments: &[Investment]) -> AnalysisReport {
    if investments.is_empty() {
        return AnalysisReport::empty(
            "There are no investments in the portfolio to analyze.",
            "Start investing by adding your first positions to the portfolio.",
        );
    }

    let summary = summarize_portfolio(investments);

    let mut analysis = String::from("Portfolio analysis:\n\n");
    let _ = writeln!(analysis, "Portfolio value: {}", money(summary.total_value));
    let _ = writeln!(analysis, "Purchase cost: {}", money(summary.total_cost));
    let _ = writeln!(
        analysis,
        "Profit/loss: {} ({})",
        money(summary.total_return),
        signed_pct(summary.return_percentage)
    );
    analysis.push_str("\nPortfolio structure:\n");
    for (kind, count) in &summary.asset_types {
        let _ = writeln!(analysis, "- {kind}: {count} positions");
    }
    let _ = write!(
        analysis,
        "\nThe portfolio holds {} positions with a total value of {}.",
        summary.positions_count,
        money(summary.total_value)
    );

    AnalysisReport {
        analysis,
        recommendations: portfolio_recommendations(&summary),
        key_metrics: json!({
            "totalValue": summary.total_value,
            "totalReturn": summary.total_return,
            "returnPercentage": summary.return_percentage,
            "positionsCount": summary.positions_count,
            "assetTypes": summary.asset_types.len(),
        }),
    }
}

pub fn analyze_budget(
    categories: &[Category],
    expenses: &[Expense],
    incomes: &[Income],
) -> AnalysisReport {
    if categories.is_empty() || expenses.is_empty() {
        return AnalysisReport::empty(
            "There is not enough data to analyze the budget.",
            "Add categories and expenses to start the budget analysis.",
        );
    }

    let summary = summarize_budget(categories, expenses, incomes);

    let mut analysis = String::from("Budget analysis:\n\n");
    let _ = writeln!(analysis, "Total income: {}", money(summary.total_income));
    let _ = writeln!(analysis, "Total expenses: {}", money(summary.total_expenses));
    let _ = writeln!(analysis, "Balance: {}", money(summary.balance));
    analysis.push_str("\nBudget usage:");
    for usage in summary.categories.iter().filter(|c| c.budget > Decimal::ZERO) {
        let _ = write!(
            analysis,
            "\n- {}: {} / {} ({}%)",
            usage.name,
            money(usage.spent),
            money(usage.budget),
            usage.usage_percentage.round_dp(1)
        );
    }

    AnalysisReport {
        analysis,
        recommendations: budget_recommendations(&summary),
        key_metrics: json!({
            "totalIncome": summary.total_income,
            "totalExpenses": summary.total_expenses,
            "balance": summary.balance,
            "categoriesCount": summary.categories.len(),
            "expensesCount": summary.expenses_count,
        }),
    }
}

/// VaR and Expected Shortfall at 95% and 99% over per-holding returns.
pub fn analyze_risk(investments: &[Investment]) -> RiskReport {
    if investments.is_empty() {
        return RiskReport::empty("No data available for risk analysis.");
    }

    let holdings: Vec<_> = investments.iter().map(Investment::holding).collect();
    let returns = returns_from_holdings(&holdings);
    if returns.is_empty() {
        return RiskReport::empty("No current prices available for risk analysis.");
    }

    let RiskResult {
        var: var_95,
        expected_shortfall: expected_shortfall_95,
    } = calculate_var(&returns, ConfidenceLevel::P95);
    let RiskResult {
        var: var_99,
        expected_shortfall: expected_shortfall_99,
    } = calculate_var(&returns, ConfidenceLevel::P99);

    RiskReport {
        var_95,
        var_99,
        expected_shortfall_95,
        expected_shortfall_99,
        returns_data: returns,
        recommendations: vec![
            "VaR analysis is based on current positions.".to_string(),
            "Consider diversification to reduce risk.".to_string(),
        ],
    }
}

/// `$1,234.56` / `-$1,234.56`.
fn money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{frac_part}")
}

fn signed_pct(pct: Decimal) -> String {
    let pct = pct.round_dp(2);
    if pct.is_sign_negative() && !pct.is_zero() {
        format!("{pct:.2}%")
    } else {
        format!("+{:.2}%", pct.abs())
    }
}

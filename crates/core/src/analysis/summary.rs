use crate::domain::budget::{Category, Expense, Income};
use crate::domain::investment::Investment;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_return: Decimal,
    pub return_percentage: Decimal,
    pub positions_count: usize,
    /// Positions per asset type, keyed by type name.
    pub asset_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUsage {
    pub category_id: Uuid,
    pub name: String,
    pub budget: Decimal,
    pub spent: Decimal,
    pub usage_percentage: Decimal,
    pub over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub categories: Vec<CategoryUsage>,
    pub expenses_count: usize,
}

impl BudgetSummary {
    pub fn over_budget(&self) -> impl Iterator<Item = &CategoryUsage> {
        self.categories.iter().filter(|c| c.over_budget)
    }
}

pub fn summarize_portfolio(investments: &[Investment]) -> PortfolioSummary {
    let mut total_value = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut asset_types = BTreeMap::<String, usize>::new();

    for inv in investments {
        let holding = inv.holding();
        if let Some(value) = holding.market_value() {
            total_value += value;
        }
        total_cost += holding.cost();
        *asset_types.entry(inv.kind.clone()).or_default() += 1;
    }

    let total_return = total_value - total_cost;
    let return_percentage = if total_cost > Decimal::ZERO {
        total_return / total_cost * HUNDRED
    } else {
        Decimal::ZERO
    };

    PortfolioSummary {
        total_value,
        total_cost,
        total_return,
        return_percentage,
        positions_count: investments.len(),
        asset_types,
    }
}

/// Unrealized profit/loss `Σ (current - purchase) * quantity`; unpriced positions contribute 0.
pub fn unrealized_profit_loss(investments: &[Investment]) -> Decimal {
    investments
        .iter()
        .filter_map(|inv| {
            let current = inv.current_price?;
            Some((current - inv.purchase_price) * inv.quantity)
        })
        .sum()
}

pub fn summarize_budget(
    categories: &[Category],
    expenses: &[Expense],
    incomes: &[Income],
) -> BudgetSummary {
    let mut spent_by_category = HashMap::<Uuid, Decimal>::new();
    let mut total_expenses = Decimal::ZERO;
    for expense in expenses {
        total_expenses += expense.amount;
        *spent_by_category.entry(expense.category_id).or_default() += expense.amount;
    }

    let total_income: Decimal = incomes.iter().map(|i| i.amount).sum();

    let categories = categories
        .iter()
        .map(|c| {
            let spent = spent_by_category
                .get(&c.id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let usage_percentage = usage_percentage(spent, c.budget);
            CategoryUsage {
                category_id: c.id,
                name: c.name.clone(),
                budget: c.budget,
                spent,
                usage_percentage,
                over_budget: usage_percentage > HUNDRED,
            }
        })
        .collect();

    BudgetSummary {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        categories,
        expenses_count: expenses.len(),
    }
}

/// `spent / budget * 100`; a category without a budget reports 0%.
pub fn usage_percentage(spent: Decimal, budget: Decimal) -> Decimal {
    if budget > Decimal::ZERO {
        spent / budget * HUNDRED
    } else {
        Decimal::ZERO
    }
}

pub fn portfolio_recommendations(summary: &PortfolioSummary) -> Vec<String> {
    let mut out = Vec::new();

    if summary.positions_count < 5 {
        out.push("Consider diversifying further by adding more positions.".to_string());
    }

    if summary.return_percentage < Decimal::from(-10) {
        out.push("The portfolio is showing significant losses; review individual positions.".to_string());
    } else if summary.return_percentage > Decimal::from(20) {
        out.push("The portfolio is performing very well; consider taking some profits.".to_string());
    }

    if summary.asset_types.len() == 1 {
        out.push("The portfolio holds a single asset type; add different kinds of assets.".to_string());
    }

    out
}

pub fn budget_recommendations(summary: &BudgetSummary) -> Vec<String> {
    let mut out = Vec::new();

    let over: Vec<&str> = summary.over_budget().map(|c| c.name.as_str()).collect();
    if !over.is_empty() {
        out.push(format!("Budget exceeded in categories: {}", over.join(", ")));
    }

    if summary.total_expenses > summary.total_income {
        out.push("Expenses exceed income; consider cutting costs.".to_string());
    } else if summary.balance > summary.total_income * Decimal::new(3, 1) {
        out.push("Excellent budget management; consider increasing your savings.".to_string());
    }

    if summary.expenses_count < 10 {
        out.push("Track more expenses for a more accurate budget analysis.".to_string());
    }

    out
}

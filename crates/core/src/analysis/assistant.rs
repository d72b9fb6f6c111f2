use crate::domain::budget::Expense;
use crate::domain::investment::Investment;
use crate::domain::savings::SavingsGoal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Counts the keyword assistant answers from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantSnapshot {
    pub positions_count: usize,
    pub expenses_count: usize,
    pub expenses_total: Decimal,
    pub goals_count: usize,
    pub goals_completed: usize,
}

impl AssistantSnapshot {
    pub fn from_records(
        investments: &[Investment],
        expenses: &[Expense],
        goals: &[SavingsGoal],
    ) -> Self {
        Self {
            positions_count: investments.len(),
            expenses_count: expenses.len(),
            expenses_total: expenses.iter().map(|e| e.amount).sum(),
            goals_count: goals.len(),
            goals_completed: goals.iter().filter(|g| g.is_completed).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Portfolio,
    Budget,
    Savings,
}

const TOPIC_KEYWORDS: [(Topic, &[&str]); 3] = [
    (Topic::Portfolio, &["investment", "portfolio", "stock"]),
    (Topic::Budget, &["budget", "expense", "spending"]),
    (Topic::Savings, &["saving", "goal"]),
];

const FALLBACK: &str = "I can help you analyze your investment portfolio, budget and savings goals. What would you like to know?";

/// Keyword-matched answer to a free-text question. The first topic whose keyword appears wins.
pub fn answer_query(query: &str, snapshot: &AssistantSnapshot) -> String {
    let query = query.to_lowercase();
    let topic = TOPIC_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| query.contains(w)))
        .map(|(topic, _)| *topic);

    match topic {
        Some(Topic::Portfolio) if snapshot.positions_count > 0 => format!(
            "You have {} investment positions in your portfolio. Would you like a detailed analysis?",
            snapshot.positions_count
        ),
        Some(Topic::Portfolio) => {
            "You don't have any investments yet. Consider starting to invest.".to_string()
        }
        Some(Topic::Budget) if snapshot.expenses_count > 0 => format!(
            "You have {} expenses totalling ${:.2}. I can help analyze them by category.",
            snapshot.expenses_count,
            snapshot.expenses_total.round_dp(2)
        ),
        Some(Topic::Budget) => "You don't have any expenses to analyze yet.".to_string(),
        Some(Topic::Savings) if snapshot.goals_count > 0 => format!(
            "You have {} savings goals, {} of which have been reached.",
            snapshot.goals_count, snapshot.goals_completed
        ),
        Some(Topic::Savings) => {
            "You don't have any savings goals yet. Consider creating one.".to_string()
        }
        None => FALLBACK.to_string(),
    }
}

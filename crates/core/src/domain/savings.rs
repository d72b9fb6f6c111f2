use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: Uuid,
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
    pub category: String,
    pub color: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl SavingsGoal {
    pub fn is_reached(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}

/// Append-only ledger row recorded for every deposit into a goal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTransaction {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

use crate::domain::contract::{NewSavingsGoal, SavingsGoalPatch};
use crate::domain::savings::{SavingsGoal, SavingsTransaction};
use crate::time::DateRange;
use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str =
    "id, title, target_amount, current_amount, target_date, category, color, is_completed, created_at";

pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<SavingsGoal>> {
    sqlx::query_as::<_, SavingsGoal>(&format!(
        "SELECT {COLUMNS} FROM savings_goals ORDER BY target_date ASC, created_at ASC"
    ))
    .fetch_all(pool)
    .await
    .context("select savings_goals failed")
}

pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<SavingsGoal>> {
    sqlx::query_as::<_, SavingsGoal>(&format!("SELECT {COLUMNS} FROM savings_goals WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select savings goal failed (id={id})"))
}

pub async fn insert(pool: &PgPool, new: &NewSavingsGoal) -> anyhow::Result<SavingsGoal> {
    sqlx::query_as::<_, SavingsGoal>(&format!(
        "INSERT INTO savings_goals (id, title, target_amount, target_date, category, color) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.title)
    .bind(new.target_amount)
    .bind(new.target_date)
    .bind(&new.category)
    .bind(&new.color)
    .fetch_one(pool)
    .await
    .context("insert savings_goals failed")
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: &SavingsGoalPatch,
) -> anyhow::Result<Option<SavingsGoal>> {
    sqlx::query_as::<_, SavingsGoal>(&format!(
        "UPDATE savings_goals \
         SET title = COALESCE($2, title), target_amount = COALESCE($3, target_amount), \
             current_amount = COALESCE($4, current_amount), target_date = COALESCE($5, target_date), \
             category = COALESCE($6, category), color = COALESCE($7, color), \
             is_completed = COALESCE($8, is_completed) \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.title)
    .bind(patch.target_amount)
    .bind(patch.current_amount)
    .bind(patch.target_date)
    .bind(&patch.category)
    .bind(&patch.color)
    .bind(patch.is_completed)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update savings_goals failed (id={id})"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM savings_goals WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("delete savings_goals failed (id={id})"))?;
    Ok(res.rows_affected() > 0)
}

/// Deposit `amount` into a goal and record it in the ledger, atomically. The goal is marked
/// completed once the saved amount reaches its target; it is never un-completed here.
pub async fn add_savings(
    pool: &PgPool,
    goal_id: Uuid,
    amount: Decimal,
) -> anyhow::Result<Option<SavingsGoal>> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let goal = sqlx::query_as::<_, SavingsGoal>(&format!(
        "UPDATE savings_goals \
         SET current_amount = current_amount + $2, \
             is_completed = is_completed OR current_amount + $2 >= target_amount \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(goal_id)
    .bind(amount)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("add to savings goal failed (id={goal_id})"))?;

    let Some(goal) = goal else {
        tx.rollback().await.context("rollback transaction failed")?;
        return Ok(None);
    };

    sqlx::query("INSERT INTO savings_transactions (id, goal_id, amount) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(goal_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .context("insert savings_transactions failed")?;

    tx.commit().await.context("commit transaction failed")?;
    Ok(Some(goal))
}

/// Ledger rows recorded inside `range`, oldest first.
pub async fn list_transactions(
    pool: &PgPool,
    range: DateRange,
) -> anyhow::Result<Vec<SavingsTransaction>> {
    let (start, end) = range.as_utc();
    sqlx::query_as::<_, SavingsTransaction>(
        "SELECT id, goal_id, amount, created_at FROM savings_transactions \
         WHERE created_at >= $1 AND created_at < $2 \
         ORDER BY created_at ASC, id ASC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("select savings_transactions failed")
}

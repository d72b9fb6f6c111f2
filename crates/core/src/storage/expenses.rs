use crate::domain::budget::Expense;
use crate::domain::contract::{ExpensePatch, NewExpense};
use crate::time::DateRange;
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, description, amount, category_id, date, created_at";

/// All expenses, or only those dated inside `period`.
pub async fn list(pool: &PgPool, period: Option<DateRange>) -> anyhow::Result<Vec<Expense>> {
    let rows = match period {
        Some(range) => {
            sqlx::query_as::<_, Expense>(&format!(
                "SELECT {COLUMNS} FROM expenses \
                 WHERE date >= $1 AND date < $2 \
                 ORDER BY date DESC, created_at DESC"
            ))
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Expense>(&format!(
                "SELECT {COLUMNS} FROM expenses ORDER BY date DESC, created_at DESC"
            ))
            .fetch_all(pool)
            .await
        }
    };
    rows.context("select expenses failed")
}

pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Expense>> {
    sqlx::query_as::<_, Expense>(&format!("SELECT {COLUMNS} FROM expenses WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select expense failed (id={id})"))
}

pub async fn insert(pool: &PgPool, new: &NewExpense) -> anyhow::Result<Expense> {
    sqlx::query_as::<_, Expense>(&format!(
        "INSERT INTO expenses (id, description, amount, category_id, date) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.description)
    .bind(new.amount)
    .bind(new.category_id)
    .bind(new.date)
    .fetch_one(pool)
    .await
    .context("insert expenses failed")
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: &ExpensePatch,
) -> anyhow::Result<Option<Expense>> {
    sqlx::query_as::<_, Expense>(&format!(
        "UPDATE expenses \
         SET description = COALESCE($2, description), amount = COALESCE($3, amount), \
             category_id = COALESCE($4, category_id), date = COALESCE($5, date) \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.description)
    .bind(patch.amount)
    .bind(patch.category_id)
    .bind(patch.date)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update expenses failed (id={id})"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("delete expenses failed (id={id})"))?;
    Ok(res.rows_affected() > 0)
}

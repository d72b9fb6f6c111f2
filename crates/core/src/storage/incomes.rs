use crate::domain::budget::Income;
use crate::domain::contract::{IncomePatch, NewIncome};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, name, amount, frequency, date, created_at";

pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Income>> {
    sqlx::query_as::<_, Income>(&format!(
        "SELECT {COLUMNS} FROM incomes ORDER BY date DESC, created_at DESC"
    ))
    .fetch_all(pool)
    .await
    .context("select incomes failed")
}

pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Income>> {
    sqlx::query_as::<_, Income>(&format!("SELECT {COLUMNS} FROM incomes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select income failed (id={id})"))
}

pub async fn insert(pool: &PgPool, new: &NewIncome) -> anyhow::Result<Income> {
    sqlx::query_as::<_, Income>(&format!(
        "INSERT INTO incomes (id, name, amount, frequency, date) VALUES ($1, $2, $3, $4, $5) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(new.amount)
    .bind(&new.frequency)
    .bind(new.date)
    .fetch_one(pool)
    .await
    .context("insert incomes failed")
}

pub async fn update(pool: &PgPool, id: Uuid, patch: &IncomePatch) -> anyhow::Result<Option<Income>> {
    sqlx::query_as::<_, Income>(&format!(
        "UPDATE incomes \
         SET name = COALESCE($2, name), amount = COALESCE($3, amount), \
             frequency = COALESCE($4, frequency), date = COALESCE($5, date) \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.name)
    .bind(patch.amount)
    .bind(&patch.frequency)
    .bind(patch.date)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update incomes failed (id={id})"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM incomes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("delete incomes failed (id={id})"))?;
    Ok(res.rows_affected() > 0)
}

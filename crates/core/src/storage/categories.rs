use crate::domain::budget::Category;
use crate::domain::contract::{CategoryPatch, NewCategory};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, name, color, budget, created_at";

pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
    .context("select categories failed")
}

pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Category>> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select category failed (id={id})"))
}

pub async fn insert(pool: &PgPool, new: &NewCategory) -> anyhow::Result<Category> {
    sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (id, name, color, budget) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.color)
    .bind(new.budget)
    .fetch_one(pool)
    .await
    .context("insert categories failed")
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: &CategoryPatch,
) -> anyhow::Result<Option<Category>> {
    sqlx::query_as::<_, Category>(&format!(
        "UPDATE categories \
         SET name = COALESCE($2, name), color = COALESCE($3, color), budget = COALESCE($4, budget) \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.color)
    .bind(patch.budget)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update categories failed (id={id})"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("delete categories failed (id={id})"))?;
    Ok(res.rows_affected() > 0)
}

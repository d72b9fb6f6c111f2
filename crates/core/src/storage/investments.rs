use crate::domain::contract::{InvestmentPatch, NewInvestment};
use crate::domain::investment::{Holding, Investment, PriceUpdate};
use crate::prices::HoldingStore;
use crate::storage::lock::acquire_price_refresh_xact_lock;
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str =
    "id, symbol, name, type, quantity, purchase_price, current_price, purchase_date, created_at";

const PRICE_COMMIT_BATCH: usize = 200;

pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Investment>> {
    sqlx::query_as::<_, Investment>(&format!(
        "SELECT {COLUMNS} FROM investments ORDER BY purchase_date DESC, created_at DESC"
    ))
    .fetch_all(pool)
    .await
    .context("select investments failed")
}

pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Investment>> {
    sqlx::query_as::<_, Investment>(&format!("SELECT {COLUMNS} FROM investments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select investment failed (id={id})"))
}

pub async fn insert(pool: &PgPool, new: &NewInvestment) -> anyhow::Result<Investment> {
    sqlx::query_as::<_, Investment>(&format!(
        "INSERT INTO investments (id, symbol, name, type, quantity, purchase_price, purchase_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.symbol)
    .bind(&new.name)
    .bind(&new.kind)
    .bind(new.quantity)
    .bind(new.purchase_price)
    .bind(new.purchase_date)
    .fetch_one(pool)
    .await
    .context("insert investments failed")
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: &InvestmentPatch,
) -> anyhow::Result<Option<Investment>> {
    sqlx::query_as::<_, Investment>(&format!(
        "UPDATE investments \
         SET symbol = COALESCE($2, symbol), name = COALESCE($3, name), type = COALESCE($4, type), \
             quantity = COALESCE($5, quantity), purchase_price = COALESCE($6, purchase_price), \
             purchase_date = COALESCE($7, purchase_date) \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.symbol)
    .bind(&patch.name)
    .bind(&patch.kind)
    .bind(patch.quantity)
    .bind(patch.purchase_price)
    .bind(patch.purchase_date)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update investments failed (id={id})"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM investments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("delete investments failed (id={id})"))?;
    Ok(res.rows_affected() > 0)
}

pub async fn load_holdings(pool: &PgPool) -> anyhow::Result<Vec<Holding>> {
    sqlx::query_as::<_, Holding>(
        "SELECT id, symbol, quantity, purchase_price, current_price \
         FROM investments ORDER BY symbol ASC, id ASC",
    )
    .fetch_all(pool)
    .await
    .context("select holdings failed")
}

/// Writes every `current_price` in `updates` inside one transaction. Rows deleted since the pass
/// loaded them are silently skipped; the return value counts rows actually written.
pub async fn commit_prices(pool: &PgPool, updates: &[PriceUpdate]) -> anyhow::Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("begin transaction failed")?;
    acquire_price_refresh_xact_lock(&mut tx).await?;

    let mut affected: u64 = 0;
    for (batch_idx, chunk) in updates.chunks(PRICE_COMMIT_BATCH).enumerate() {
        let t0 = std::time::Instant::now();
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "UPDATE investments AS i SET current_price = v.price FROM (",
        );
        qb.push_values(chunk, |mut b, update| {
            b.push_bind(update.investment_id).push_bind(update.price);
        });
        qb.push(") AS v(id, price) WHERE i.id = v.id");

        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("batch update investments.current_price failed")?;
        affected += res.rows_affected();

        tracing::debug!(
            batch_idx,
            batch_size = chunk.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "current_price batch update"
        );
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(affected)
}

/// [`HoldingStore`] backed by the `investments` table.
#[derive(Clone)]
pub struct PgHoldingStore {
    pool: PgPool,
}

impl PgHoldingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HoldingStore for PgHoldingStore {
    async fn load_holdings(&self) -> anyhow::Result<Vec<Holding>> {
        load_holdings(&self.pool).await
    }

    async fn commit_prices(&self, updates: &[PriceUpdate]) -> anyhow::Result<u64> {
        commit_prices(&self.pool, updates).await
    }
}

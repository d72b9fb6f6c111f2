use anyhow::Context;

// Transaction-scoped advisory lock: released automatically on commit or rollback, so it is safe
// with pooled connections. Serializes price commits between the API and worker processes.
const PRICE_REFRESH_LOCK_KEY: i64 = 0x4255_4447_4554; // "BUDGET"

pub async fn acquire_price_refresh_xact_lock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .persistent(false)
        .bind(PRICE_REFRESH_LOCK_KEY)
        .execute(&mut **tx)
        .await
        .with_context(|| {
            format!("failed to acquire price refresh lock (key={PRICE_REFRESH_LOCK_KEY})")
        })?;
    Ok(())
}

pub mod categories;
pub mod expenses;
pub mod incomes;
pub mod investments;
pub mod lock;
pub mod savings;

use anyhow::Context;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

//! Apply database migrations and check configuration.

use anyhow::Context;
use folio_core::config::WikiConfig;
use folio_db::DbConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_db=debug,folio_migrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let wiki = WikiConfig::from_env().context("Invalid wiki configuration")?;
    tracing::info!(
        default_read = %wiki.default_read,
        default_write = %wiki.default_write,
        page_limit = wiki.default_page_limit,
        max_page_limit = wiki.max_page_limit,
        "Wiki configuration loaded"
    );

    let db = DbConfig::from_env().context("Invalid database configuration")?;
    let pool = folio_db::create_pool(&db)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    folio_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    folio_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(())
}

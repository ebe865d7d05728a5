mod depense_repo;

use crate::depense_repo::DepenseRepo;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

pub struct SQLxRepo {
    pool: PgPool,
}

impl SQLxRepo {
    pub fn new(pool: PgPool) -> SQLxRepo {
        SQLxRepo { pool }
    }
}

pub async fn create_repos(
    database_url: &str,
    max_pool_size: u32,
) -> Result<Arc<dyn DepenseRepo>, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_pool_size)
        .connect(database_url)
        .await
        .context("Unable to connect to database")?;

    info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Unable to run migrations")?;

    Ok(Arc::new(SQLxRepo::new(pool)))
}

use rental_core::CoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// SQLSTATEs of transactions Postgres aborted to resolve lock contention.
const CONTENTION_CODES: [&str; 2] = ["40P01", "40001"];

fn is_contention(code: Option<&str>) -> bool {
    code.is_some_and(|code| CONTENTION_CODES.contains(&code))
}

/// Maps constraint violations onto the domain error they stand for.
pub(crate) fn db_err(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if is_contention(db.code().as_deref()) {
            return CoreError::Conflict("concurrent update, retry the request".into());
        }
        if db.is_unique_violation() {
            return CoreError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return CoreError::NotFound("referenced record".into());
        }
        if db.is_check_violation() {
            return CoreError::ValidationError(db.message().to_string());
        }
    }
    CoreError::backend(err)
}

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::info;

pub type DbPool = Pool<Sqlite>;

pub struct Database;

impl Database {
    pub async fn initialize(database_url: &str, max_connections: u32) -> Result<DbPool> {
        if let Some(parent) = database_file(database_url).and_then(|path| path.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        info!(target: "offline::store", url = database_url, "database connected");

        Self::run_migrations(&pool).await?;

        Ok(pool)
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn in_memory() -> Result<DbPool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(pool)
    }

    async fn run_migrations(pool: &DbPool) -> Result<()> {
        info!(target: "offline::store", "running database migrations");

        sqlx::migrate!("./migrations").run(pool).await?;

        info!(target: "offline::store", "database migrations completed");
        Ok(())
    }
}

/// File path inside a `sqlite:` URL, if it names a file.
fn database_file(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

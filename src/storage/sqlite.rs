use crate::config::DatabaseConfig;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;

/// Apply performance PRAGMAs to a SQLite connection.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -16384;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
}

/// Create a deadpool-sqlite connection pool.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, deadpool_sqlite::CreatePoolError> {
    let db_path = config.path.clone();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if db_path.exists() {
            if let Err(e) =
                std::fs::set_permissions(&db_path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(error = %e, "failed to set database file permissions");
            }
        }
    }

    let mut cfg = Config::new(db_path);
    cfg.pool = Some(deadpool_sqlite::PoolConfig::new(config.pool_size.max(1)));
    cfg.create_pool(Runtime::Tokio1)
}

/// Initialize the pool: get a connection and apply pragmas + run migrations.
pub async fn init_pool(pool: &Pool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get().await?;
    conn.interact(|conn| {
        apply_pragmas(conn)?;
        crate::storage::migrations::run_migrations(conn)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await??;
    Ok(())
}

/// Fresh migrated database on a temp file, seeded with one user owning the
/// given project ids.
#[cfg(test)]
pub(crate) async fn test_pool(project_ids: &[i64]) -> Pool {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let db_path = tmp.path().to_path_buf();
    std::mem::forget(tmp);

    let pool = Config::new(&db_path).create_pool(Runtime::Tokio1).unwrap();
    let ids = project_ids.to_vec();
    let conn = pool.get().await.unwrap();
    conn.interact(move |conn| {
        apply_pragmas(conn).unwrap();
        crate::storage::migrations::run_migrations(conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, username, created_at) VALUES (1, 'owner', 0)",
            [],
        )
        .unwrap();
        for id in ids {
            conn.execute(
                "INSERT INTO projects (id, name, user_id, is_published, created_at)
                 VALUES (?1, ?2, 1, 1, 0)",
                rusqlite::params![id, format!("site-{id}")],
            )
            .unwrap();
        }
    })
    .await
    .unwrap();

    pool
}

use rusqlite::Connection;

const MIGRATION_001: &str = include_str!("../../migrations/001_initial.sql");

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            applied INTEGER NOT NULL
        );",
    )?;

    let migrations: &[(i64, &str, &str)] = &[(1, "001_initial", MIGRATION_001)];

    for &(id, name, sql) in migrations {
        let applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !applied {
            tracing::info!(migration = name, "applying migration");
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO _migrations (id, name, applied) VALUES (?1, ?2, unixepoch())",
                rusqlite::params![id, name],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_analytics_unique_per_project_day() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, username, created_at) VALUES (1, 'alice', 0);
             INSERT INTO projects (id, name, user_id, created_at) VALUES (1, 'site', 1, 0);
             INSERT INTO analytics (project_id, date, pv, uv, created_at, updated_at)
                VALUES (1, '2024-01-01', 1, 1, 0, 0);",
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO analytics (project_id, date, pv, uv, created_at, updated_at)
             VALUES (1, '2024-01-01', 2, 2, 0, 0)",
            [],
        );
        assert!(dup.is_err(), "second row for the same day must be rejected");
    }
}

use crate::error::{AppError, AppResult};
use deadpool_sqlite::Pool;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, OptionalExtension, Row};

static PROJECT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]{3,100}$").expect("project name pattern is valid")
});

/// Whether `name` can be a public project name.
pub fn is_valid_project_name(name: &str) -> bool {
    PROJECT_NAME.is_match(name)
}

/// A published project as seen by the site gate. Read-only.
#[derive(Debug, Clone)]
pub struct SiteProject {
    pub id: i64,
    pub name: String,
    pub owner_username: String,
    pub is_active: bool,
    pub owner_is_active: bool,
    pub owner_is_admin: bool,
    pub has_password: bool,
    pub password_hash: Option<String>,
}

impl SiteProject {
    /// The stored hash when the project is actually password protected.
    pub fn required_password_hash(&self) -> Option<&str> {
        if !self.has_password {
            return None;
        }
        self.password_hash.as_deref().filter(|h| !h.is_empty())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_username: row.get(2)?,
            is_active: row.get::<_, i64>(3)? != 0,
            owner_is_active: row.get::<_, i64>(4)? != 0,
            owner_is_admin: row.get::<_, i64>(5)? != 0,
            has_password: row.get::<_, i64>(6)? != 0,
            password_hash: row.get(7)?,
        })
    }
}

const SELECT_SITE: &str = "SELECT p.id, p.name, u.username, p.is_active, u.is_active, u.is_admin,
            p.has_password, p.password_hash
     FROM projects p JOIN users u ON u.id = p.user_id";

/// Project lookups backed by the `projects` and `users` tables.
#[derive(Clone)]
pub struct ProjectDirectory {
    pool: Pool,
}

impl ProjectDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Published project by public name. Inactive projects are returned so
    /// the caller can tell "disabled" apart from "missing".
    pub async fn find_published(&self, name: &str) -> AppResult<Option<SiteProject>> {
        let conn = self.pool.get().await?;
        let name = name.to_string();

        let project = conn
            .interact(move |conn| {
                conn.query_row(
                    &format!("{SELECT_SITE} WHERE p.name = ?1 AND p.is_published = 1"),
                    params![name],
                    SiteProject::from_row,
                )
                .optional()
            })
            .await
            .map_err(|e| AppError::Internal(format!("interact error: {e}")))??;

        Ok(project)
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<SiteProject>> {
        let conn = self.pool.get().await?;

        let project = conn
            .interact(move |conn| {
                conn.query_row(
                    &format!("{SELECT_SITE} WHERE p.id = ?1"),
                    params![id],
                    SiteProject::from_row,
                )
                .optional()
            })
            .await
            .map_err(|e| AppError::Internal(format!("interact error: {e}")))??;

        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_pool;

    #[test]
    fn test_project_name_rules() {
        assert!(is_valid_project_name("my-site_01"));
        assert!(is_valid_project_name("abc"));
        assert!(!is_valid_project_name("ab"));
        assert!(!is_valid_project_name("has space"));
        assert!(!is_valid_project_name("dots.not.allowed"));
        assert!(!is_valid_project_name(".."));
        assert!(!is_valid_project_name(&"x".repeat(101)));
    }

    #[tokio::test]
    async fn test_find_published_joins_owner() {
        let pool = test_pool(&[1, 2]).await;
        let conn = pool.get().await.unwrap();
        conn.interact(|conn| {
            conn.execute_batch(
                "UPDATE users SET is_admin = 1 WHERE id = 1;
                 UPDATE projects SET has_password = 1, password_hash = '$argon2id$x' WHERE id = 1;
                 UPDATE projects SET is_published = 0 WHERE id = 2;",
            )
        })
        .await
        .unwrap()
        .unwrap();

        let dir = ProjectDirectory::new(pool);
        let site = dir.find_published("site-1").await.unwrap().unwrap();
        assert_eq!(site.id, 1);
        assert_eq!(site.owner_username, "owner");
        assert!(site.owner_is_admin);
        assert!(site.owner_is_active);
        assert_eq!(site.required_password_hash(), Some("$argon2id$x"));

        assert!(dir.find_published("site-2").await.unwrap().is_none());
        assert!(dir.find_published("nope").await.unwrap().is_none());
        assert!(dir.find_by_id(2).await.unwrap().is_some());
    }

    #[test]
    fn test_password_flag_without_hash_is_open() {
        let site = SiteProject {
            id: 1,
            name: "abc".into(),
            owner_username: "o".into(),
            is_active: true,
            owner_is_active: true,
            owner_is_admin: false,
            has_password: true,
            password_hash: None,
        };
        assert_eq!(site.required_password_hash(), None);
    }
}

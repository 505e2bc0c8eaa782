use chrono::NaiveDate;

pub const PAGE_VIEW_PREFIX: &str = "analytics:pv:";
pub const UNIQUE_VISITOR_PREFIX: &str = "analytics:uv:";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The `(project, day)` pair a pending counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub project_id: i64,
    pub date: NaiveDate,
}

impl CounterKey {
    pub fn new(project_id: i64, date: NaiveDate) -> Self {
        Self { project_id, date }
    }

    /// `analytics:pv:{project_id}:{YYYY-MM-DD}`
    pub fn page_views(&self) -> String {
        format!(
            "{PAGE_VIEW_PREFIX}{}:{}",
            self.project_id,
            self.date.format(DATE_FORMAT)
        )
    }

    /// `analytics:uv:{project_id}:{YYYY-MM-DD}`
    pub fn unique_visitors(&self) -> String {
        format!(
            "{UNIQUE_VISITOR_PREFIX}{}:{}",
            self.project_id,
            self.date.format(DATE_FORMAT)
        )
    }

    /// Parse a page-view key back into its `(project, day)` pair.
    pub fn parse_page_views(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(PAGE_VIEW_PREFIX)?;
        let (project, date) = rest.split_once(':')?;
        let project_id = project.parse().ok()?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some(Self { project_id, date })
    }
}

pub mod analytics;
pub mod migrations;
pub mod sqlite;

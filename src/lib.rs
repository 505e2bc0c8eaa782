pub mod analytics;
pub mod app;
pub mod auth;
pub mod config;
pub mod counter;
pub mod error;
pub mod fingerprint;
pub mod health;
pub mod pipeline;
pub mod project;
pub mod site;
pub mod storage;

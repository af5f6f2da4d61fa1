// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use services::email::EmailService;
use store::{live::ChangeHub, Store};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub hub: Arc<ChangeHub>,
    pub email: Option<Arc<EmailService>>,
}

//! ShareIt item sharing server
//!
//! Owners list items, other users book them for a period, owners approve or
//! reject bookings, and past bookers comment on what they used. Exposed as a
//! JSON REST API over PostgreSQL or in-memory storage.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build services over `repository` using the policy in `config`
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.policy);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}

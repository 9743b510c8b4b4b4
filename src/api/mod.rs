//! API module for the clinic record service
//!
//! This module contains all API-related functionality.

pub mod error;
pub mod handlers;
pub mod routes;

pub use routes::configure;

use crate::config::{ClinicConfig, StorageConfig};
use crate::db::Database;

/// Application state shared across request handlers.
pub struct AppState {
    pub db: Database,
    pub clinic: ClinicConfig,
    pub storage: StorageConfig,
}

//! Bazari API service
//!
//! REST backend of the Bazari classifieds marketplace: accounts, listings,
//! messaging, likes, mobile-money payments and listing image storage.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod storage;

pub use error::{AppError, Result};
pub use state::AppState;

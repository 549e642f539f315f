//! Kechita Dashboard Library
//!
//! Backend-for-frontend for the Kechita microfinance dashboard: typed access to
//! the analytics API, per-view polling stores, the filter engine, derived
//! metrics, CSV export and the HTTP handlers that serve composed view models.
//!
//! # Modules
//!
//! - `api_client`: Typed client for the dashboard backend.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `export`: CSV export of filtered rows.
//! - `filters`: Search-and-facet filtering.
//! - `format`: Currency, percentage and count formatting.
//! - `handlers`: HTTP request handlers.
//! - `messaging`: WhatsApp/Telegram actions and banners.
//! - `metrics`: Derived aggregates and credit grades.
//! - `models`: Backend payload types.
//! - `polling`: Per-view polling store.
//! - `resources`: Endpoint sets fetched by each view.
//! - `settings`: Credential updates.
//! - `views`: View models.

pub mod api_client;
pub mod config;
pub mod errors;
pub mod export;
pub mod filters;
pub mod format;
pub mod handlers;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod polling;
pub mod resources;
pub mod settings;
pub mod views;

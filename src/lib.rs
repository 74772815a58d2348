//! # Attribution Library
//!
//! Links ecommerce orders to the marketing touchpoints that preceded them and
//! reports revenue grouped by attribution dimension.

pub mod attribution;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;

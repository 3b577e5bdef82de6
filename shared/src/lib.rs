//! Shared types for the shop backend
//!
//! Domain models, error codes and small utilities used by shop-server and
//! by anything that speaks its HTTP API.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

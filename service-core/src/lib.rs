//! service-core: Shared infrastructure for the bookkeeping suite.
pub mod config;
pub mod error;
pub mod identity;
pub mod observability;

pub use axum;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;

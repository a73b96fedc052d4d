/// Identity Service Library
///
/// Credential login, token issuance and user management for QA Engine,
/// served over gRPC behind a per-method authorization layer.
///
/// ## Modules
///
/// - `app`: Service assembly (store selection, policy, router)
/// - `config`: Service configuration
/// - `db`: Credential stores (Postgres, in-memory)
/// - `error`: Error types
/// - `grpc`: gRPC handlers, wire types and access policy
/// - `models`: Data models
/// - `security`: Token manager and password hashing
/// - `services`: Login flow and user management
/// - `validators`: Input validation
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use app::IdentityApp;
pub use error::{IdentityError, Result};

//! Shared cryptographic primitives
//!
//! - `jwt`: HS256 identity token issuance and verification (`TokenManager`)

pub mod jwt;

pub use jwt::{Claims, Role, TokenError, TokenManager};

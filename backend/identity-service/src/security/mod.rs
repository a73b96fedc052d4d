/// Security module for authentication
///
/// Provides core security primitives for identity-service:
/// - Password hashing and verification (Argon2id)
/// - Token issuing and verification (HS256 via crypto-core)
///
/// ## Architecture
///
/// - **crypto-core::jwt**: Shared token implementation
/// - **password**: Argon2id password hashing with tunable cost
// Re-export token functionality from shared crypto-core library
pub use crypto_core::jwt;
pub use crypto_core::{Claims, Role, TokenManager};

pub mod password;

pub use password::PasswordHasher;

//! Identity token issuance and verification
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 under a single process-wide
//! secret. A [`TokenManager`] owns the secret and the token lifetime; both are
//! fixed at construction and never change afterwards, so one manager can be
//! shared by reference (or `Arc`) across every request task without locking.
//!
//! ## Security Design
//!
//! - **HS256 ONLY**: tokens carrying any other `alg` header are rejected
//! - **Constant-time MAC check**: signature comparison is delegated to `ring`
//! - **Strict expiry**: a token is valid only while `now < exp`, no leeway
//! - **No globals**: the secret lives inside the manager, not in a static
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use crypto_core::jwt::{Role, TokenManager};
//!
//! let manager = TokenManager::new(b"change-me", Duration::minutes(15)).unwrap();
//! let token = manager.issue("alice", Role::User, Utc::now()).unwrap();
//! let claims = manager.verify(&token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - the only one this crate signs with or accepts
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Role carried by an identity token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Role granted to a user record, derived from its admin flag
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin {
            Role::Admin
        } else {
            Role::User
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(TokenError::UnknownRole(other.to_string())),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role granted at login
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// A claims value is valid only strictly before its expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Failure kinds for token operations
///
/// Callers at the network boundary collapse every verification variant into a
/// single unauthenticated outcome; the distinction exists for logs and tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("unexpected token signing algorithm")]
    AlgorithmMismatch,

    #[error("token expired")]
    Expired,

    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid token manager configuration: {0}")]
    Configuration(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::AlgorithmMismatch
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::MalformedToken(err.to_string()),
        }
    }
}

// ============================================================================
// Token Manager
// ============================================================================

/// Issues and verifies signed, expiring identity tokens
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &JWT_ALGORITHM)
            .field("token_duration", &self.token_duration)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Build a manager from the shared secret and token lifetime
    ///
    /// ## Errors
    ///
    /// Returns `TokenError::Configuration` if the secret is empty or the
    /// duration is not strictly positive.
    pub fn new(secret: &[u8], token_duration: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Configuration(
                "signing secret must not be empty".to_string(),
            ));
        }
        if token_duration <= Duration::zero() {
            return Err(TokenError::Configuration(format!(
                "token duration must be positive, got {}s",
                token_duration.num_seconds()
            )));
        }

        // Expiry is checked by `verify_at` against the caller's clock with no
        // leeway; jsonwebtoken's own check would accept `now == exp`.
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_duration,
        })
    }

    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Issue a token for `subject` with `role`, valid from `now` for the configured duration
    pub fn issue(&self, subject: &str, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let expiry = now
            .checked_add_signed(self.token_duration)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current wall clock
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, algorithm and structure, then expiry relative to `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;

        if claims.sub.is_empty() {
            return Err(TokenError::MalformedToken("empty subject".to_string()));
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;
    use std::sync::Arc;

    const TEST_SECRET: &[u8] = b"test-secret-do-not-use-in-production";

    fn manager() -> TokenManager {
        TokenManager::new(TEST_SECRET, Duration::seconds(900)).expect("valid configuration")
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_rejects_expiry_past_clock_range() {
        let result = manager().issue("alice", Role::User, DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_issue_then_verify_roundtrip() {
        let manager = manager();
        let now = fixed_now();

        for role in [Role::User, Role::Admin] {
            let token = manager.issue("alice", role, now).expect("issue");
            assert_eq!(token.matches('.').count(), 2); // JWT has 3 parts

            let claims = manager.verify_at(&token, now).expect("verify");
            assert_eq!(claims.sub, "alice");
            assert_eq!(claims.role, role);
            assert_eq!(claims.iat, now.timestamp());
            assert_eq!(claims.exp, (now + Duration::seconds(900)).timestamp());
        }
    }

    #[test]
    fn test_issue_is_deterministic() {
        let manager = manager();
        let now = fixed_now();
        let a = manager.issue("alice", Role::User, now).unwrap();
        let b = manager.issue("alice", Role::User, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_with_current_clock() {
        let manager = manager();
        let token = manager.issue("bob", Role::Admin, Utc::now()).unwrap();
        let claims = manager.verify(&token).expect("fresh token verifies");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let manager = manager();
        let now = fixed_now();
        let token = manager.issue("alice", Role::User, now).unwrap();
        let expires = now + Duration::seconds(900);

        assert!(manager.verify_at(&token, expires - Duration::seconds(1)).is_ok());
        assert_eq!(manager.verify_at(&token, expires), Err(TokenError::Expired));
        assert_eq!(
            manager.verify_at(&token, expires + Duration::days(3)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_flipping_any_signature_bit_fails() {
        let manager = manager();
        let now = fixed_now();
        let token = manager.issue("alice", Role::User, now).unwrap();

        let (message, signature) = token.rsplit_once('.').unwrap();
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for bit in 0..signature.len() * 8 {
            let mut flipped = signature.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let forged = format!("{}.{}", message, URL_SAFE_NO_PAD.encode(&flipped));
            assert_eq!(
                manager.verify_at(&forged, now),
                Err(TokenError::InvalidSignature),
                "bit {bit} flip was accepted"
            );
        }
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let manager = manager();
        let now = fixed_now();
        let token = manager.issue("alice", Role::User, now).unwrap();

        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let _claims = parts.next().unwrap();
        let signature = parts.next().unwrap();

        let escalated = serde_json::json!({
            "sub": "alice",
            "role": "admin",
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(900)).timestamp(),
        });
        let forged_claims = URL_SAFE_NO_PAD.encode(escalated.to_string());
        let forged = format!("{header}.{forged_claims}.{signature}");

        assert_eq!(manager.verify_at(&forged, now), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = fixed_now();
        let other = TokenManager::new(b"another-secret", Duration::seconds(900)).unwrap();
        let token = other.issue("alice", Role::Admin, now).unwrap();

        assert_eq!(manager().verify_at(&token, now), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = fixed_now();
        let claims = Claims {
            sub: "alice".to_string(),
            role: Role::Admin,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(900)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert_eq!(manager().verify_at(&token, now), Err(TokenError::AlgorithmMismatch));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let manager = manager();
        let now = fixed_now();

        for token in ["", "not-a-token", "invalid.token.here", "a.b", "...."] {
            match manager.verify_at(token, now) {
                Err(TokenError::MalformedToken(_)) | Err(TokenError::InvalidSignature) => {}
                other => panic!("token {token:?} produced {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_role_in_claims_is_malformed() {
        let now = fixed_now();
        let claims = serde_json::json!({
            "sub": "alice",
            "role": "superuser",
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(900)).timestamp(),
        });
        let token = encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert!(matches!(
            manager().verify_at(&token, now),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_empty_subject_rejected() {
        assert_eq!(
            manager().issue("", Role::User, fixed_now()),
            Err(TokenError::EmptySubject)
        );
    }

    #[test]
    fn test_configuration_validation() {
        assert!(matches!(
            TokenManager::new(b"", Duration::seconds(60)),
            Err(TokenError::Configuration(_))
        ));
        assert!(matches!(
            TokenManager::new(TEST_SECRET, Duration::zero()),
            Err(TokenError::Configuration(_))
        ));
        assert!(matches!(
            TokenManager::new(TEST_SECRET, Duration::seconds(-5)),
            Err(TokenError::Configuration(_))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("Admin".parse::<Role>().is_err());
        assert_eq!(Role::from_admin_flag(true), Role::Admin);
        assert_eq!(Role::from_admin_flag(false), Role::User);
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let rendered = format!("{:?}", manager());
        assert!(!rendered.contains("test-secret"));
    }

    #[test]
    fn test_concurrent_verification() {
        let manager = Arc::new(manager());
        let now = fixed_now();
        let token = manager.issue("alice", Role::User, now).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let token = token.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(manager.verify_at(&token, now).is_ok());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}

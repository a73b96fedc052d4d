/// Credential exchange: username/password in, signed token out
use crate::db::{CredentialStore, StoreError};
use crate::error::{IdentityError, Result};
use crate::security::{PasswordHasher, TokenManager};
use crate::validators::validate_login;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Plaintext behind the decoy hash checked for unknown usernames
const DECOY_PASSWORD: &str = "decoy-password";

/// Login flow over an injected credential store
///
/// ## Steps
///
/// 1. Validate request shape (no store access on failure)
/// 2. Look up the user by username
/// 3. Compare the password against the stored Argon2id hash
/// 4. Issue a token carrying the role derived from the admin flag
///
/// Unknown user, wrong password and inactive account all fail with
/// [`IdentityError::InvalidCredentials`]. An unknown username is still
/// checked against a decoy hash made with the same cost, so both failures
/// spend the same time in Argon2. Steps 2 to 4 are bounded by the
/// login timeout and fail with [`IdentityError::DeadlineExceeded`] when it
/// elapses.
#[derive(Clone)]
pub struct LoginFlow {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenManager>,
    hasher: PasswordHasher,
    decoy_hash: Arc<OnceCell<String>>,
    timeout: Duration,
}

impl LoginFlow {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenManager>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Authenticate and return a freshly issued token
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        validate_login(username, password)?;

        match tokio::time::timeout(self.timeout, self.authenticate(username, password)).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(username = %username, timeout_ms, "Login timed out");
                Err(IdentityError::DeadlineExceeded)
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let user = match self.store.find_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(StoreError::NotFound) => {
                self.verify_decoy(password).await?;
                warn!(username = %username, "Login failed: unknown username");
                return Err(IdentityError::InvalidCredentials);
            }
            Err(e) => {
                error!(username = %username, error = %e, "Login failed: credential store error");
                return Err(e.into());
            }
        };

        let matches = self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;
        if !matches {
            warn!(user_id = user.id, "Login failed: password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = user.id, "Login failed: account inactive");
            return Err(IdentityError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.username, user.role(), Utc::now())
            .map_err(|e| {
                error!(user_id = user.id, error = %e, "Failed to issue token");
                IdentityError::from(e)
            })?;

        info!(user_id = user.id, role = %user.role(), "User logged in");
        Ok(token)
    }

    /// Run the password through Argon2 and discard the outcome
    async fn verify_decoy(&self, password: &str) -> Result<()> {
        let decoy_hash = self
            .decoy_hash
            .get_or_try_init(|| self.hasher.hash_blocking(DECOY_PASSWORD.to_string()))
            .await?;
        self.hasher
            .verify_blocking(password.to_string(), decoy_hash.clone())
            .await?;
        Ok(())
    }
}

//! Configuration management for Identity Service
//!
//! Loads settings from environment variables, after reading a `.env` file
//! if one is present.
//!
//! # Example
//!
//! ```no_run
//! use identity_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("listening on {}:{}", settings.server.host, settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use grpc_authz::DefaultAction;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub policy: PolicySettings,
    pub password_hash: PasswordHashSettings,
    pub login: LoginSettings,
    pub database: Option<DatabaseSettings>,
    pub bootstrap_admin: Option<BootstrapAdminSettings>,
}

impl Settings {
    /// Load settings from `.env` and the process environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            server: ServerSettings::from_env()?,
            auth: AuthSettings::from_env()?,
            policy: PolicySettings::from_env()?,
            password_hash: PasswordHashSettings::from_env()?,
            login: LoginSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            bootstrap_admin: BootstrapAdminSettings::from_env()?,
        })
    }
}

/// gRPC listener settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// PEM certificate and key; TLS is enabled only when both are set
    pub tls: Option<TlsSettings>,
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        let tls = match (env::var("SERVER_CERT_FILE"), env::var("SERVER_KEY_FILE")) {
            (Ok(cert_file), Ok(key_file)) => Some(TlsSettings {
                cert_file: cert_file.into(),
                key_file: key_file.into(),
            }),
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                bail!("SERVER_CERT_FILE and SERVER_KEY_FILE must be set together")
            }
            (Err(_), Err(_)) => None,
        };

        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "50051".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
            tls,
        })
    }
}

/// Token signing settings
#[derive(Clone)]
pub struct AuthSettings {
    pub secret_key: String,
    pub token_duration: Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_key", &"<redacted>")
            .field("token_duration", &self.token_duration)
            .finish()
    }
}

impl AuthSettings {
    fn from_env() -> Result<Self> {
        let secret_key = env::var("AUTH_SECRET_KEY").context("AUTH_SECRET_KEY must be set")?;
        if secret_key.is_empty() {
            bail!("AUTH_SECRET_KEY must not be empty");
        }

        let seconds: u64 = env::var("AUTH_TOKEN_DURATION")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .context("Invalid AUTH_TOKEN_DURATION")?;
        if seconds == 0 {
            bail!("AUTH_TOKEN_DURATION must be greater than zero");
        }

        Ok(Self {
            secret_key,
            token_duration: Duration::from_secs(seconds),
        })
    }
}

/// Where the access policy comes from
#[derive(Debug, Clone, Default)]
pub struct PolicySettings {
    pub file: Option<PathBuf>,
    /// Overrides the default action of the loaded policy
    pub default_action: Option<DefaultAction>,
}

impl PolicySettings {
    fn from_env() -> Result<Self> {
        let default_action = match env::var("ACCESS_POLICY_DEFAULT") {
            Ok(raw) => Some(parse_default_action(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            file: env::var("ACCESS_POLICY_FILE").ok().map(PathBuf::from),
            default_action,
        })
    }
}

fn parse_default_action(raw: &str) -> Result<DefaultAction> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "allow" => Ok(DefaultAction::Allow),
        "deny" => Ok(DefaultAction::Deny),
        other => bail!("Invalid ACCESS_POLICY_DEFAULT {other:?}, expected allow or deny"),
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone)]
pub struct PasswordHashSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordHashSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            memory_kib: env::var("PASSWORD_HASH_MEMORY_KIB")
                .unwrap_or_else(|_| argon2::Params::DEFAULT_M_COST.to_string())
                .parse()
                .context("Invalid PASSWORD_HASH_MEMORY_KIB")?,
            iterations: env::var("PASSWORD_HASH_ITERATIONS")
                .unwrap_or_else(|_| argon2::Params::DEFAULT_T_COST.to_string())
                .parse()
                .context("Invalid PASSWORD_HASH_ITERATIONS")?,
            parallelism: env::var("PASSWORD_HASH_PARALLELISM")
                .unwrap_or_else(|_| argon2::Params::DEFAULT_P_COST.to_string())
                .parse()
                .context("Invalid PASSWORD_HASH_PARALLELISM")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub timeout: Duration,
}

impl LoginSettings {
    fn from_env() -> Result<Self> {
        let millis: u64 = env::var("LOGIN_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("Invalid LOGIN_TIMEOUT_MS")?;

        Ok(Self {
            timeout: Duration::from_millis(millis),
        })
    }
}

/// Postgres settings; absent when no `DATABASE_URL` is configured
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn from_env() -> Result<Option<Self>> {
        let Ok(url) = env::var("DATABASE_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
        }))
    }
}

/// First admin account, created at startup when missing
#[derive(Clone)]
pub struct BootstrapAdminSettings {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdminSettings")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BootstrapAdminSettings {
    fn from_env() -> Result<Option<Self>> {
        let Ok(username) = env::var("BOOTSTRAP_ADMIN_USERNAME") else {
            return Ok(None);
        };

        Ok(Some(Self {
            username,
            email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .context("BOOTSTRAP_ADMIN_EMAIL must be set with BOOTSTRAP_ADMIN_USERNAME")?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD")
                .context("BOOTSTRAP_ADMIN_PASSWORD must be set with BOOTSTRAP_ADMIN_USERNAME")?,
        }))
    }
}

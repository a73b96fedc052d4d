/// Service assembly shared by the binary and the end-to-end tests
///
/// Everything is built from explicit values: the credential store, the
/// token manager and the access policy are constructed once at startup and
/// handed to the components that need them.
use crate::config::{BootstrapAdminSettings, DatabaseSettings, Settings};
use crate::db::{CredentialStore, InMemoryUserStore, PgUserStore};
use crate::error::IdentityError;
use crate::grpc::qaengine::auth_service_server::AuthServiceServer;
use crate::grpc::qaengine::user_service_server::UserServiceServer;
use crate::grpc::{load_access_policy, AuthHandler, UserHandler};
use crate::security::{PasswordHasher, TokenManager};
use crate::services::{CreateUserInput, LoginFlow, UserManager};
use anyhow::{Context, Result};
use grpc_authz::{AccessPolicy, AuthorizationInterceptor, AuthorizationLayer, SharedAccessPolicy};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tower::layer::util::{Identity, Stack};
use tracing::info;

/// Router with the authorization layer in front of every service
pub type IdentityRouter = Router<Stack<AuthorizationLayer, Identity>>;

#[derive(Clone)]
pub struct IdentityApp {
    tokens: Arc<TokenManager>,
    policy: SharedAccessPolicy,
    login: LoginFlow,
    users: UserManager,
}

impl IdentityApp {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenManager>,
        policy: AccessPolicy,
        hasher: PasswordHasher,
        login_timeout: Duration,
    ) -> Self {
        let login =
            LoginFlow::new(store.clone(), tokens.clone(), hasher.clone()).with_timeout(login_timeout);
        Self {
            tokens,
            policy: SharedAccessPolicy::new(policy),
            login,
            users: UserManager::new(store, hasher),
        }
    }

    /// Build every component from settings around an existing store
    pub fn from_settings(settings: &Settings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let duration = chrono::Duration::from_std(settings.auth.token_duration)
            .context("AUTH_TOKEN_DURATION is out of range")?;
        let tokens = TokenManager::new(settings.auth.secret_key.as_bytes(), duration)
            .context("Failed to initialize token manager")?;

        let policy = load_access_policy(&settings.policy)?;
        info!(
            restricted_methods = policy.len(),
            default_action = ?policy.default_action(),
            "Access policy loaded"
        );

        let hash = &settings.password_hash;
        let hasher = PasswordHasher::new(hash.memory_kib, hash.iterations, hash.parallelism)
            .context("Invalid password hash parameters")?;

        Ok(Self::new(
            store,
            Arc::new(tokens),
            policy,
            hasher,
            settings.login.timeout,
        ))
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Handle for swapping the policy at runtime
    pub fn policy(&self) -> &SharedAccessPolicy {
        &self.policy
    }

    pub fn users(&self) -> &UserManager {
        &self.users
    }

    pub fn authorization_layer(&self) -> AuthorizationLayer {
        AuthorizationLayer::new(AuthorizationInterceptor::new(
            self.tokens.clone(),
            self.policy.clone(),
        ))
    }

    /// Register the services on `server` behind the authorization layer
    pub fn router(&self, server: Server) -> IdentityRouter {
        let mut server = server.layer(self.authorization_layer());
        server
            .add_service(AuthServiceServer::new(AuthHandler::new(self.login.clone())))
            .add_service(UserServiceServer::new(UserHandler::new(self.users.clone())))
    }
}

/// Postgres when a database is configured, otherwise an in-memory store
pub async fn connect_store(database: Option<&DatabaseSettings>) -> Result<Arc<dyn CredentialStore>> {
    let Some(database) = database else {
        info!("DATABASE_URL not set; using in-memory credential store");
        return Ok(Arc::new(InMemoryUserStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        max_connections = database.max_connections,
        "Database pool initialized"
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    Ok(Arc::new(PgUserStore::new(pool)))
}

/// Create the configured admin account unless it already exists
pub async fn bootstrap_admin(users: &UserManager, admin: &BootstrapAdminSettings) -> Result<()> {
    let created = users
        .create_user(CreateUserInput {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            is_active: true,
            is_admin: true,
        })
        .await;

    match created {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
            Ok(())
        }
        Err(IdentityError::UserAlreadyExists) => {
            info!(username = %admin.username, "Bootstrap admin already present");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to create bootstrap admin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthSettings, LoginSettings, PasswordHashSettings, PolicySettings, ServerSettings,
    };

    fn settings() -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 0,
                tls: None,
            },
            auth: AuthSettings {
                secret_key: "app-test-secret".into(),
                token_duration: Duration::from_secs(900),
            },
            policy: PolicySettings::default(),
            password_hash: PasswordHashSettings {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            login: LoginSettings {
                timeout: Duration::from_secs(5),
            },
            database: None,
            bootstrap_admin: None,
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let store = connect_store(None).await.unwrap();
        let app = IdentityApp::from_settings(&settings(), store.clone()).unwrap();
        let admin = BootstrapAdminSettings {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "rootpw1".into(),
        };

        bootstrap_admin(app.users(), &admin).await.unwrap();
        bootstrap_admin(app.users(), &admin).await.unwrap();

        let stored = store.find_by_username("root").await.unwrap().unwrap();
        assert!(stored.is_admin);
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn test_bootstrap_admin_with_bad_password_fails() {
        let store = connect_store(None).await.unwrap();
        let app = IdentityApp::from_settings(&settings(), store).unwrap();
        let admin = BootstrapAdminSettings {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "abc".into(),
        };

        assert!(bootstrap_admin(app.users(), &admin).await.is_err());
    }

    #[test]
    fn test_from_settings_uses_token_duration() {
        let app = IdentityApp::from_settings(&settings(), Arc::new(InMemoryUserStore::new())).unwrap();

        assert_eq!(app.tokens().token_duration(), chrono::Duration::seconds(900));
        assert_eq!(app.policy().load().default_action(), grpc_authz::DefaultAction::Allow);
    }
}

/// Service layer for identity-service
///
/// Provides business logic behind the gRPC handlers:
/// - Login flow (credential check and token issuance)
/// - User account management (CRUD, password change, role/activation toggles)
pub mod login;
pub mod users;

pub use login::{LoginFlow, DEFAULT_LOGIN_TIMEOUT};
pub use users::{CreateUserInput, UserManager};

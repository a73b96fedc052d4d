/// User account management behind the UserService RPCs
///
/// Role gating (who may call which RPC) happens in the authorization layer
/// before any of this runs. What remains here is record-level ownership:
/// a non-admin caller may only read or modify their own record.
use crate::db::CredentialStore;
use crate::error::{IdentityError, Result};
use crate::models::{NewUser, ProfileUpdate, User};
use crate::security::PasswordHasher;
use crate::validators::{
    validate_new_user, validate_password_change, validate_profile, validate_user_id, UserFields,
};
use grpc_authz::CallerIdentity;
use std::sync::Arc;
use tracing::{info, warn};

/// Account to create, with the plaintext initial password
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl UserManager {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub async fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let fields = UserFields {
            first_name: &input.first_name,
            last_name: &input.last_name,
            username: &input.username,
            email: &input.email,
        };
        validate_new_user(&fields, &input.password)?;

        let password_hash = self.hasher.hash_blocking(input.password).await?;
        let user = self
            .store
            .save(NewUser {
                first_name: input.first_name,
                last_name: input.last_name,
                username: input.username,
                email: input.email,
                password_hash,
                is_active: input.is_active,
                is_admin: input.is_admin,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    pub async fn find_user(&self, caller: Option<&CallerIdentity>, id: i32) -> Result<User> {
        self.load_for(caller, id).await
    }

    pub async fn update_user(
        &self,
        caller: Option<&CallerIdentity>,
        id: i32,
        profile: ProfileUpdate,
    ) -> Result<()> {
        validate_user_id(id)?;
        validate_profile(&profile.first_name, &profile.last_name)?;

        self.load_for(caller, id).await?;

        self.store.update(id, profile).await?;
        info!(user_id = id, "User profile updated");
        Ok(())
    }

    pub async fn change_password(
        &self,
        caller: Option<&CallerIdentity>,
        id: i32,
        old_password: &str,
        new_password: &str,
        retype_new_password: &str,
    ) -> Result<()> {
        validate_user_id(id)?;
        validate_password_change(new_password, retype_new_password)?;

        let user = self.load_for(caller, id).await?;

        let matches = self
            .hasher
            .verify_blocking(old_password.to_string(), user.password_hash)
            .await?;
        if !matches {
            warn!(user_id = id, "Password change rejected: current password mismatch");
            return Err(IdentityError::CurrentPasswordMismatch);
        }

        let password_hash = self.hasher.hash_blocking(new_password.to_string()).await?;
        self.store.update_password(id, password_hash).await?;

        info!(user_id = id, "Password changed");
        Ok(())
    }

    pub async fn delete_user(&self, id: i32) -> Result<()> {
        self.load(id).await?;
        self.store.delete(id).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn toggle_admin(&self, id: i32) -> Result<()> {
        self.load(id).await?;
        self.store.toggle_admin(id).await?;
        info!(user_id = id, "Admin flag toggled");
        Ok(())
    }

    pub async fn toggle_active(&self, id: i32) -> Result<()> {
        self.load(id).await?;
        self.store.toggle_active(id).await?;
        info!(user_id = id, "Active flag toggled");
        Ok(())
    }

    async fn load(&self, id: i32) -> Result<User> {
        validate_user_id(id)?;
        self.store
            .find(id)
            .await?
            .ok_or(IdentityError::UserNotFound)
    }

    /// Load a record on behalf of `caller`
    ///
    /// A non-admin only ever reaches their own record, found by the token
    /// subject, so any other id is denied whether or not it exists. No
    /// identity means the policy leaves the method open.
    async fn load_for(&self, caller: Option<&CallerIdentity>, id: i32) -> Result<User> {
        let caller = match caller {
            Some(caller) if !caller.is_admin() => caller,
            _ => return self.load(id).await,
        };

        validate_user_id(id)?;
        match self.store.find_by_username(&caller.username).await? {
            Some(own) if own.id == id => Ok(own),
            _ => {
                warn!(
                    caller = %caller.username,
                    target_user_id = id,
                    "Rejected access to another user's record"
                );
                Err(IdentityError::PermissionDenied(
                    "You do not have permission to access this resource".to_string(),
                ))
            }
        }
    }
}

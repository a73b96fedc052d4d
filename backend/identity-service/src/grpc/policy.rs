//! Access policy for the identity-service methods
//!
//! The built-in table is used unless `ACCESS_POLICY_FILE` points at a JSON
//! policy document. `ACCESS_POLICY_DEFAULT` overrides the default action of
//! whichever table is in effect.

use crate::config::PolicySettings;
use anyhow::{Context, Result};
use crypto_core::Role;
use grpc_authz::{AccessPolicy, PolicyError};
use tracing::info;

pub const LOGIN: &str = "/qaengine.AuthService/Login";
pub const CREATE_USER: &str = "/qaengine.UserService/CreateUser";
pub const FIND_USER: &str = "/qaengine.UserService/FindUser";
pub const UPDATE_USER: &str = "/qaengine.UserService/UpdateUser";
pub const CHANGE_PASSWORD: &str = "/qaengine.UserService/ChangePassword";
pub const DELETE_USER: &str = "/qaengine.UserService/DeleteUser";
pub const TOGGLE_ADMIN: &str = "/qaengine.UserService/ToggleAdmin";
pub const TOGGLE_ACTIVE: &str = "/qaengine.UserService/ToggleActive";

/// Built-in role table
pub fn default_access_policy() -> std::result::Result<AccessPolicy, PolicyError> {
    let any_user = [Role::Admin, Role::User];
    let admin_only = [Role::Admin];

    AccessPolicy::builder()
        .public(LOGIN)
        .allow(FIND_USER, any_user)
        .allow(UPDATE_USER, any_user)
        .allow(CHANGE_PASSWORD, any_user)
        .allow(CREATE_USER, admin_only)
        .allow(DELETE_USER, admin_only)
        .allow(TOGGLE_ADMIN, admin_only)
        .allow(TOGGLE_ACTIVE, admin_only)
        .build()
}

/// Resolve the policy from settings
pub fn load_access_policy(settings: &PolicySettings) -> Result<AccessPolicy> {
    let policy = match &settings.file {
        Some(path) => {
            let policy = AccessPolicy::from_file(path)
                .with_context(|| format!("Failed to load access policy from {}", path.display()))?;
            info!(path = %path.display(), methods = policy.len(), "Loaded access policy file");
            policy
        }
        None => default_access_policy().context("Built-in access policy is invalid")?,
    };

    Ok(match settings.default_action {
        Some(action) => policy.with_default_action(action),
        None => policy,
    })
}

//! Per-method Access Policy
//!
//! Maps fully-qualified gRPC method paths (`/package.Service/Method`) to the
//! set of roles allowed to invoke them. A policy is immutable once built;
//! [`SharedAccessPolicy`] swaps in a whole new instance when configuration
//! changes, so a call always evaluates against exactly one policy.

use arc_swap::ArcSwap;
use crypto_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// What happens to methods that have no entry in the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAction {
    /// Unlisted methods are callable by anyone, authenticated or not
    #[default]
    Allow,
    /// Unlisted methods are rejected unless marked public
    Deny,
}

/// Result of looking a method up in the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodAccess<'a> {
    /// No credential needed (public, or unlisted under default-allow)
    Open,
    /// A verified credential with one of these roles is required
    Restricted(&'a HashSet<Role>),
    /// Unlisted under default-deny
    Closed,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("method {0} has an empty role set")]
    EmptyRoleSet(String),

    #[error("method path must look like /package.Service/Method, got {0:?}")]
    InvalidMethod(String),

    #[error("method {0} is listed as both public and restricted")]
    Conflict(String),
}

/// Serialized form of a policy, as loaded from configuration
///
/// ```json
/// {
///   "default": "allow",
///   "public": ["/qaengine.AuthService/Login"],
///   "rules": { "/qaengine.UserService/DeleteUser": ["admin"] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub default: DefaultAction,
    #[serde(default)]
    pub public: Vec<String>,
    #[serde(default)]
    pub rules: HashMap<String, Vec<Role>>,
}

/// Static mapping from method path to permitted roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: HashMap<String, HashSet<Role>>,
    public: HashSet<String>,
    default_action: DefaultAction,
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    pub fn from_document(document: PolicyDocument) -> Result<Self, PolicyError> {
        let mut builder = Self::builder().default_action(document.default);
        for method in document.public {
            builder = builder.public(method);
        }
        for (method, roles) in document.rules {
            builder = builder.allow(method, roles);
        }
        builder.build()
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Copy of this policy with a different treatment for unlisted methods
    pub fn with_default_action(mut self, default_action: DefaultAction) -> Self {
        self.default_action = default_action;
        self
    }

    pub fn default_action(&self) -> DefaultAction {
        self.default_action
    }

    pub fn lookup(&self, method: &str) -> MethodAccess<'_> {
        if let Some(roles) = self.rules.get(method) {
            return MethodAccess::Restricted(roles);
        }
        if self.public.contains(method) {
            return MethodAccess::Open;
        }
        match self.default_action {
            DefaultAction::Allow => MethodAccess::Open,
            DefaultAction::Deny => MethodAccess::Closed,
        }
    }

    /// Number of restricted methods
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn to_document(&self) -> PolicyDocument {
        let mut public: Vec<String> = self.public.iter().cloned().collect();
        public.sort();
        let rules = self
            .rules
            .iter()
            .map(|(method, roles)| {
                let mut roles: Vec<Role> = roles.iter().copied().collect();
                roles.sort_by_key(|r| r.as_str());
                (method.clone(), roles)
            })
            .collect();
        PolicyDocument {
            default: self.default_action,
            public,
            rules,
        }
    }
}

#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    rules: Vec<(String, Vec<Role>)>,
    public: Vec<String>,
    default_action: DefaultAction,
}

impl AccessPolicyBuilder {
    /// Restrict `method` to callers holding one of `roles`
    pub fn allow(mut self, method: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        self.rules.push((method.into(), roles.into_iter().collect()));
        self
    }

    /// Mark `method` callable without a credential, even under default-deny
    pub fn public(mut self, method: impl Into<String>) -> Self {
        self.public.push(method.into());
        self
    }

    pub fn default_action(mut self, default_action: DefaultAction) -> Self {
        self.default_action = default_action;
        self
    }

    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        let mut rules: HashMap<String, HashSet<Role>> = HashMap::new();
        for (method, roles) in self.rules {
            validate_method(&method)?;
            if roles.is_empty() {
                return Err(PolicyError::EmptyRoleSet(method));
            }
            rules.entry(method).or_default().extend(roles);
        }

        let mut public = HashSet::new();
        for method in self.public {
            validate_method(&method)?;
            if rules.contains_key(&method) {
                return Err(PolicyError::Conflict(method));
            }
            public.insert(method);
        }

        Ok(AccessPolicy {
            rules,
            public,
            default_action: self.default_action,
        })
    }
}

fn validate_method(method: &str) -> Result<(), PolicyError> {
    let well_formed = method
        .strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
        .map(|(service, name)| !service.is_empty() && !name.is_empty() && !name.contains('/'))
        .unwrap_or(false);

    if well_formed {
        Ok(())
    } else {
        Err(PolicyError::InvalidMethod(method.to_string()))
    }
}

/// Atomically replaceable handle to the active policy
#[derive(Clone)]
pub struct SharedAccessPolicy {
    current: Arc<ArcSwap<AccessPolicy>>,
}

impl SharedAccessPolicy {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    /// Snapshot of the active policy
    pub fn load(&self) -> Arc<AccessPolicy> {
        self.current.load_full()
    }

    /// Replace the whole policy; in-flight calls keep the snapshot they loaded
    pub fn replace(&self, policy: AccessPolicy) {
        self.current.store(Arc::new(policy));
        tracing::info!("access policy replaced");
    }
}

impl std::fmt::Debug for SharedAccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedAccessPolicy").field(&self.load()).finish()
    }
}

impl From<AccessPolicy> for SharedAccessPolicy {
    fn from(policy: AccessPolicy) -> Self {
        Self::new(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETE_USER: &str = "/qaengine.UserService/DeleteUser";
    const FIND_USER: &str = "/qaengine.UserService/FindUser";
    const LOGIN: &str = "/qaengine.AuthService/Login";

    fn sample() -> AccessPolicy {
        AccessPolicy::builder()
            .allow(DELETE_USER, [Role::Admin])
            .allow(FIND_USER, [Role::Admin, Role::User])
            .public(LOGIN)
            .build()
            .expect("valid policy")
    }

    #[test]
    fn test_lookup_restricted() {
        let policy = sample();
        match policy.lookup(DELETE_USER) {
            MethodAccess::Restricted(roles) => {
                assert!(roles.contains(&Role::Admin));
                assert!(!roles.contains(&Role::User));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unlisted_method_default_allow() {
        let policy = sample();
        assert_eq!(policy.lookup("/qaengine.UserService/Unknown"), MethodAccess::Open);
    }

    #[test]
    fn test_unlisted_method_default_deny() {
        let policy = sample().with_default_action(DefaultAction::Deny);
        assert_eq!(policy.lookup("/qaengine.UserService/Unknown"), MethodAccess::Closed);
        assert_eq!(policy.lookup(LOGIN), MethodAccess::Open);
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let policy = sample().with_default_action(DefaultAction::Deny);
        assert_eq!(
            policy.lookup("/qaengine.UserService/deleteuser"),
            MethodAccess::Closed
        );
        assert_eq!(policy.lookup("qaengine.UserService/DeleteUser"), MethodAccess::Closed);
    }

    #[test]
    fn test_empty_role_set_rejected() {
        let result = AccessPolicy::builder()
            .allow(DELETE_USER, Vec::<Role>::new())
            .build();
        assert!(matches!(result, Err(PolicyError::EmptyRoleSet(m)) if m == DELETE_USER));
    }

    #[test]
    fn test_invalid_method_rejected() {
        for method in ["DeleteUser", "/qaengine.UserService", "//DeleteUser", "/a/b/c"] {
            let result = AccessPolicy::builder().allow(method, [Role::Admin]).build();
            assert!(matches!(result, Err(PolicyError::InvalidMethod(_))), "{method}");
        }
    }

    #[test]
    fn test_public_and_restricted_conflict() {
        let result = AccessPolicy::builder()
            .allow(LOGIN, [Role::Admin])
            .public(LOGIN)
            .build();
        assert!(matches!(result, Err(PolicyError::Conflict(_))));
    }

    #[test]
    fn test_from_json() {
        let policy = AccessPolicy::from_json(
            r#"{
                "default": "deny",
                "public": ["/qaengine.AuthService/Login"],
                "rules": {
                    "/qaengine.UserService/DeleteUser": ["admin"],
                    "/qaengine.UserService/FindUser": ["admin", "user"]
                }
            }"#,
        )
        .expect("valid document");

        assert_eq!(policy.default_action(), DefaultAction::Deny);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.lookup(LOGIN), MethodAccess::Open);
    }

    #[test]
    fn test_from_json_unknown_role() {
        let result = AccessPolicy::from_json(
            r#"{ "rules": { "/qaengine.UserService/DeleteUser": ["root"] } }"#,
        );
        assert!(matches!(result, Err(PolicyError::Parse(_))));
    }

    #[test]
    fn test_from_json_defaults_to_allow() {
        let policy = AccessPolicy::from_json("{}").unwrap();
        assert_eq!(policy.default_action(), DefaultAction::Allow);
        assert!(policy.is_empty());
    }

    #[test]
    fn test_document_roundtrip() {
        let policy = sample();
        let rebuilt = AccessPolicy::from_document(policy.to_document()).unwrap();
        assert_eq!(policy, rebuilt);
    }

    #[test]
    fn test_shared_policy_replace() {
        let shared = SharedAccessPolicy::new(sample());
        let before = shared.load();

        shared.replace(sample().with_default_action(DefaultAction::Deny));

        assert_eq!(before.default_action(), DefaultAction::Allow);
        assert_eq!(shared.load().default_action(), DefaultAction::Deny);
    }
}

/// Integration tests for crypto-core token handling
///
/// This test module covers the public surface only:
/// - Issue/verify through the crate root re-exports
/// - Sharing one manager across threads
/// - Configuration errors
use chrono::{Duration, Utc};
use crypto_core::{Role, TokenError, TokenManager};
use std::sync::Arc;
use std::thread;

#[test]
fn test_token_roundtrip_through_public_api() {
    let manager = TokenManager::new(b"integration-secret", Duration::minutes(15)).unwrap();
    let now = Utc::now();

    let token = manager.issue("carol", Role::Admin, now).unwrap();
    let claims = manager.verify_at(&token, now).unwrap();

    assert_eq!(claims.sub, "carol");
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.expires_at().unwrap().timestamp(), (now + Duration::minutes(15)).timestamp());
}

#[test]
fn test_manager_shared_across_threads() {
    let manager = Arc::new(TokenManager::new(b"integration-secret", Duration::minutes(5)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let subject = format!("user-{i}");
                let token = manager.issue(&subject, Role::User, Utc::now()).unwrap();
                manager.verify(&token).unwrap().sub == subject
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_invalid_configuration_rejected() {
    assert!(matches!(
        TokenManager::new(b"", Duration::minutes(5)),
        Err(TokenError::Configuration(_))
    ));
    assert!(matches!(
        TokenManager::new(b"secret", Duration::zero()),
        Err(TokenError::Configuration(_))
    ));
}

#[test]
fn test_empty_subject_rejected() {
    let manager = TokenManager::new(b"integration-secret", Duration::minutes(5)).unwrap();

    assert_eq!(
        manager.issue("", Role::User, Utc::now()),
        Err(TokenError::EmptySubject)
    );
}

#[test]
fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    assert!("root".parse::<Role>().is_err());
    assert_eq!(Role::from_admin_flag(true).to_string(), "admin");
}

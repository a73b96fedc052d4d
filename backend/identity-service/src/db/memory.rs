/// In-process user store, used when no DATABASE_URL is configured and in tests
use super::{CredentialStore, StoreError};
use crate::models::{NewUser, ProfileUpdate, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    next_id: i32,
    users: HashMap<i32, User>,
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn modify<F>(&self, id: i32, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(user);
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn save(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        let taken = inner
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StoreError::AlreadyExists);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = User {
            id: inner.next_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_active: user.is_active,
            is_admin: user.is_admin,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn update(&self, id: i32, profile: ProfileUpdate) -> Result<(), StoreError> {
        self.modify(id, move |user| {
            user.first_name = profile.first_name;
            user.last_name = profile.last_name;
        })
        .await
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn update_password(&self, id: i32, password_hash: String) -> Result<(), StoreError> {
        self.modify(id, move |user| user.password_hash = password_hash)
            .await
    }

    async fn toggle_admin(&self, id: i32) -> Result<(), StoreError> {
        self.modify(id, |user| user.is_admin = !user.is_admin).await
    }

    async fn toggle_active(&self, id: i32) -> Result<(), StoreError> {
        self.modify(id, |user| user.is_active = !user.is_active).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }
}

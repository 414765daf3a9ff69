use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{ProfilePatch, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already taken")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence operations the auth and profile services depend on. Emails
/// are expected in normalized (lowercase) form.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Insert a new user. A concurrent insert for the same email must fail
    /// with `DuplicateEmail` for exactly one of the contenders.
    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, StoreError>;

    /// Apply the present fields of `patch` and refresh `updated_at`.
    async fn apply_profile_patch(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<User, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, bio, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, bio, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, bio, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            // The unique index on email is the authority under races.
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(StoreError::Other(e.into())),
        }
    }

    async fn apply_profile_patch(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<User, StoreError> {
        let (bio_set, bio) = match &patch.bio {
            Some(value) => (true, value.clone()),
            None => (false, None),
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                bio = CASE WHEN $3 THEN $4 ELSE bio END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, name, bio, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(bio_set)
        .bind(bio)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        user.ok_or(StoreError::NotFound)
    }
}

/// Map-backed store for unit tests and `AppState::fake()`.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, HashMap<Uuid, User>>> {
        self.users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store mutex poisoned"))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.lock()?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.lock()?;
        Ok(users.get(&id).cloned())
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, StoreError> {
        // Uniqueness check and insert happen under one lock, mirroring the
        // atomicity the unique index gives the durable store.
        let mut users = self.lock()?;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            bio: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn apply_profile_patch(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<User, StoreError> {
        let mut users = self.lock()?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(bio) = &patch.bio {
            user.bio = bio.clone();
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store
            .insert("a@example.com", "hash1", "First")
            .await
            .expect("first insert");

        let err = store
            .insert("a@example.com", "hash2", "Second")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn find_by_email_and_id_roundtrip() {
        let store = InMemoryUserStore::new();
        let user = store
            .insert("a@example.com", "hash", "Alice")
            .await
            .expect("insert");

        let by_email = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_applies_only_present_fields() {
        let store = InMemoryUserStore::new();
        let user = store
            .insert("a@example.com", "hash", "Alice")
            .await
            .expect("insert");

        let patch = ProfilePatch {
            bio: Some(Some("hello".into())),
            ..Default::default()
        };
        let updated = store.apply_profile_patch(user.id, &patch).await.unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert!(updated.updated_at >= user.updated_at);

        // Explicit null clears the field again.
        let clear = ProfilePatch {
            bio: Some(None),
            ..Default::default()
        };
        let cleared = store.apply_profile_patch(user.id, &clear).await.unwrap();
        assert_eq!(cleared.bio, None);
    }

    #[tokio::test]
    async fn patch_for_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        let err = store
            .apply_profile_patch(Uuid::new_v4(), &ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}

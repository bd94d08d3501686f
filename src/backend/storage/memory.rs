/**
 * In-Memory Datastore
 *
 * `Datastore` held in process memory. Used by the integration tests.
 *
 * Every call is recorded by operation name before it runs. Tests can make a
 * given operation fail or stall:
 *
 * ```rust,ignore
 * let store = MemoryStore::new();
 * store.fail_on("update_user_avatar").await;
 * store.delay("update_user_avatar", Duration::from_millis(50)).await;
 * // ...
 * assert_eq!(store.call_count("delete_post").await, 0);
 * ```
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::storage::{Datastore, NewPost, StoreError, UniqueField};
use crate::shared::{Post, User, UserSummary};

#[derive(Debug, Clone)]
struct StoredPost {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, StoredPost>,
    calls: Vec<&'static str>,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
}

impl Inner {
    fn post_view(&self, post: &StoredPost) -> Result<Post, StoreError> {
        let author = self.users.get(&post.author_id).ok_or(StoreError::NotFound)?;
        Ok(Post {
            id: post.id,
            title: post.title.clone(),
            body: post.body.clone(),
            created: post.created,
            updated: post.updated,
            author: author.public(),
        })
    }
}

/// In-process datastore with call recording and fault injection
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `operation` fail with `Unavailable`
    pub async fn fail_on(&self, operation: &'static str) {
        self.inner.lock().await.failing.insert(operation);
    }

    /// Stall every future call of `operation` before it runs
    pub async fn delay(&self, operation: &'static str, latency: Duration) {
        self.inner.lock().await.delays.insert(operation, latency);
    }

    /// Operation names in call order
    pub async fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of recorded calls of `operation`
    pub async fn call_count(&self, operation: &str) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|name| **name == operation)
            .count()
    }

    /// Seed a user without recording a call
    pub async fn insert_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    /// Seed a post without recording a call
    pub async fn insert_post(&self, post: NewPost) {
        let stored = StoredPost {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            body: post.body,
            created: post.created,
            updated: post.created,
        };
        self.inner.lock().await.posts.insert(stored.id, stored);
    }

    /// Snapshot of a stored user
    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.inner.lock().await.users.get(&id).cloned()
    }

    /// Snapshot of all stored users
    pub async fn users(&self) -> Vec<User> {
        self.inner.lock().await.users.values().cloned().collect()
    }

    /// Number of stored posts
    pub async fn post_count(&self) -> usize {
        self.inner.lock().await.posts.len()
    }

    /// Record the call, apply injected latency and failure
    async fn enter(&self, operation: &'static str) -> Result<(), StoreError> {
        let (delay, fails) = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(operation);
            (
                inner.delays.get(operation).copied(),
                inner.failing.contains(operation),
            )
        };

        if let Some(latency) = delay {
            tokio::time::sleep(latency).await;
        }

        if fails {
            return Err(StoreError::Unavailable(format!("injected failure in {operation}")));
        }

        Ok(())
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn search_users(
        &self,
        fragment: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UserSummary>, StoreError> {
        self.enter("search_users").await?;
        let inner = self.inner.lock().await;
        let needle = fragment.to_lowercase();

        let mut matches: Vec<&User> = inner
            .users
            .values()
            .filter(|u| u.created < before && u.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| b.created.cmp(&a.created));

        Ok(matches
            .into_iter()
            .take(limit.max(0) as usize)
            .map(User::summary)
            .collect())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.enter("create_user").await?;
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if inner.users.values().any(|u| u.name == user.name) {
            return Err(StoreError::Duplicate(UniqueField::Name));
        }

        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        self.enter("email_taken").await?;
        Ok(self.inner.lock().await.users.values().any(|u| u.email == email))
    }

    async fn name_taken(&self, name: &str) -> Result<bool, StoreError> {
        self.enter("name_taken").await?;
        Ok(self.inner.lock().await.users.values().any(|u| u.name == name))
    }

    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.enter("user_by_email").await?;
        self.inner
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user_avatar(
        &self,
        id: Uuid,
        avatar: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.enter("update_user_avatar").await?;
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.avatar = avatar.to_string();
        user.updated = updated;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        self.enter("delete_user").await?;
        let mut inner = self.inner.lock().await;
        inner.posts.retain(|_, post| post.author_id != id);
        inner.users.remove(&id);
        Ok(())
    }

    async fn all_posts(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<Post>, StoreError> {
        self.enter("all_posts").await?;
        let inner = self.inner.lock().await;

        let mut posts: Vec<&StoredPost> =
            inner.posts.values().filter(|p| p.created < before).collect();
        posts.sort_by(|a, b| b.created.cmp(&a.created));

        posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|post| inner.post_view(post))
            .collect()
    }

    async fn one_post(&self, id: Uuid) -> Result<Post, StoreError> {
        self.enter("one_post").await?;
        let inner = self.inner.lock().await;
        let post = inner.posts.get(&id).ok_or(StoreError::NotFound)?;
        inner.post_view(post)
    }

    async fn create_post(&self, post: &NewPost) -> Result<(), StoreError> {
        self.enter("create_post").await?;
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(&post.author_id) {
            return Err(StoreError::Unavailable("author does not exist".to_string()));
        }

        inner.posts.insert(
            post.id,
            StoredPost {
                id: post.id,
                author_id: post.author_id,
                title: post.title.clone(),
                body: post.body.clone(),
                created: post.created,
                updated: post.created,
            },
        );
        Ok(())
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.enter("update_post").await?;
        let mut inner = self.inner.lock().await;
        let post = inner.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.title = title.to_string();
        post.body = body.to_string();
        post.updated = updated;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        self.enter("delete_post").await?;
        self.inner
            .lock()
            .await
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

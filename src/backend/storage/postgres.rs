/**
 * PostgreSQL Datastore
 *
 * `Datastore` over a sqlx `PgPool`. Queries are built at runtime with
 * `query_as` and mapped through `FromRow`, so the crate builds without a
 * live database.
 *
 * Schema: see `migrations/`.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::storage::{Datastore, NewPost, StoreError, UniqueField};
use crate::shared::{Post, PublicUser, User, UserSummary};

/// Post joined with its author, as returned by the listing queries
#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    body: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_avatar: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            body: row.body,
            created: row.created,
            updated: row.updated,
            author: PublicUser {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
            },
        }
    }
}

const POST_COLUMNS: &str = r#"
    posts.id, posts.title, posts.body, posts.created, posts.updated,
    users.id AS author_id, users.name AS author_name, users.avatar AS author_avatar
"#;

/// Production datastore
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape `LIKE` wildcards so the fragment matches literally
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Column behind a violated `UNIQUE` constraint (`users_email_key`, `users_name_key`)
fn unique_field(constraint: Option<&str>) -> Option<UniqueField> {
    match constraint? {
        "users_email_key" => Some(UniqueField::Email),
        "users_name_key" => Some(UniqueField::Name),
        _ => None,
    }
}

/// Map a unique violation (SQLSTATE 23505) on a user column to `Duplicate`
fn insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = unique_field(db_err.constraint()) {
                return StoreError::Duplicate(field);
            }
        }
    }
    StoreError::Database(err)
}

fn expect_one_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Datastore for PgStore {
    async fn search_users(
        &self,
        fragment: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UserSummary>, StoreError> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, avatar, created
            FROM users
            WHERE name ILIKE '%' || $1 || '%' AND created < $2
            ORDER BY created DESC
            LIMIT $3
            "#,
        )
        .bind(escape_like(fragment))
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, avatar, created, updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(user.created)
        .bind(user.updated)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn name_taken(&self, name: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created, updated
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update_user_avatar(
        &self,
        id: Uuid,
        avatar: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET avatar = $2, updated = $3 WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .bind(updated)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM posts WHERE uid = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn all_posts(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts INNER JOIN users ON posts.uid = users.id
            WHERE posts.created < $1
            ORDER BY posts.created DESC
            LIMIT $2
            "#
        ))
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn one_post(&self, id: Uuid) -> Result<Post, StoreError> {
        sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts INNER JOIN users ON posts.uid = users.id
            WHERE posts.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Post::from)
        .ok_or(StoreError::NotFound)
    }

    async fn create_post(&self, post: &NewPost) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, body, created, updated, uid)
            VALUES ($1, $2, $3, $4, $4, $5)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.created)
        .bind(post.author_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE posts SET title = $2, body = $3, updated = $4 WHERE id = $1")
            .bind(id)
            .bind(title)
            .bind(body)
            .bind(updated)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }
}

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{NewAccount, Store, StoreError, StoreResult};
use crate::auth::repo_types::User;
use crate::likes::repo_types::{LikeStats, PostLike};
use crate::posts::repo_types::{PostFilter, PostWithAuthor, PostWithAuthorRow};
use crate::profiles::repo_types::{Profile, ProfileChanges};

const POST_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.user_id, p.content, p.created_at, p.updated_at,
           pr.id AS author_id, pr.email AS author_email, pr.name AS author_name,
           pr.bio AS author_bio, pr.avatar_url AS author_avatar_url,
           pr.created_at AS author_created_at, pr.updated_at AS author_updated_at
      FROM posts p
      LEFT JOIN profiles pr ON pr.id = p.user_id
"#;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// Maps constraint violations onto `StoreError` for the given entity.
fn classify(e: sqlx::Error, entity: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(entity);
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(entity);
        }
    }
    StoreError::Other(anyhow::Error::new(e).context(entity))
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "user"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "user"))
    }

    async fn create_account(&self, account: NewAccount<'_>) -> StoreResult<(User, Profile)> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(account.email)
        .bind(account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "email"))?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, name, bio)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, bio, avatar_url, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(account.name)
        .bind(account.bio)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "profile"))?;

        tx.commit().await.context("commit tx")?;
        Ok((user, profile))
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, name, bio, avatar_url, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "profile"))
    }

    async fn list_profiles(&self, exclude: Option<Uuid>, limit: i64) -> StoreResult<Vec<Profile>> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, name, bio, avatar_url, created_at, updated_at
            FROM profiles
            WHERE ($1::uuid IS NULL OR id <> $1)
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(|e| classify(e, "profile"))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
               SET name = COALESCE($2, name),
                   bio = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END,
                   avatar_url = CASE WHEN $4::text IS NULL THEN avatar_url ELSE NULLIF($4, '') END,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, name, bio, avatar_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.avatar_url.as_deref())
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "profile"))
    }

    async fn list_posts(&self, filter: PostFilter) -> StoreResult<Vec<PostWithAuthor>> {
        let sql = format!(
            r#"{POST_WITH_AUTHOR}
             WHERE ($1::uuid IS NULL OR p.user_id = $1)
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $2 OFFSET $3"#
        );
        let rows = sqlx::query_as::<_, PostWithAuthorRow>(&sql)
            .bind(filter.author)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.db)
            .await
            .map_err(|e| classify(e, "post"))?;
        Ok(rows.into_iter().map(PostWithAuthor::from).collect())
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>> {
        let sql = format!("{POST_WITH_AUTHOR} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostWithAuthorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| classify(e, "post"))?;
        Ok(row.map(PostWithAuthor::from))
    }

    async fn insert_post(&self, user_id: Uuid, content: &str) -> StoreResult<PostWithAuthor> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO posts (user_id, content)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify(e, "profile"))?;

        self.get_post(id)
            .await?
            .ok_or(StoreError::NotFound("post"))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        // A concurrent toggle that wins the insert leaves the row in place,
        // so "nothing removed" always means "now liked".
        let liked: bool = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM post_likes
                 WHERE post_id = $1 AND user_id = $2
                RETURNING id
            ), added AS (
                INSERT INTO post_likes (post_id, user_id)
                SELECT $1::uuid, $2::uuid
                 WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (post_id, user_id) DO NOTHING
                RETURNING id
            )
            SELECT NOT EXISTS (SELECT 1 FROM removed)
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify(e, "post"))?;
        Ok(liked)
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<Option<PostLike>> {
        sqlx::query_as::<_, PostLike>(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            RETURNING id, post_id, user_id, created_at
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "post"))
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(r#"DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2"#)
            .bind(post_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| classify(e, "like"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM post_likes WHERE post_id = $1"#)
            .bind(post_id)
            .fetch_one(&self.db)
            .await
            .map_err(|e| classify(e, "like"))
    }

    async fn is_liked(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)"#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify(e, "like"))
    }

    async fn like_stats(
        &self,
        post_ids: &[Uuid],
        viewer: Option<Uuid>,
    ) -> StoreResult<HashMap<Uuid, LikeStats>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64, Option<bool>)>(
            r#"
            SELECT post_id, COUNT(*), BOOL_OR(user_id = $2::uuid)
              FROM post_likes
             WHERE post_id = ANY($1)
             GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .bind(viewer)
        .fetch_all(&self.db)
        .await
        .map_err(|e| classify(e, "like"))?;

        Ok(rows
            .into_iter()
            .map(|(post_id, count, liked)| {
                (
                    post_id,
                    LikeStats {
                        count,
                        liked: liked.unwrap_or(false),
                    },
                )
            })
            .collect())
    }
}

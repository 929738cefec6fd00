use crate::error::Result;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Repository for like operations
///
/// The like row and `posts.like_count` change in the same transaction, and
/// the counter only moves when a row was actually inserted or deleted.
#[derive(Clone)]
pub struct LikeRepository {
    pool: PgPool,
}

impl LikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Like a post (idempotent). Returns the post's like count afterwards.
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let like_count: i64 = if inserted > 0 {
            sqlx::query_scalar(
                "UPDATE posts SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar("SELECT like_count FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        Ok(like_count)
    }

    /// Remove a like (idempotent). Returns the post's like count afterwards.
    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let like_count: i64 = if deleted > 0 {
            sqlx::query_scalar(
                r#"
                UPDATE posts SET like_count = GREATEST(like_count - 1, 0)
                WHERE id = $1
                RETURNING like_count
                "#,
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar("SELECT like_count FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        Ok(like_count)
    }

    pub async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Which of `post_ids` the user has liked
    pub async fn liked_among(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let liked: Vec<Uuid> = sqlx::query_scalar(
            "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(liked.into_iter().collect())
    }
}

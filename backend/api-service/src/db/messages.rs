/// Message database operations
use crate::error::Result;
use crate::models::{ConversationRow, Message, Pagination};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create(
    pool: &PgPool,
    sender_id: Uuid,
    receiver_id: Uuid,
    post_id: Option<Uuid>,
    content: &str,
) -> Result<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (sender_id, receiver_id, post_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(post_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

pub async fn find_by_id(pool: &PgPool, message_id: Uuid) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(message_id)
        .fetch_optional(pool)
        .await?;

    Ok(message)
}

/// Latest message and unread count per counterpart, newest conversation first
pub async fn conversations(pool: &PgPool, user_id: Uuid) -> Result<Vec<ConversationRow>> {
    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        WITH mine AS (
            SELECT m.*,
                   CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS other_user_id
            FROM messages m
            WHERE m.sender_id = $1 OR m.receiver_id = $1
        ),
        latest AS (
            SELECT DISTINCT ON (other_user_id) *
            FROM mine
            ORDER BY other_user_id, created_at DESC
        ),
        unread AS (
            SELECT sender_id AS other_user_id, COUNT(*) AS unread_count
            FROM messages
            WHERE receiver_id = $1 AND read_at IS NULL
            GROUP BY sender_id
        )
        SELECT l.other_user_id,
               u.name AS other_user_name,
               u.avatar_url AS other_user_avatar_url,
               l.id, l.sender_id, l.receiver_id, l.post_id, l.content, l.read_at, l.created_at,
               COALESCE(r.unread_count, 0) AS unread_count
        FROM latest l
        JOIN users u ON u.id = l.other_user_id
        LEFT JOIN unread r ON r.other_user_id = l.other_user_id
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One page of the thread between two users, oldest first within the page
///
/// Pages count back from the newest message: page 1 holds the latest `limit`.
pub async fn conversation(
    pool: &PgPool,
    user_id: Uuid,
    other_user_id: Uuid,
    pagination: Pagination,
) -> Result<(Vec<Message>, i64)> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages
        WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
        "#,
    )
    .bind(user_id)
    .bind(other_user_id)
    .fetch_one(pool)
    .await?;

    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM (
            SELECT * FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
        ) page
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(other_user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((messages, total))
}

/// Mark everything `other_user_id` sent to `user_id` as read
pub async fn mark_thread_read(pool: &PgPool, user_id: Uuid, other_user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE messages SET read_at = NOW()
        WHERE receiver_id = $1 AND sender_id = $2 AND read_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(other_user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Mark one message read; keeps the first read timestamp
pub async fn mark_read(pool: &PgPool, message_id: Uuid) -> Result<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        UPDATE messages SET read_at = COALESCE(read_at, NOW())
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(message_id)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND read_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

use crate::db::{messages, posts, users};
use crate::error::{AppError, Result};
use crate::models::{ConversationSummary, Message, Page, Pagination, SendMessageRequest};
use sqlx::PgPool;
use uuid::Uuid;

/// Direct messages between buyers and sellers
#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn send(&self, sender_id: Uuid, req: &SendMessageRequest) -> Result<Message> {
        if req.receiver_id == sender_id {
            return Err(AppError::Validation(
                "You cannot send a message to yourself".to_string(),
            ));
        }

        let content = req.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }

        if !users::exists(&self.pool, req.receiver_id).await? {
            return Err(AppError::NotFound("Recipient not found".to_string()));
        }
        if let Some(post_id) = req.post_id {
            if !posts::exists(&self.pool, post_id).await? {
                return Err(AppError::NotFound("Post not found".to_string()));
            }
        }

        let message =
            messages::create(&self.pool, sender_id, req.receiver_id, req.post_id, content).await?;
        tracing::debug!(message_id = %message.id, "Message sent");
        Ok(message)
    }

    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let rows = messages::conversations(&self.pool, user_id).await?;
        Ok(rows.into_iter().map(ConversationSummary::from).collect())
    }

    /// Thread with `other_user_id`; marks what they sent to the caller as read
    pub async fn conversation(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
        pagination: Pagination,
    ) -> Result<Page<Message>> {
        let marked = messages::mark_thread_read(&self.pool, user_id, other_user_id).await?;
        let (items, total) =
            messages::conversation(&self.pool, user_id, other_user_id, pagination).await?;

        if marked > 0 {
            tracing::debug!(count = marked, "Marked messages read");
        }
        Ok(Page::new(items, total, pagination))
    }

    /// Only the receiver may mark a message read
    pub async fn mark_read(&self, user_id: Uuid, message_id: Uuid) -> Result<Message> {
        let message = messages::find_by_id(&self.pool, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.receiver_id != user_id {
            return Err(AppError::Forbidden(
                "Only the recipient can mark a message as read".to_string(),
            ));
        }

        messages::mark_read(&self.pool, message_id).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        messages::unread_count(&self.pool, user_id).await
    }
}

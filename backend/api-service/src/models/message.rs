use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const MAX_MESSAGE_CHARS: u64 = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub post_id: Option<Uuid>,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1 to 2000 characters"))]
    pub content: String,
    pub post_id: Option<Uuid>,
}

/// Latest message per counterpart, as returned by the conversations query
#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub other_user_avatar_url: Option<String>,
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub post_id: Option<Uuid>,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub user: Counterpart,
    pub last_message: Message,
    pub unread_count: i64,
}

impl From<ConversationRow> for ConversationSummary {
    fn from(row: ConversationRow) -> Self {
        Self {
            user: Counterpart {
                id: row.other_user_id,
                name: row.other_user_name,
                avatar_url: row.other_user_avatar_url,
            },
            last_message: Message {
                id: row.id,
                sender_id: row.sender_id,
                receiver_id: row.receiver_id,
                post_id: row.post_id,
                content: row.content,
                read_at: row.read_at,
                created_at: row.created_at,
            },
            unread_count: row.unread_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: i64,
}

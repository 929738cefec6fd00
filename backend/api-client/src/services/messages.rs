use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{ConversationSummary, Message, Page, PageQuery, SendMessageRequest, UnreadCount};
use std::sync::Arc;
use uuid::Uuid;

pub struct MessagesApi {
    http: Arc<HttpClient>,
}

impl MessagesApi {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn send(&self, request: &SendMessageRequest) -> Result<Message> {
        self.http
            .execute(RequestSpec::post("/messages").json(request)?)
            .await
    }

    /// Latest message per counterpart, newest first
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.http
            .execute(RequestSpec::get("/messages/conversations"))
            .await
    }

    /// Thread with one user; the server marks received messages as read
    pub async fn thread(&self, user_id: Uuid, page: PageQuery) -> Result<Page<Message>> {
        self.http
            .execute(RequestSpec::get(format!("/messages/conversations/{user_id}")).query(&page)?)
            .await
    }

    pub async fn unread_count(&self) -> Result<i64> {
        let unread: UnreadCount = self
            .http
            .execute(RequestSpec::get("/messages/unread-count"))
            .await?;
        Ok(unread.count)
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Message> {
        self.http
            .execute(RequestSpec::patch(format!("/messages/{id}/read")))
            .await
    }
}

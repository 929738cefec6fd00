/// Messaging handlers
use crate::error::Result;
use crate::models::{PageQuery, Pagination, SendMessageRequest, UnreadCount};
use crate::services::MessageService;
use actix_middleware::UserId;
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use uuid::Uuid;
use validator::Validate;

pub async fn send_message(
    messages: web::Data<MessageService>,
    user_id: UserId,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let message = messages.send(user_id.0, &req).await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(message)))
}

pub async fn list_conversations(
    messages: web::Data<MessageService>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let conversations = messages.conversations(user_id.0).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(conversations)))
}

pub async fn get_conversation(
    messages: web::Data<MessageService>,
    user_id: UserId,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = messages
        .conversation(user_id.0, path.into_inner(), Pagination::from(*query))
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(page)))
}

pub async fn unread_count(
    messages: web::Data<MessageService>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let count = messages.unread_count(user_id.0).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(UnreadCount { count })))
}

pub async fn mark_read(
    messages: web::Data<MessageService>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let message = messages.mark_read(user_id.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(message)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/messages")
            .route("", web::post().to(send_message))
            .route("/conversations", web::get().to(list_conversations))
            .route("/conversations/{user_id}", web::get().to(get_conversation))
            .route("/unread-count", web::get().to(unread_count))
            .route("/{id}/read", web::patch().to(mark_read)),
    );
}

/// Payment handlers - tier catalogue, initiation and companion-app confirmation
use crate::error::{AppError, Result};
use crate::models::{ConfirmPaymentRequest, InitiatePaymentRequest, PageQuery, Pagination};
use crate::services::PaymentService;
use actix_middleware::UserId;
use actix_web::{web, HttpRequest, HttpResponse};
use error_types::ApiEnvelope;
use uuid::Uuid;
use validator::Validate;

pub const COMPANION_KEY_HEADER: &str = "X-Companion-Key";

pub async fn list_tiers(payments: web::Data<PaymentService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiEnvelope::ok(payments.tiers()))
}

pub async fn initiate_payment(
    payments: web::Data<PaymentService>,
    user_id: UserId,
    req: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = payments.initiate(user_id.0, &req).await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(response)))
}

pub async fn list_payments(
    payments: web::Data<PaymentService>,
    user_id: UserId,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = payments.list(user_id.0, Pagination::from(*query)).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(page)))
}

pub async fn get_payment(
    payments: web::Data<PaymentService>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let payment = payments.get(user_id.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(payment)))
}

/// Called by the SMS companion app, authenticated by a shared key rather than a JWT
pub async fn confirm_payment(
    payments: web::Data<PaymentService>,
    http_req: HttpRequest,
    req: web::Json<ConfirmPaymentRequest>,
) -> Result<HttpResponse> {
    let presented = http_req
        .headers()
        .get(COMPANION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !payments.companion_key_matches(presented) {
        tracing::warn!("Payment confirmation rejected: bad companion key");
        return Err(AppError::Unauthorized("Invalid companion key".to_string()));
    }

    req.validate()?;
    let payment = payments.confirm(&req).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(payment)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .service(
                web::resource("")
                    .route(web::get().to(list_payments))
                    .route(web::post().to(initiate_payment)),
            )
            .route("/tiers", web::get().to(list_tiers))
            .route("/confirm", web::post().to(confirm_payment))
            .route("/{id}", web::get().to(get_payment)),
    );
}

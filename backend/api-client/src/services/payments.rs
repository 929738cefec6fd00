use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{
    ConfirmPaymentRequest, InitiatePaymentRequest, InitiatePaymentResponse, Page, PageQuery,
    Payment, TiersResponse,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared-secret header sent by the SMS companion app
pub const COMPANION_KEY_HEADER: &str = "X-Companion-Key";

pub struct PaymentsApi {
    http: Arc<HttpClient>,
}

impl PaymentsApi {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn tiers(&self) -> Result<TiersResponse> {
        self.http.execute(RequestSpec::get("/payments/tiers")).await
    }

    /// Open a pending payment and get the transfer instructions
    pub async fn initiate(&self, request: &InitiatePaymentRequest) -> Result<InitiatePaymentResponse> {
        self.http
            .execute(RequestSpec::post("/payments").json(request)?)
            .await
    }

    pub async fn list(&self, page: PageQuery) -> Result<Page<Payment>> {
        self.http
            .execute(RequestSpec::get("/payments").query(&page)?)
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Payment> {
        self.http.execute(RequestSpec::get(format!("/payments/{id}"))).await
    }

    /// Companion-app confirmation; authenticated by key, not by session
    pub async fn confirm(&self, companion_key: &str, request: &ConfirmPaymentRequest) -> Result<Payment> {
        let spec = RequestSpec::post("/payments/confirm")
            .anonymous()
            .header(COMPANION_KEY_HEADER, companion_key)
            .json(request)?;
        self.http.execute(spec).await
    }
}

use super::post::PostTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// What a payment buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentPurpose {
    /// Owner pays to raise the listing's visibility tier
    Promotion,
    /// Buyer pays the seller's asking price
    Purchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MobileMoneyProvider {
    Mtn,
    Orange,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub purpose: PaymentPurpose,
    pub tier: Option<PostTier>,
    pub amount: i64,
    pub currency: String,
    pub phone_number: String,
    pub provider: MobileMoneyProvider,
    pub reference: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Fields of a payment about to be inserted
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub purpose: PaymentPurpose,
    pub tier: Option<PostTier>,
    pub amount: i64,
    pub currency: String,
    pub phone_number: String,
    pub provider: MobileMoneyProvider,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    pub post_id: Uuid,
    pub purpose: PaymentPurpose,
    /// Required for promotions
    pub tier: Option<PostTier>,
    #[validate(length(min = 6, max = 32, message = "Invalid phone number"))]
    pub phone_number: String,
    pub provider: MobileMoneyProvider,
}

/// What the payer must do to complete a pending payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstructions {
    pub merchant_number: String,
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub payment: Payment,
    pub instructions: PaymentInstructions,
}

/// Body posted by the SMS companion app after it matched a receipt
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(length(equal = 8, message = "Reference must be 8 characters"))]
    pub reference: String,
    #[validate(length(min = 1, max = 64, message = "Transaction id must be 1 to 64 characters"))]
    pub transaction_id: String,
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub sender_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier: PostTier,
    pub price: i64,
    pub currency: String,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersResponse {
    pub tiers: Vec<TierInfo>,
    pub merchant_number: String,
}

/// Mobile-money payments
///
/// The payer transfers money manually to the merchant number, quoting the
/// payment reference. The SMS companion app reads the operator's receipt and
/// confirms the payment; confirmation applies its effect to the listing in
/// the same transaction.
use crate::config::PaymentConfig;
use crate::db::{payments, posts};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    effective_tier, ConfirmPaymentRequest, InitiatePaymentRequest, InitiatePaymentResponse,
    NewPayment, Page, Pagination, Payment, PaymentInstructions, PaymentPurpose, PaymentStatus,
    PostStatus, PostTier, TierInfo, TiersResponse,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

pub const REFERENCE_LEN: usize = 8;
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_ATTEMPTS: usize = 5;

/// Eight upper-case alphanumerics
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERENCE_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect()
}

/// Price and duration of a paid tier
pub fn tier_terms(config: &PaymentConfig, tier: PostTier) -> Result<(i64, i64)> {
    match tier {
        PostTier::Standard => Ok((config.standard_price, config.standard_days)),
        PostTier::Premium => Ok((config.premium_price, config.premium_days)),
        PostTier::Free => Err(AppError::Validation(
            "Choose a paid tier (standard or premium)".to_string(),
        )),
    }
}

/// Promotions are for the owner; purchases are for anyone else
pub fn check_payer(purpose: PaymentPurpose, payer: Uuid, owner: Uuid) -> Result<()> {
    match purpose {
        PaymentPurpose::Promotion if payer != owner => Err(AppError::Forbidden(
            "Only the owner can promote this post".to_string(),
        )),
        PaymentPurpose::Purchase if payer == owner => Err(AppError::Forbidden(
            "You cannot buy your own post".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Amount due and the tier recorded on the payment
pub fn amount_due(
    config: &PaymentConfig,
    purpose: PaymentPurpose,
    tier: Option<PostTier>,
    post_price: i64,
) -> Result<(i64, Option<PostTier>)> {
    match purpose {
        PaymentPurpose::Promotion => {
            let tier = tier.ok_or_else(|| {
                AppError::Validation("A tier is required for promotions".to_string())
            })?;
            let (price, _) = tier_terms(config, tier)?;
            Ok((price, Some(tier)))
        }
        PaymentPurpose::Purchase => {
            if post_price <= 0 {
                return Err(AppError::Validation(
                    "This item is free; no payment is needed".to_string(),
                ));
            }
            Ok((post_price, None))
        }
    }
}

/// What a confirmation request does to a locked payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    /// Same receipt delivered again
    AlreadyConfirmed,
    Confirm,
    Underpaid,
    /// Still pending but past its TTL
    Expired,
}

pub fn evaluate_confirmation(
    payment: &Payment,
    transaction_id: &str,
    amount: i64,
    pending_ttl: Duration,
    now: DateTime<Utc>,
) -> Result<ConfirmDecision> {
    match payment.status {
        PaymentStatus::Confirmed if payment.transaction_id.as_deref() == Some(transaction_id) => {
            Ok(ConfirmDecision::AlreadyConfirmed)
        }
        PaymentStatus::Pending if payment.created_at + pending_ttl < now => {
            Ok(ConfirmDecision::Expired)
        }
        PaymentStatus::Pending if amount < payment.amount => Ok(ConfirmDecision::Underpaid),
        PaymentStatus::Pending => Ok(ConfirmDecision::Confirm),
        status => Err(AppError::Conflict(format!(
            "Payment {} is already {}",
            payment.reference,
            status.as_str()
        ))),
    }
}

/// New tier and expiry after a promotion
///
/// Time is added from the later of now and the current expiry; a lower
/// tier bought over a higher active one does not downgrade it.
pub fn extend_tier(
    current: PostTier,
    current_expiry: Option<DateTime<Utc>>,
    bought: PostTier,
    days: i64,
    now: DateTime<Utc>,
) -> (PostTier, DateTime<Utc>) {
    let active = effective_tier(current, current_expiry, now);
    let start = match current_expiry {
        Some(expiry) if active != PostTier::Free && expiry > now => expiry,
        _ => now,
    };
    let tier = if active.rank() > bought.rank() {
        active
    } else {
        bought
    };
    (tier, start + Duration::days(days))
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(pool: PgPool, config: PaymentConfig) -> Self {
        Self { pool, config }
    }

    /// Constant-time check of the companion app's shared key
    pub fn companion_key_matches(&self, presented: &str) -> bool {
        let expected = self.config.companion_key.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn tiers(&self) -> TiersResponse {
        let tiers = [PostTier::Standard, PostTier::Premium]
            .into_iter()
            .filter_map(|tier| {
                tier_terms(&self.config, tier).ok().map(|(price, days)| TierInfo {
                    tier,
                    price,
                    currency: self.config.currency.clone(),
                    duration_days: days,
                })
            })
            .collect();

        TiersResponse {
            tiers,
            merchant_number: self.config.merchant_number.clone(),
        }
    }

    fn instructions(&self, payment: &Payment) -> PaymentInstructions {
        PaymentInstructions {
            merchant_number: self.config.merchant_number.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            reference: payment.reference.clone(),
            expires_at: payment.created_at + Duration::seconds(self.config.pending_ttl_secs),
            message: format!(
                "Send {} {} to {} and enter {} as the transfer reason.",
                payment.amount, payment.currency, self.config.merchant_number, payment.reference
            ),
        }
    }

    pub async fn initiate(
        &self,
        user_id: Uuid,
        req: &InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse> {
        let post = posts::find_by_id(&self.pool, req.post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        check_payer(req.purpose, user_id, post.user_id)?;
        if post.status != PostStatus::Active {
            return Err(AppError::Conflict("Post is no longer available".to_string()));
        }

        let (amount, tier) = amount_due(&self.config, req.purpose, req.tier, post.price)?;
        let currency = match req.purpose {
            PaymentPurpose::Promotion => self.config.currency.clone(),
            PaymentPurpose::Purchase => post.currency.clone(),
        };

        let mut new_payment = NewPayment {
            user_id,
            post_id: post.id,
            purpose: req.purpose,
            tier,
            amount,
            currency,
            phone_number: req.phone_number.trim().to_string(),
            provider: req.provider,
            reference: generate_reference(),
        };

        let mut attempt = 1;
        let payment = loop {
            match payments::create(&self.pool, &new_payment).await {
                Ok(payment) => break payment,
                Err(AppError::Conflict(_)) if attempt < REFERENCE_ATTEMPTS => {
                    attempt += 1;
                    new_payment.reference = generate_reference();
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!(
            payment_id = %payment.id,
            reference = %payment.reference,
            purpose = ?payment.purpose,
            amount = payment.amount,
            "Payment initiated"
        );

        Ok(InitiatePaymentResponse {
            instructions: self.instructions(&payment),
            payment,
        })
    }

    /// Apply a receipt reported by the companion app
    pub async fn confirm(&self, req: &ConfirmPaymentRequest) -> Result<Payment> {
        let reference = req.reference.trim().to_ascii_uppercase();
        let transaction_id = req.transaction_id.trim();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let payment = payments::lock_by_reference(&mut tx, &reference)
            .await?
            .ok_or_else(|| AppError::NotFound("Unknown payment reference".to_string()))?;

        let decision = evaluate_confirmation(
            &payment,
            transaction_id,
            req.amount,
            Duration::seconds(self.config.pending_ttl_secs),
            now,
        )
        .map_err(|e| {
            metrics::record_payment_confirmation("conflict");
            e
        })?;

        match decision {
            ConfirmDecision::AlreadyConfirmed => {
                tx.commit().await?;
                metrics::record_payment_confirmation("duplicate");
                Ok(payment)
            }
            ConfirmDecision::Expired => {
                payments::set_status(&mut tx, payment.id, PaymentStatus::Expired).await?;
                tx.commit().await?;
                metrics::record_payment_confirmation("expired");
                Err(AppError::Conflict(format!(
                    "Payment {reference} expired before it was confirmed"
                )))
            }
            ConfirmDecision::Underpaid => {
                payments::set_status(&mut tx, payment.id, PaymentStatus::Failed).await?;
                tx.commit().await?;
                metrics::record_payment_confirmation("underpaid");
                tracing::warn!(
                    payment_id = %payment.id,
                    expected = payment.amount,
                    received = req.amount,
                    "Payment underpaid"
                );
                Err(AppError::Validation(format!(
                    "Received {} but {} {} was due",
                    req.amount, payment.amount, payment.currency
                )))
            }
            ConfirmDecision::Confirm => {
                if payment.purpose == PaymentPurpose::Purchase {
                    let status = posts::lock_status(&mut tx, payment.post_id).await?;
                    if status != Some(PostStatus::Active) {
                        payments::set_status(&mut tx, payment.id, PaymentStatus::Failed).await?;
                        tx.commit().await?;
                        metrics::record_payment_confirmation("unavailable");
                        tracing::warn!(
                            payment_id = %payment.id,
                            post_id = %payment.post_id,
                            "Purchase confirmed for a listing that is no longer active"
                        );
                        return Err(AppError::Conflict(format!(
                            "Post is no longer available; payment {reference} was not applied"
                        )));
                    }
                }

                let confirmed =
                    payments::mark_confirmed(&mut tx, payment.id, transaction_id).await?;

                match (confirmed.purpose, confirmed.tier) {
                    (PaymentPurpose::Promotion, Some(bought)) => {
                        let (current, expiry) = posts::lock_tier(&mut tx, confirmed.post_id)
                            .await?
                            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
                        let (_, days) = tier_terms(&self.config, bought)?;
                        let (tier, expires_at) = extend_tier(current, expiry, bought, days, now);
                        posts::set_tier(&mut tx, confirmed.post_id, tier, expires_at).await?;
                    }
                    (PaymentPurpose::Promotion, None) => {
                        return Err(AppError::Internal(format!(
                            "Promotion payment {} has no tier",
                            confirmed.id
                        )));
                    }
                    (PaymentPurpose::Purchase, _) => {
                        posts::mark_sold(&mut tx, confirmed.post_id).await?;
                    }
                }

                tx.commit().await?;
                metrics::record_payment_confirmation("confirmed");
                tracing::info!(
                    payment_id = %confirmed.id,
                    post_id = %confirmed.post_id,
                    "Payment confirmed"
                );
                Ok(confirmed)
            }
        }
    }

    /// Payer only
    pub async fn get(&self, user_id: Uuid, payment_id: Uuid) -> Result<Payment> {
        let payment = payments::find_by_id(&self.pool, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only view your own payments".to_string(),
            ));
        }
        Ok(payment)
    }

    pub async fn list(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<Payment>> {
        let (items, total) = payments::list_for_user(&self.pool, user_id, pagination).await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn expire_stale(&self) -> Result<u64> {
        payments::expire_stale(&self.pool, self.config.pending_ttl_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MobileMoneyProvider;

    fn payment(status: PaymentStatus, amount: i64, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            purpose: PaymentPurpose::Promotion,
            tier: Some(PostTier::Standard),
            amount,
            currency: "XAF".into(),
            phone_number: "+237670000000".into(),
            provider: MobileMoneyProvider::Mtn,
            reference: "AB12CD34".into(),
            status,
            transaction_id: None,
            created_at,
            confirmed_at: None,
        }
    }

    #[test]
    fn test_reference_shape() {
        for _ in 0..50 {
            let reference = generate_reference();
            assert_eq!(reference.len(), REFERENCE_LEN);
            assert!(reference
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_payer_rules() {
        let owner = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        assert!(check_payer(PaymentPurpose::Promotion, owner, owner).is_ok());
        assert!(matches!(
            check_payer(PaymentPurpose::Promotion, buyer, owner),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_payer(PaymentPurpose::Purchase, buyer, owner).is_ok());
        assert!(matches!(
            check_payer(PaymentPurpose::Purchase, owner, owner),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_amount_due() {
        let config = PaymentConfig::default();
        assert_eq!(
            amount_due(&config, PaymentPurpose::Promotion, Some(PostTier::Premium), 50_000).unwrap(),
            (2_500, Some(PostTier::Premium))
        );
        assert_eq!(
            amount_due(&config, PaymentPurpose::Purchase, Some(PostTier::Premium), 50_000).unwrap(),
            (50_000, None)
        );
        assert!(amount_due(&config, PaymentPurpose::Promotion, None, 0).is_err());
        assert!(amount_due(&config, PaymentPurpose::Promotion, Some(PostTier::Free), 0).is_err());
        assert!(amount_due(&config, PaymentPurpose::Purchase, None, 0).is_err());
    }

    #[test]
    fn test_confirmation_decisions() {
        let now = Utc::now();
        let ttl = Duration::minutes(30);

        let pending = payment(PaymentStatus::Pending, 1_000, now - Duration::minutes(5));
        assert_eq!(
            evaluate_confirmation(&pending, "TX1", 1_000, ttl, now).unwrap(),
            ConfirmDecision::Confirm
        );
        assert_eq!(
            evaluate_confirmation(&pending, "TX1", 1_500, ttl, now).unwrap(),
            ConfirmDecision::Confirm
        );
        assert_eq!(
            evaluate_confirmation(&pending, "TX1", 999, ttl, now).unwrap(),
            ConfirmDecision::Underpaid
        );

        let stale = payment(PaymentStatus::Pending, 1_000, now - Duration::minutes(31));
        assert_eq!(
            evaluate_confirmation(&stale, "TX1", 1_000, ttl, now).unwrap(),
            ConfirmDecision::Expired
        );

        let mut confirmed = payment(PaymentStatus::Confirmed, 1_000, now);
        confirmed.transaction_id = Some("TX1".into());
        assert_eq!(
            evaluate_confirmation(&confirmed, "TX1", 1_000, ttl, now).unwrap(),
            ConfirmDecision::AlreadyConfirmed
        );
        assert!(matches!(
            evaluate_confirmation(&confirmed, "TX2", 1_000, ttl, now),
            Err(AppError::Conflict(_))
        ));

        let failed = payment(PaymentStatus::Failed, 1_000, now);
        assert!(matches!(
            evaluate_confirmation(&failed, "TX1", 1_000, ttl, now),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_extend_tier_from_now_when_free() {
        let now = Utc::now();
        let (tier, expiry) = extend_tier(PostTier::Free, None, PostTier::Standard, 7, now);
        assert_eq!(tier, PostTier::Standard);
        assert_eq!(expiry, now + Duration::days(7));
    }

    #[test]
    fn test_extend_tier_stacks_on_active_expiry() {
        let now = Utc::now();
        let current_expiry = now + Duration::days(3);
        let (tier, expiry) =
            extend_tier(PostTier::Standard, Some(current_expiry), PostTier::Standard, 7, now);
        assert_eq!(tier, PostTier::Standard);
        assert_eq!(expiry, current_expiry + Duration::days(7));
    }

    #[test]
    fn test_extend_tier_never_downgrades_active_premium() {
        let now = Utc::now();
        let current_expiry = now + Duration::days(10);
        let (tier, _) =
            extend_tier(PostTier::Premium, Some(current_expiry), PostTier::Standard, 7, now);
        assert_eq!(tier, PostTier::Premium);
    }

    #[test]
    fn test_extend_tier_ignores_lapsed_expiry() {
        let now = Utc::now();
        let lapsed = now - Duration::days(2);
        let (tier, expiry) = extend_tier(PostTier::Premium, Some(lapsed), PostTier::Standard, 7, now);
        assert_eq!(tier, PostTier::Standard);
        assert_eq!(expiry, now + Duration::days(7));
    }

    #[tokio::test]
    async fn test_companion_key_comparison() {
        let service = PaymentService::new(
            sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/bazari_test")
                .unwrap(),
            PaymentConfig::default(),
        );
        assert!(service.companion_key_matches("dev-companion-key"));
        assert!(!service.companion_key_matches("dev-companion-kez"));
        assert!(!service.companion_key_matches(""));
    }

    #[tokio::test]
    async fn test_empty_companion_key_never_matches() {
        let service = PaymentService::new(
            sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/bazari_test")
                .unwrap(),
            PaymentConfig {
                companion_key: String::new(),
                ..PaymentConfig::default()
            },
        );
        assert!(!service.companion_key_matches(""));
        assert!(!service.companion_key_matches("anything"));
    }
}

/// Payment database operations
use crate::error::Result;
use crate::models::{NewPayment, Pagination, Payment, PaymentStatus};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub async fn create(pool: &PgPool, payment: &NewPayment) -> Result<Payment> {
    let created = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (user_id, post_id, purpose, tier, amount, currency, phone_number, provider, reference)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(payment.user_id)
    .bind(payment.post_id)
    .bind(payment.purpose)
    .bind(payment.tier)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.phone_number)
    .bind(payment.provider)
    .bind(&payment.reference)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

pub async fn find_by_id(pool: &PgPool, payment_id: Uuid) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

    Ok(payment)
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    pagination: Pagination,
) -> Result<(Vec<Payment>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok((payments, total))
}

/// Row-locked lookup used while confirming
pub async fn lock_by_reference(conn: &mut PgConnection, reference: &str) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE reference = $1 FOR UPDATE",
    )
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(payment)
}

pub async fn mark_confirmed(
    conn: &mut PgConnection,
    payment_id: Uuid,
    transaction_id: &str,
) -> Result<Payment> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET status = 'confirmed', transaction_id = $2, confirmed_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(transaction_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(payment)
}

/// Terminal non-success transition (`failed` or `expired`)
pub async fn set_status(
    conn: &mut PgConnection,
    payment_id: Uuid,
    status: PaymentStatus,
) -> Result<()> {
    sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
        .bind(payment_id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Expire pending payments created more than `ttl_secs` ago
pub async fn expire_stale(pool: &PgPool, ttl_secs: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE payments SET status = 'expired'
        WHERE status = 'pending'
          AND created_at < NOW() - make_interval(secs => $1::double precision)
        "#,
    )
    .bind(ttl_secs as f64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

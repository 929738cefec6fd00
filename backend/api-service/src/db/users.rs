/// User database operations
use crate::error::Result;
use crate::models::{AuthProvider, User};
use sqlx::PgPool;
use uuid::Uuid;

/// Fields for a new account; `password_hash` is absent for OAuth-only users
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub auth_provider: AuthProvider,
    pub provider_id: Option<&'a str>,
}

/// Optional fields for profile updates
#[derive(Debug, Default)]
pub struct UpdateUserFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Find user by email (case-insensitive)
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_provider(
    pool: &PgPool,
    provider: AuthProvider,
    provider_id: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE auth_provider = $1 AND provider_id = $2",
    )
    .bind(provider)
    .bind(provider_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn exists(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Insert a user; the email is stored lower-cased
pub async fn create(pool: &PgPool, new_user: NewUser<'_>) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, phone, password_hash, avatar_url, auth_provider, provider_id)
        VALUES (LOWER($1), $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new_user.email)
    .bind(new_user.name)
    .bind(new_user.phone)
    .bind(new_user.password_hash)
    .bind(new_user.avatar_url)
    .bind(new_user.auth_provider)
    .bind(new_user.provider_id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Attach an OAuth identity to an existing account found by email
///
/// The account keeps its original `auth_provider` and password; only a
/// missing avatar is filled in.
pub async fn link_provider(
    pool: &PgPool,
    user_id: Uuid,
    provider: AuthProvider,
    provider_id: &str,
    avatar_url: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET auth_provider = CASE WHEN password_hash IS NULL THEN $2 ELSE auth_provider END,
            provider_id = $3,
            avatar_url = COALESCE(avatar_url, $4),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(provider)
    .bind(provider_id)
    .bind(avatar_url)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    fields: UpdateUserFields,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.phone)
    .bind(fields.avatar_url)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

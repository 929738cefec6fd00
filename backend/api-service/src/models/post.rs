use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const MAX_IMAGES_PER_POST: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Sold,
    Archived,
}

/// Paid visibility level of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostTier {
    Free,
    Standard,
    Premium,
}

impl PostTier {
    /// Ordering weight: premium > standard > free
    pub fn rank(&self) -> u8 {
        match self {
            PostTier::Free => 0,
            PostTier::Standard => 1,
            PostTier::Premium => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostTier::Free => "free",
            PostTier::Standard => "standard",
            PostTier::Premium => "premium",
        }
    }
}

/// Tier that currently applies: paid tiers lapse to `Free` at expiry
pub fn effective_tier(
    tier: PostTier,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PostTier {
    match (tier, expires_at) {
        (PostTier::Free, _) => PostTier::Free,
        (paid, Some(expiry)) if expiry > now => paid,
        _ => PostTier::Free,
    }
}

/// `posts` row joined with seller and category names
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub location: Option<String>,
    pub images: Vec<String>,
    pub status: PostStatus,
    pub tier: PostTier,
    pub tier_expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller_name: String,
    pub seller_avatar_url: Option<String>,
    pub category_slug: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostImage {
    /// Blob name, used when editing the listing
    pub name: String,
    /// Time-limited read URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub location: Option<String>,
    pub images: Vec<PostImage>,
    pub status: PostStatus,
    /// Tier in effect right now (expired paid tiers read as `free`)
    pub tier: PostTier,
    pub tier_expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
    pub seller: SellerSummary,
    pub category: Option<CategorySummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 3, max = 150, message = "Title must be 3 to 150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1 to 5000 characters"))]
    pub description: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 150, message = "Location is too long"))]
    pub location: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 images per listing"))]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 3, max = 150, message = "Title must be 3 to 150 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1 to 5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 150, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(length(max = 10, message = "At most 10 images per listing"))]
    pub images: Option<Vec<String>>,
    pub status: Option<PostStatus>,
}

/// Listing search filters (`GET /posts`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    /// Category slug
    pub category: Option<String>,
    /// Case-insensitive text match on title and description
    pub q: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub location: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: Option<PostStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_slug: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub location: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: Option<PostStatus>,
}

impl From<&PostListQuery> for PostFilter {
    fn from(query: &PostListQuery) -> Self {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        Self {
            category_slug: non_blank(&query.category),
            search: non_blank(&query.q),
            min_price: query.min_price,
            max_price: query.max_price,
            location: non_blank(&query.location),
            user_id: query.user_id,
            status: Some(query.status.unwrap_or(PostStatus::Active)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

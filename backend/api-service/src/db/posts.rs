/// Listing database operations
use crate::error::Result;
use crate::models::{Pagination, Post, PostFilter, PostStatus, PostTier};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const POST_COLUMNS: &str = r#"
    p.*,
    u.name AS seller_name,
    u.avatar_url AS seller_avatar_url,
    c.slug AS category_slug,
    c.name AS category_name
"#;

const POST_JOINS: &str = r#"
    JOIN users u ON u.id = p.user_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Active paid tier first (premium > standard > free), then newest
const TIER_ORDER: &str = r#"
    CASE WHEN p.tier_expires_at > NOW() THEN
        CASE p.tier WHEN 'premium' THEN 2 WHEN 'standard' THEN 1 ELSE 0 END
    ELSE 0 END DESC,
    p.created_at DESC
"#;

#[derive(Debug)]
pub struct NewPost<'a> {
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: &'a str,
    pub description: &'a str,
    pub price: i64,
    pub currency: &'a str,
    pub location: Option<&'a str>,
    pub images: &'a [String],
}

#[derive(Debug, Default)]
pub struct UpdatePostFields {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub location: Option<String>,
    pub images: Option<Vec<String>>,
    pub status: Option<PostStatus>,
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a PostFilter) {
    qb.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(slug) = &filter.category_slug {
        qb.push(" AND c.slug = ").push_bind(slug.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(location) = &filter.location {
        qb.push(" AND p.location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND p.user_id = ").push_bind(user_id);
    }
}

/// Filtered, tier-ordered page of listings and the total match count
pub async fn list(
    pool: &PgPool,
    filter: &PostFilter,
    pagination: Pagination,
) -> Result<(Vec<Post>, i64)> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
    count_qb.push(POST_JOINS);
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT");
    qb.push(POST_COLUMNS).push(" FROM posts p").push(POST_JOINS);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY ")
        .push(TIER_ORDER)
        .push(" LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let posts = qb.build_query_as::<Post>().fetch_all(pool).await?;

    Ok((posts, total))
}

pub async fn find_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p {POST_JOINS} WHERE p.id = $1");
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(post)
}

pub async fn exists(pool: &PgPool, post_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
        .bind(post_id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Posts liked by `user_id`, most recently liked first
pub async fn list_liked_by(
    pool: &PgPool,
    user_id: Uuid,
    pagination: Pagination,
) -> Result<(Vec<Post>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let sql = format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM likes l
        JOIN posts p ON p.id = l.post_id
        {POST_JOINS}
        WHERE l.user_id = $1
        ORDER BY l.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    );
    let posts = sqlx::query_as::<_, Post>(&sql)
        .bind(user_id)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

    Ok((posts, total))
}

pub async fn create(pool: &PgPool, new_post: NewPost<'_>) -> Result<Post> {
    let sql = format!(
        r#"
        WITH p AS (
            INSERT INTO posts (user_id, category_id, title, description, price, currency, location, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
        )
        SELECT {POST_COLUMNS} FROM p {POST_JOINS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(new_post.user_id)
        .bind(new_post.category_id)
        .bind(new_post.title)
        .bind(new_post.description)
        .bind(new_post.price)
        .bind(new_post.currency)
        .bind(new_post.location)
        .bind(new_post.images)
        .fetch_one(pool)
        .await?;

    Ok(post)
}

/// Partial update; `None` leaves the column unchanged
pub async fn update(pool: &PgPool, post_id: Uuid, fields: UpdatePostFields) -> Result<Post> {
    let sql = format!(
        r#"
        WITH p AS (
            UPDATE posts
            SET category_id = COALESCE($2, category_id),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                location = COALESCE($6, location),
                images = COALESCE($7, images),
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
        )
        SELECT {POST_COLUMNS} FROM p {POST_JOINS}
        "#
    );
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(post_id)
        .bind(fields.category_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.price)
        .bind(fields.location)
        .bind(fields.images)
        .bind(fields.status)
        .fetch_one(pool)
        .await?;

    Ok(post)
}

pub async fn delete(pool: &PgPool, post_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn increment_views(pool: &PgPool, post_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Lock the post row and read its current tier for a promotion
pub async fn lock_tier(
    conn: &mut PgConnection,
    post_id: Uuid,
) -> Result<Option<(PostTier, Option<DateTime<Utc>>)>> {
    let row: Option<(PostTier, Option<DateTime<Utc>>)> = sqlx::query_as(
        "SELECT tier, tier_expires_at FROM posts WHERE id = $1 FOR UPDATE",
    )
    .bind(post_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Lock the post row and read its status before a purchase is applied
pub async fn lock_status(conn: &mut PgConnection, post_id: Uuid) -> Result<Option<PostStatus>> {
    let status: Option<PostStatus> =
        sqlx::query_scalar("SELECT status FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(status)
}

pub async fn set_tier(
    conn: &mut PgConnection,
    post_id: Uuid,
    tier: PostTier,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE posts SET tier = $2, tier_expires_at = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(post_id)
    .bind(tier)
    .bind(expires_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn mark_sold(conn: &mut PgConnection, post_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE posts SET status = 'sold', updated_at = NOW() WHERE id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("iphone"), "%iphone%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}

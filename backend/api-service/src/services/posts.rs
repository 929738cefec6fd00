/// Listing service - search, CRUD, likes and image URL resolution
use crate::db::posts::{self, NewPost, UpdatePostFields};
use crate::db::LikeRepository;
use crate::error::{AppError, Result};
use crate::models::{
    effective_tier, CategorySummary, CreatePostRequest, LikeResponse, Page, Pagination, Post,
    PostFilter, PostImage, PostResponse, SellerSummary, UpdatePostRequest, MAX_IMAGES_PER_POST,
};
use crate::storage::BlobStore;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_CURRENCY: &str = "XAF";

/// Image names must be blobs this user uploaded (`{user_id}/...`)
pub fn validate_image_names(user_id: Uuid, images: &[String]) -> Result<()> {
    if images.len() > MAX_IMAGES_PER_POST {
        return Err(AppError::Validation(format!(
            "At most {MAX_IMAGES_PER_POST} images per listing"
        )));
    }

    let prefix = format!("{user_id}/");
    for name in images {
        let suffix = name.strip_prefix(&prefix).unwrap_or_default();
        if suffix.is_empty() || suffix.contains("..") || suffix.contains('/') {
            return Err(AppError::Validation(format!("Invalid image reference: {name}")));
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct PostService {
    pool: PgPool,
    likes: LikeRepository,
    store: Arc<dyn BlobStore>,
    sas_ttl: Duration,
}

impl PostService {
    pub fn new(pool: PgPool, store: Arc<dyn BlobStore>, sas_ttl_secs: i64) -> Self {
        Self {
            likes: LikeRepository::new(pool.clone()),
            pool,
            store,
            sas_ttl: Duration::seconds(sas_ttl_secs),
        }
    }

    fn to_response(&self, post: Post, liked_by_me: Option<bool>) -> Result<PostResponse> {
        let now = Utc::now();
        let expires_at = now + self.sas_ttl;

        let images = post
            .images
            .iter()
            .map(|name| -> Result<PostImage> {
                Ok(PostImage {
                    url: self.store.read_url(name, expires_at)?,
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let category = match (post.category_id, post.category_slug, post.category_name) {
            (Some(id), Some(slug), Some(name)) => Some(CategorySummary { id, slug, name }),
            _ => None,
        };

        Ok(PostResponse {
            id: post.id,
            title: post.title,
            description: post.description,
            price: post.price,
            currency: post.currency,
            location: post.location,
            images,
            status: post.status,
            tier: effective_tier(post.tier, post.tier_expires_at, now),
            tier_expires_at: post.tier_expires_at.filter(|at| *at > now),
            view_count: post.view_count,
            like_count: post.like_count,
            liked_by_me,
            seller: SellerSummary {
                id: post.user_id,
                name: post.seller_name,
                avatar_url: post.seller_avatar_url,
            },
            category,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    async fn to_page(
        &self,
        posts: Vec<Post>,
        total: i64,
        pagination: Pagination,
        viewer: Option<Uuid>,
    ) -> Result<Page<PostResponse>> {
        let liked: Option<HashSet<Uuid>> = match viewer {
            Some(user_id) => {
                let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
                Some(self.likes.liked_among(user_id, &ids).await?)
            }
            None => None,
        };

        let items = posts
            .into_iter()
            .map(|post| {
                let liked_by_me = liked.as_ref().map(|set| set.contains(&post.id));
                self.to_response(post, liked_by_me)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, total, pagination))
    }

    async fn load(&self, post_id: Uuid) -> Result<Post> {
        posts::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn load_owned(&self, user_id: Uuid, post_id: Uuid) -> Result<Post> {
        let post = self.load(post_id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the owner can modify this post".to_string(),
            ));
        }
        Ok(post)
    }

    pub async fn list(
        &self,
        filter: &PostFilter,
        pagination: Pagination,
        viewer: Option<Uuid>,
    ) -> Result<Page<PostResponse>> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(AppError::Validation(
                    "min_price cannot exceed max_price".to_string(),
                ));
            }
        }

        let (rows, total) = posts::list(&self.pool, filter, pagination).await?;
        self.to_page(rows, total, pagination, viewer).await
    }

    pub async fn liked(&self, user_id: Uuid, pagination: Pagination) -> Result<Page<PostResponse>> {
        let (rows, total) = posts::list_liked_by(&self.pool, user_id, pagination).await?;
        let items = rows
            .into_iter()
            .map(|post| self.to_response(post, Some(true)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total, pagination))
    }

    /// Fetch a listing and count the view
    pub async fn get(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<PostResponse> {
        posts::increment_views(&self.pool, post_id).await?;
        let post = self.load(post_id).await?;

        let liked_by_me = match viewer {
            Some(user_id) => Some(self.likes.has_liked(user_id, post_id).await?),
            None => None,
        };

        self.to_response(post, liked_by_me)
    }

    pub async fn create(&self, user_id: Uuid, req: &CreatePostRequest) -> Result<PostResponse> {
        validate_image_names(user_id, &req.images)?;

        let currency = req
            .currency
            .as_deref()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let location = req.location.as_deref().map(str::trim).filter(|l| !l.is_empty());

        let post = posts::create(
            &self.pool,
            NewPost {
                user_id,
                category_id: req.category_id,
                title: req.title.trim(),
                description: req.description.trim(),
                price: req.price,
                currency: &currency,
                location,
                images: &req.images,
            },
        )
        .await?;

        tracing::info!(post_id = %post.id, user_id = %user_id, "Post created");
        self.to_response(post, Some(false))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<PostResponse> {
        let existing = self.load_owned(user_id, post_id).await?;

        if let Some(images) = &req.images {
            validate_image_names(user_id, images)?;
        }
        let dropped = req
            .images
            .as_deref()
            .map(|images| removed_images(&existing.images, images))
            .unwrap_or_default();

        let post = posts::update(
            &self.pool,
            post_id,
            UpdatePostFields {
                category_id: req.category_id,
                title: req.title.map(|t| t.trim().to_string()),
                description: req.description.map(|d| d.trim().to_string()),
                price: req.price,
                location: req.location.map(|l| l.trim().to_string()),
                images: req.images,
                status: req.status,
            },
        )
        .await?;

        self.delete_blobs(&dropped).await;

        let liked_by_me = self.likes.has_liked(user_id, post_id).await?;
        self.to_response(post, Some(liked_by_me))
    }

    /// Delete a listing, then its images (best effort)
    pub async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = self.load_owned(user_id, post_id).await?;
        posts::delete(&self.pool, post_id).await?;
        tracing::info!(post_id = %post_id, user_id = %user_id, "Post deleted");

        self.delete_blobs(&post.images).await;
        Ok(())
    }

    /// Best effort; failures are only logged
    async fn delete_blobs(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.store.delete(name).await {
                tracing::warn!(blob = %name, error = %e, "Failed to delete listing image");
            }
        }
    }

    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeResponse> {
        if !posts::exists(&self.pool, post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        let like_count = self.likes.like(user_id, post_id).await?;
        Ok(LikeResponse {
            liked: true,
            like_count,
        })
    }

    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeResponse> {
        if !posts::exists(&self.pool, post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        let like_count = self.likes.unlike(user_id, post_id).await?;
        Ok(LikeResponse {
            liked: false,
            like_count,
        })
    }
}

/// Names in `before` that are no longer in `after`
pub fn removed_images(before: &[String], after: &[String]) -> Vec<String> {
    before
        .iter()
        .filter(|name| !after.contains(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_images() {
        let before = vec!["u/a.jpg".to_string(), "u/b.jpg".to_string(), "u/c.png".to_string()];
        let after = vec!["u/c.png".to_string(), "u/d.webp".to_string()];

        assert_eq!(removed_images(&before, &after), vec!["u/a.jpg", "u/b.jpg"]);
        assert!(removed_images(&before, &before).is_empty());
        assert!(removed_images(&[], &after).is_empty());
    }

    #[test]
    fn test_image_names_must_belong_to_uploader() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(validate_image_names(user, &[format!("{user}/a.jpg")]).is_ok());
        assert!(validate_image_names(user, &[format!("{other}/a.jpg")]).is_err());
        assert!(validate_image_names(user, &[format!("{user}/")]).is_err());
        assert!(validate_image_names(user, &[format!("{user}/../x.jpg")]).is_err());
        assert!(validate_image_names(user, &[format!("{user}/nested/x.jpg")]).is_err());
    }

    #[test]
    fn test_image_limit() {
        let user = Uuid::new_v4();
        let images: Vec<String> = (0..11).map(|i| format!("{user}/{i}.png")).collect();
        assert!(validate_image_names(user, &images).is_err());
        assert!(validate_image_names(user, &images[..10]).is_ok());
    }
}

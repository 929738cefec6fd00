use crate::cache::PostCache;
use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{
    CreatePostRequest, LikeResponse, Page, PageQuery, Post, PostQuery, UpdatePostRequest,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct PostsApi {
    http: Arc<HttpClient>,
    cache: Arc<PostCache>,
}

impl PostsApi {
    pub(crate) fn new(http: Arc<HttpClient>, cache: Arc<PostCache>) -> Self {
        Self { http, cache }
    }

    /// Search listings; paid tiers first, then newest
    pub async fn list(&self, query: &PostQuery) -> Result<Page<Post>> {
        self.http
            .execute(RequestSpec::get("/posts").query(query)?)
            .await
    }

    /// Cached read; falls back to [`fetch`](Self::fetch) on miss
    pub async fn get(&self, id: Uuid) -> Result<Post> {
        if let Some(post) = self.cache.get(&id) {
            tracing::debug!(post_id = %id, "Post cache hit");
            return Ok(post);
        }
        self.fetch(id).await
    }

    /// Read from the server (counts a view) and refresh the cache
    pub async fn fetch(&self, id: Uuid) -> Result<Post> {
        let post: Post = self.http.execute(RequestSpec::get(format!("/posts/{id}"))).await?;
        self.cache.insert(post.clone());
        Ok(post)
    }

    pub async fn create(&self, request: &CreatePostRequest) -> Result<Post> {
        let post: Post = self
            .http
            .execute(RequestSpec::post("/posts").json(request)?)
            .await?;
        self.cache.insert(post.clone());
        Ok(post)
    }

    pub async fn update(&self, id: Uuid, request: &UpdatePostRequest) -> Result<Post> {
        let outcome = self
            .http
            .execute::<Post>(RequestSpec::patch(format!("/posts/{id}")).json(request)?)
            .await;
        match outcome {
            Ok(post) => {
                self.cache.insert(post.clone());
                Ok(post)
            }
            Err(e) => {
                self.cache.invalidate(&id);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.http
            .execute::<serde_json::Value>(RequestSpec::delete(format!("/posts/{id}")))
            .await?;
        self.cache.invalidate(&id);
        Ok(())
    }

    pub async fn like(&self, id: Uuid) -> Result<LikeResponse> {
        let like: LikeResponse = self
            .http
            .execute(RequestSpec::post(format!("/posts/{id}/like")))
            .await?;
        self.cache.set_like(&id, like.liked, like.like_count);
        Ok(like)
    }

    pub async fn unlike(&self, id: Uuid) -> Result<LikeResponse> {
        let like: LikeResponse = self
            .http
            .execute(RequestSpec::delete(format!("/posts/{id}/like")))
            .await?;
        self.cache.set_like(&id, like.liked, like.like_count);
        Ok(like)
    }

    /// Listings the signed-in user liked, most recent like first
    pub async fn liked(&self, page: PageQuery) -> Result<Page<Post>> {
        self.http
            .execute(RequestSpec::get("/posts/liked").query(&page)?)
            .await
    }

    /// Flip the like state optimistically
    ///
    /// The cached post shows the new state immediately. The server's count
    /// replaces it on success; the previous state is restored on failure.
    pub async fn toggle_like(&self, id: Uuid) -> Result<LikeResponse> {
        let current = match self.cache.like_state(&id) {
            Some(state) => state.liked,
            None => self.get(id).await?.liked_by_me.unwrap_or(false),
        };
        let liked = !current;
        let snapshot = self.cache.apply_like(&id, liked);

        let request = if liked {
            RequestSpec::post(format!("/posts/{id}/like"))
        } else {
            RequestSpec::delete(format!("/posts/{id}/like"))
        };

        match self.http.execute::<LikeResponse>(request).await {
            Ok(like) => {
                self.cache.set_like(&id, like.liked, like.like_count);
                Ok(like)
            }
            Err(e) => {
                if let Some(before) = snapshot {
                    tracing::debug!(post_id = %id, error = %e, "Like failed; rolling back");
                    self.cache.set_like(&id, before.liked, before.like_count);
                }
                Err(e)
            }
        }
    }
}

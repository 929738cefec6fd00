use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{Page, PageQuery, Post, UpdateProfileRequest, UserProfile};
use std::sync::Arc;
use uuid::Uuid;

pub struct UsersApi {
    http: Arc<HttpClient>,
}

impl UsersApi {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Public profile; email and phone only when `id` is the signed-in user
    pub async fn get(&self, id: Uuid) -> Result<UserProfile> {
        self.http.execute(RequestSpec::get(format!("/users/{id}"))).await
    }

    pub async fn update_me(&self, request: &UpdateProfileRequest) -> Result<UserProfile> {
        self.http
            .execute(RequestSpec::patch("/users/me").json(request)?)
            .await
    }

    pub async fn posts(&self, id: Uuid, page: PageQuery) -> Result<Page<Post>> {
        self.http
            .execute(RequestSpec::get(format!("/users/{id}/posts")).query(&page)?)
            .await
    }
}

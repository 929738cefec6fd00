use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use std::sync::Arc;
use uuid::Uuid;

pub struct CategoriesApi {
    http: Arc<HttpClient>,
}

impl CategoriesApi {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        self.http.execute(RequestSpec::get("/categories")).await
    }

    pub async fn get(&self, slug: &str) -> Result<Category> {
        self.http
            .execute(RequestSpec::get(format!("/categories/{slug}")))
            .await
    }

    // Admin only below

    pub async fn create(&self, request: &CreateCategoryRequest) -> Result<Category> {
        self.http
            .execute(RequestSpec::post("/categories").json(request)?)
            .await
    }

    pub async fn update(&self, id: Uuid, request: &UpdateCategoryRequest) -> Result<Category> {
        self.http
            .execute(RequestSpec::patch(format!("/categories/{id}")).json(request)?)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.http
            .execute::<serde_json::Value>(RequestSpec::delete(format!("/categories/{id}")))
            .await?;
        Ok(())
    }
}

use crate::db::categories;
use crate::error::{AppError, Result};
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use deunicode::deunicode;
use sqlx::PgPool;
use uuid::Uuid;

/// Lower-case ASCII words joined by single hyphens ("Home & Garden" -> "home-garden")
///
/// Accented letters are transliterated first ("Téléphones" -> "telephones").
pub fn slugify(input: &str) -> String {
    let ascii = deunicode(input);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn duplicate_slug(err: AppError, slug: &str) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Conflict(format!("Category slug '{slug}' already exists")),
        other => other,
    }
}

#[derive(Clone)]
pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        categories::list(&self.pool).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Category> {
        categories::find_by_slug(&self.pool, slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    pub async fn create(&self, req: &CreateCategoryRequest) -> Result<Category> {
        let slug = slugify(req.slug.as_deref().unwrap_or(&req.name));
        if slug.is_empty() {
            return Err(AppError::Validation(
                "Category name must contain letters or digits".to_string(),
            ));
        }

        let category = categories::create(
            &self.pool,
            req.name.trim(),
            &slug,
            req.description.as_deref(),
        )
        .await
        .map_err(|e| duplicate_slug(e, &slug))?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, req: &UpdateCategoryRequest) -> Result<Category> {
        let slug = req.slug.as_deref().map(slugify);
        if slug.as_deref() == Some("") {
            return Err(AppError::Validation(
                "Slug must contain letters or digits".to_string(),
            ));
        }

        categories::update(
            &self.pool,
            id,
            req.name.as_deref().map(str::trim),
            slug.as_deref(),
            req.description.as_deref(),
        )
        .await
        .map_err(|e| duplicate_slug(e, slug.as_deref().unwrap_or_default()))?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    /// Listings in the category keep existing without one
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !categories::delete(&self.pool, id).await? {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

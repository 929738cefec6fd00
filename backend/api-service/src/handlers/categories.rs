/// Category handlers; writes are admin-only
use crate::error::{AppError, Result};
use crate::models::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::services::CategoryService;
use actix_middleware::AuthUser;
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use uuid::Uuid;
use validator::Validate;

fn require_admin(user: &AuthUser) -> Result<()> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Administrator role required".to_string()));
    }
    Ok(())
}

pub async fn list_categories(categories: web::Data<CategoryService>) -> Result<HttpResponse> {
    let items = categories.list().await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(items)))
}

pub async fn get_category(
    categories: web::Data<CategoryService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let category = categories.get_by_slug(&path).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(category)))
}

pub async fn create_category(
    categories: web::Data<CategoryService>,
    user: AuthUser,
    req: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    require_admin(&user)?;
    req.validate()?;
    let category = categories.create(&req).await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(category)))
}

pub async fn update_category(
    categories: web::Data<CategoryService>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    require_admin(&user)?;
    req.validate()?;
    let category = categories.update(path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(category)))
}

pub async fn delete_category(
    categories: web::Data<CategoryService>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    require_admin(&user)?;
    let id = path.into_inner();
    categories.delete(id).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(serde_json::json!({
        "id": id,
        "deleted": true
    }))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(
                web::resource("")
                    .route(web::get().to(list_categories))
                    .route(web::post().to(create_category)),
            )
            .service(
                web::resource("/{key}")
                    .route(web::get().to(get_category))
                    .route(web::patch().to(update_category))
                    .route(web::delete().to(delete_category)),
            ),
    );
}

/// User profile handlers
use crate::error::Result;
use super::posts::check_archived_access;
use crate::models::{Pagination, PostFilter, PostListQuery, UpdateProfileRequest};
use crate::services::{PostService, UserService};
use actix_middleware::{AuthUser, UserId};
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use uuid::Uuid;
use validator::Validate;

pub async fn get_user(
    users: web::Data<UserService>,
    path: web::Path<Uuid>,
    viewer: Option<AuthUser>,
) -> Result<HttpResponse> {
    let profile = users
        .get_profile(path.into_inner(), viewer.map(|u| u.user_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(profile)))
}

pub async fn update_me(
    users: web::Data<UserService>,
    user_id: UserId,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let profile = users.update_me(user_id.0, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(profile)))
}

/// Listings of one seller; `?status=archived` is for the seller only
pub async fn get_user_posts(
    posts: web::Data<PostService>,
    path: web::Path<Uuid>,
    query: web::Query<PostListQuery>,
    viewer: Option<AuthUser>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let mut filter = PostFilter::from(&*query);
    filter.user_id = Some(user_id);

    let viewer_id = viewer.map(|u| u.user_id);
    check_archived_access(&filter, viewer_id)?;

    let page = posts
        .list(&filter, Pagination::new(query.page, query.limit), viewer_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(page)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::patch().to(update_me))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}/posts", web::get().to(get_user_posts)),
    );
}

/// Listing handlers - browse, CRUD and likes
use crate::error::{AppError, Result};
use crate::models::{
    CreatePostRequest, PageQuery, Pagination, PostFilter, PostListQuery, PostStatus,
    UpdatePostRequest,
};
use crate::services::PostService;
use actix_middleware::{AuthUser, UserId};
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use uuid::Uuid;
use validator::Validate;

/// Archived listings are listed only for their own seller
pub fn check_archived_access(filter: &PostFilter, viewer: Option<Uuid>) -> Result<()> {
    if filter.status == Some(PostStatus::Archived)
        && (viewer.is_none() || filter.user_id != viewer)
    {
        return Err(AppError::Forbidden(
            "Archived listings are only visible to their seller".to_string(),
        ));
    }
    Ok(())
}

pub async fn list_posts(
    posts: web::Data<PostService>,
    query: web::Query<PostListQuery>,
    viewer: Option<AuthUser>,
) -> Result<HttpResponse> {
    let filter = PostFilter::from(&*query);
    let viewer_id = viewer.map(|u| u.user_id);
    check_archived_access(&filter, viewer_id)?;

    let page = posts
        .list(&filter, Pagination::new(query.page, query.limit), viewer_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(page)))
}

pub async fn create_post(
    posts: web::Data<PostService>,
    user_id: UserId,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post = posts.create(user_id.0, &req).await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(post)))
}

/// The caller's favorites, most recently liked first
pub async fn liked_posts(
    posts: web::Data<PostService>,
    user_id: UserId,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = posts.liked(user_id.0, Pagination::from(*query)).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(page)))
}

pub async fn get_post(
    posts: web::Data<PostService>,
    path: web::Path<Uuid>,
    viewer: Option<AuthUser>,
) -> Result<HttpResponse> {
    let post = posts
        .get(path.into_inner(), viewer.map(|u| u.user_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(post)))
}

pub async fn update_post(
    posts: web::Data<PostService>,
    user_id: UserId,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post = posts
        .update(user_id.0, path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(post)))
}

pub async fn delete_post(
    posts: web::Data<PostService>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    posts.delete(user_id.0, post_id).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(serde_json::json!({
        "id": post_id,
        "deleted": true
    }))))
}

pub async fn like_post(
    posts: web::Data<PostService>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let like = posts.like(user_id.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(like)))
}

pub async fn unlike_post(
    posts: web::Data<PostService>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let like = posts.unlike(user_id.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(like)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .service(
                web::resource("")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            // before `/{id}` so "liked" is not parsed as an id
            .route("/liked", web::get().to(liked_posts))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_post))
                    .route(web::patch().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(
                web::resource("/{id}/like")
                    .route(web::post().to(like_post))
                    .route(web::delete().to(unlike_post)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archived_listings_need_their_seller() {
        let seller = Uuid::new_v4();
        let mut filter = PostFilter {
            status: Some(PostStatus::Archived),
            user_id: Some(seller),
            ..Default::default()
        };

        assert!(check_archived_access(&filter, Some(seller)).is_ok());
        assert!(check_archived_access(&filter, Some(Uuid::new_v4())).is_err());
        assert!(check_archived_access(&filter, None).is_err());

        filter.status = Some(PostStatus::Sold);
        assert!(check_archived_access(&filter, None).is_ok());
    }
}

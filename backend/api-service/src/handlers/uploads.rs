/// Image upload handlers
use crate::error::{AppError, Result};
use crate::services::UploadService;
use actix_middleware::UserId;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use futures_util::stream::StreamExt;

/// Read one part into memory, failing as soon as it exceeds `max_bytes`
async fn read_field(field: &mut Field, max_bytes: usize) -> Result<web::Bytes> {
    let mut buf = web::BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds the {max_bytes} byte limit"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// `multipart/form-data` with one or more `file` parts
pub async fn upload_images(
    uploads: web::Data<UploadService>,
    user_id: UserId,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut files = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?;
        if field.name() != Some("file") {
            // drain unrelated parts
            while field.next().await.is_some() {}
            continue;
        }

        if files.len() == uploads.max_files() {
            return Err(AppError::Validation(format!(
                "At most {} files per upload",
                uploads.max_files()
            )));
        }

        let declared = field.content_type().map(|m| m.essence_str().to_string());
        let bytes = read_field(&mut field, uploads.max_bytes()).await?;
        files.push((declared, bytes));
    }

    if files.is_empty() {
        return Err(AppError::Validation(
            "Expected at least one 'file' part".to_string(),
        ));
    }

    let mut uploaded = Vec::with_capacity(files.len());
    for (declared, bytes) in files {
        match uploads.upload(user_id.0, declared.as_deref(), bytes).await {
            Ok(image) => uploaded.push(image),
            Err(err) => {
                for image in &uploaded {
                    if let Err(e) = uploads.delete(user_id.0, &image.name).await {
                        tracing::warn!(blob = %image.name, error = %e, "Rollback of batch upload failed");
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(HttpResponse::Created().json(ApiEnvelope::ok(uploaded)))
}

/// Fresh read URL for a stored image
pub async fn signed_url(
    uploads: web::Data<UploadService>,
    _user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let url = uploads.signed_url(&path)?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(url)))
}

pub async fn delete_image(
    uploads: web::Data<UploadService>,
    user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    uploads.delete(user_id.0, &name).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(serde_json::json!({
        "name": name,
        "deleted": true
    }))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/upload")
            .route("", web::post().to(upload_images))
            .route("/url/{blob:.*}", web::get().to(signed_url))
            .route("/{blob:.*}", web::delete().to(delete_image)),
    );
}

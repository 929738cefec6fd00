use crate::db::users::{self, UpdateUserFields};
use crate::error::{AppError, Result};
use crate::models::{UpdateProfileRequest, UserProfile};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: Uuid, viewer: Option<Uuid>) -> Result<UserProfile> {
        let user = users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.profile_for(viewer))
    }

    pub async fn update_me(&self, user_id: Uuid, req: UpdateProfileRequest) -> Result<UserProfile> {
        let trimmed = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let user = users::update_profile(
            &self.pool,
            user_id,
            UpdateUserFields {
                name: trimmed(req.name),
                phone: trimmed(req.phone),
                avatar_url: trimmed(req.avatar_url),
            },
        )
        .await?;

        Ok(user.profile_for(Some(user_id)))
    }
}

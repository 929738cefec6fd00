/// Shared application state: every service, built once and cloned per worker
use crate::config::Config;
use crate::error::AppError;
use crate::handlers::HealthState;
use crate::services::{
    AuthService, CategoryService, MessageService, OAuthClient, PaymentService, PostService,
    UploadService, UserService,
};
use crate::storage::BlobStore;
use actix_web::web;
use crypto_core::{JwtError, JwtManager};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtManager>,
    pub auth: web::Data<AuthService>,
    pub users: web::Data<UserService>,
    pub posts: web::Data<PostService>,
    pub messages: web::Data<MessageService>,
    pub payments: web::Data<PaymentService>,
    pub categories: web::Data<CategoryService>,
    pub uploads: web::Data<UploadService>,
    pub health: web::Data<HealthState>,
}

impl AppState {
    pub fn new(
        config: &Config,
        pool: PgPool,
        store: Arc<dyn BlobStore>,
        http: reqwest::Client,
    ) -> Result<Self, JwtError> {
        let jwt = Arc::new(JwtManager::new(config.jwt.clone())?);
        let sas_ttl = config.storage.sas_ttl_secs;
        let oauth = OAuthClient::new(http, config.oauth.clone());

        Ok(Self {
            auth: web::Data::new(AuthService::new(pool.clone(), jwt.clone(), oauth)),
            users: web::Data::new(UserService::new(pool.clone())),
            posts: web::Data::new(PostService::new(pool.clone(), store.clone(), sas_ttl)),
            messages: web::Data::new(MessageService::new(pool.clone())),
            payments: web::Data::new(PaymentService::new(
                pool.clone(),
                config.payments.clone(),
            )),
            categories: web::Data::new(CategoryService::new(pool.clone())),
            uploads: web::Data::new(UploadService::new(
                store.clone(),
                config.upload.clone(),
                sas_ttl,
            )),
            health: web::Data::new(HealthState::new(pool, store)),
            jwt,
        })
    }

    /// Register every service as app data, plus extractor configs that
    /// render malformed bodies, queries and paths as envelope errors
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(format!("Invalid JSON body: {err}")).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            AppError::Validation(format!("Invalid query string: {err}")).into()
        }))
        .app_data(web::PathConfig::default().error_handler(|err, _req| {
            AppError::NotFound(format!("Invalid path parameter: {err}")).into()
        }))
        .app_data(self.auth.clone())
        .app_data(self.users.clone())
        .app_data(self.posts.clone())
        .app_data(self.messages.clone())
        .app_data(self.payments.clone())
        .app_data(self.categories.clone())
        .app_data(self.uploads.clone())
        .app_data(self.health.clone());
    }
}

use actix_cors::Cors;
use actix_middleware::{CorrelationIdMiddleware, JwtAuthMiddleware, MetricsMiddleware};
use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::Context;
use api_service::config::{json_logs_from_env, Config};
use api_service::jobs::start_payment_expiry;
use api_service::routes::configure_routes;
use api_service::storage::{AzureBlobStore, BlobStore};
use api_service::{db, AppState};
use db_pool::{create_pool, DbConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable ({e}); waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// `api-service healthcheck` for container probes
async fn run_healthcheck() -> anyhow::Result<()> {
    let port = std::env::var("API_PORT").unwrap_or_else(|_| "8080".to_string());
    let url = format!("http://127.0.0.1:{port}/api/v1/health");
    let resp = reqwest::Client::new().get(&url).send().await?;
    anyhow::ensure!(resp.status().is_success(), "healthcheck HTTP status: {}", resp.status());
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        return run_healthcheck().await;
    }

    dotenvy::dotenv().ok();
    init_tracing(json_logs_from_env());

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting api-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_cfg = DbConfig::from_env("api-service").map_err(anyhow::Error::msg)?;
    db_cfg.log_config();
    let pool = create_pool(db_cfg)
        .await
        .context("Failed to create database pool")?;

    db::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let http = reqwest::Client::builder()
        .timeout(HTTP_CLIENT_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let store: Arc<dyn BlobStore> =
        Arc::new(AzureBlobStore::new(http.clone(), config.storage.clone()));
    let state = AppState::new(&config, pool, store, http)
        .context("Failed to initialize JWT manager")?;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("HTTP server listening on {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let http_state = state.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .configure(|cfg| http_state.configure(cfg))
            .wrap(JwtAuthMiddleware::new(http_state.jwt.clone()))
            .wrap(MetricsMiddleware)
            .wrap(CorrelationIdMiddleware)
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(configure_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run();

    let server_handle = server.handle();
    let mut tasks: JoinSet<std::io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    let payments = state.payments.get_ref().clone();
    tasks.spawn(async move {
        start_payment_expiry(payments).await;
        Ok(())
    });

    let mut first_error: Option<std::io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error.get_or_insert(e);
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        first_error.get_or_insert(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            e.to_string(),
                        ));
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("api-service shutting down");

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

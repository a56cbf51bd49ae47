use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use panelcraft_pipeline::{GenerationSettings, OcrService, PageGenerator, PgStoryStore};
use panelcraft_providers::{GoogleVisionClient, S3ImageStore, TogetherClient};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panelcraft_api::app::build_app;
use panelcraft_api::config::ServerConfig;
use panelcraft_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "panelcraft_api=debug,panelcraft_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = panelcraft_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    panelcraft_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    panelcraft_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Providers ---
    let providers = &config.providers;
    if providers.together_api_key.is_none() {
        tracing::warn!("TOGETHER_API_KEY not set; only requests with x-api-key can generate");
    }
    let together = Arc::new(TogetherClient::new(
        providers.together_api_url.clone(),
        providers.together_api_key.clone(),
    ));
    let storage = Arc::new(
        S3ImageStore::from_env(
            providers.s3_bucket.clone(),
            providers.s3_region.clone(),
            providers.s3_public_base_url.clone(),
        )
        .await,
    );
    if providers.google_vision_api_key.is_none() {
        tracing::warn!("GOOGLE_VISION_API_KEY not set; OCR requests will fail");
    }
    let vision = Arc::new(GoogleVisionClient::new(
        panelcraft_providers::vision::DEFAULT_API_URL.to_string(),
        providers.google_vision_api_key.clone().unwrap_or_default(),
    ));
    tracing::info!(bucket = %providers.s3_bucket, "Provider clients created");

    // --- Services ---
    let store = Arc::new(PgStoryStore::new(pool.clone()));
    let generator = PageGenerator::new(
        store.clone(),
        together.clone(),
        together,
        storage,
        GenerationSettings {
            title_model: providers.title_model.clone(),
            free_tier_pages_per_week: config.free_tier_pages_per_week,
        },
    );
    let ocr = OcrService::new(store, vision);

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        generator: Arc::new(generator),
        ocr: Arc::new(ocr),
    };
    let app = build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown({
                let shutdown = Arc::clone(&shutdown);
                async move { shutdown.notified().await }
            })
            .into_future(),
    );

    shutdown_signal().await;
    shutdown.notify_one();

    // In-flight generations may take a while; bound how long we wait for them.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Shutdown drain timed out, dropping remaining connections"
        ),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storyshot_pipeline::clock::SystemClock;
use storyshot_pipeline::memory_store::InMemoryClipStore;
use storyshot_pipeline::ports::{ClipStore, PgClipStore};
use storyshot_pipeline::storage::FileSnapshotStorage;
use storyshot_pipeline::{Studio, StudioDeps};
use storyshot_providers::conversion::ConversionApi;
use storyshot_providers::render::RenderApi;
use storyshot_providers::tts::TtsApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyshot_api::config::ServerConfig;
use storyshot_api::router::build_app_router;
use storyshot_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "storyshot_api=debug,storyshot_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Clip store ---
    let (pool, store) = match &config.database_url {
        Some(database_url) => {
            let pool = storyshot_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            storyshot_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn ClipStore> = Arc::new(PgClipStore::new(pool.clone()));
            (Some(pool), store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, clips are kept in memory");
            let store: Arc<dyn ClipStore> = Arc::new(InMemoryClipStore::new());
            (None, store)
        }
    };

    // --- Providers ---
    let client = storyshot_providers::http::build_client(config.provider_timeout())
        .expect("Failed to build provider HTTP client");
    let tts = TtsApi::new(client.clone(), config.tts_url.clone());
    let conversion = ConversionApi::new(client.clone(), config.conversion_url.clone());
    let render = RenderApi::new(
        client,
        config.lipsync_url.clone(),
        config.image_to_video_url.clone(),
    );

    // --- Event bus ---
    let event_bus = Arc::new(storyshot_events::EventBus::default());
    let journal_handle = tokio::spawn(storyshot_events::EventJournal::run(
        event_bus.subscribe(),
    ));
    tracing::info!("Event journal started");

    // --- Studio ---
    let studio = Studio::open(
        StudioDeps {
            synthesizer: Arc::new(tts),
            converter: Arc::new(conversion),
            renderer: Arc::new(render),
            store,
            storage: Arc::new(FileSnapshotStorage::new(config.drafts_path.clone())),
            capture: None,
            bus: Arc::clone(&event_bus),
            clock: Arc::new(SystemClock),
        },
        config.studio_config(),
    )
    .await
    .expect("Failed to open draft store");
    tracing::info!(path = %config.drafts_path.display(), "Draft store opened");

    if let Err(e) = studio.refresh_clips().await {
        tracing::warn!(error = %e, "Initial clip refresh failed");
    }

    // --- App state ---
    let state = AppState {
        studio: Arc::clone(&studio),
        pool,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Cancel in-flight jobs and wait for their tasks to settle.
    studio.shutdown().await;

    // Dropping the last bus handle closes the channel and ends the journal.
    drop(studio);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), journal_handle).await;
    tracing::info!("Event journal stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
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

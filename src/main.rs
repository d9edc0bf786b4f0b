use axum::extract::DefaultBodyLimit;
use pdf_quiz_backend::{
    config::{get_config, init_config, LogFormat, StorageBackend},
    middleware::cors::api_cors,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let app_state = AppState::new(config)?;
    let restored = app_state.quiz_store.snapshot();
    if restored.is_active() {
        info!(
            questions = restored.len(),
            index = restored.current_index,
            score = restored.score,
            "resuming persisted quiz session"
        );
    }

    let mut app = routes::api_router(app_state, config.public_rps);

    if config.storage_backend == StorageBackend::Local {
        info!("Serving uploads from: {}", config.uploads_dir.display());
        app = app.nest_service("/uploads", ServeDir::new(&config.uploads_dir));
    }

    let app = app
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}

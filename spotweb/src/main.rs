use anyhow::Result;
use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware::map_response_with_state,
};
use clap::Parser;
use config::{EnvConfig, ListenConfig};
use state::{AppState, SharedState};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::filter::EnvFilter;

mod api;
mod config;
mod error;
mod state;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(short, long, help = "Path to the yaml configuration file")]
    pub config: Option<PathBuf>,
    #[arg(
        short,
        long,
        default_value = "prod",
        help = "Which environment from the configuration file to use"
    )]
    pub env: String,
}

const ALLOWED_HEADERS: [HeaderName; 9] = [
    HeaderName::from_static("x-csrf-token"),
    HeaderName::from_static("x-requested-with"),
    header::ACCEPT,
    HeaderName::from_static("accept-version"),
    header::CONTENT_LENGTH,
    HeaderName::from_static("content-md5"),
    header::CONTENT_TYPE,
    header::DATE,
    HeaderName::from_static("x-api-version"),
];

/// Allows requests from any origin. Every OPTIONS request is answered by this
/// layer with an empty 200 response.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers(ALLOWED_HEADERS)
}

/// Build the application router. When a static directory is configured, the
/// frontend files are served for every path that doesn't belong to the api,
/// with `index.html` as the fallback for unknown paths.
pub(crate) fn app(state: AppState) -> Router {
    let mut router = Router::new().merge(api::router());
    if let Some(dir) = &state.config.static_dir {
        debug!(?dir, "Serving static files");
        router = router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        );
    }
    router
        .with_state(state.clone())
        .layer(map_response_with_state(state, error::map_error_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("SPOTWEB_LOG")
                .from_env_lossy(),
        )
        .init();
    let args = Cli::parse();
    let config_file = args.config.unwrap_or_else(config::default_config_file);
    let env = EnvConfig::load_from_file(&config_file, &args.env).await?;
    debug!(?env, "Loaded configuration for environment '{}'", args.env);

    let shared_state = Arc::new(SharedState::new(env).await?);
    info!("Using database '{}'", shared_state.config.database);

    let ListenConfig { host, port } = &shared_state.config.listen;
    let listener = TcpListener::bind((host.as_str(), *port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(shared_state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    shared_state.db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => _ = sig.recv().await,
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
pub(crate) fn test_app(pool: sqlx::Pool<sqlx::Sqlite>) -> (Router, AppState) {
    let state = Arc::new(SharedState::test(pool));
    (app(state.clone()), state)
}

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use jarvis_engine::api;
use jarvis_engine::app_state::AppState;
use jarvis_engine::clock::system_clock;
use jarvis_engine::config::EngineConfig;
use jarvis_engine::runtime_env;
use jarvis_engine::search::BackendChain;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarvis_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Provider API keys usually live in a repo-root .env.
    runtime_env::load_env_file();
    match runtime_env::ensure_tls_cert_env() {
        Some(path) => tracing::info!(path = %path, "Configured SSL_CERT_FILE for TLS clients"),
        None => tracing::warn!(
            "No TLS cert bundle auto-detected; HTTPS search calls may fail in this environment"
        ),
    }

    let config = EngineConfig::from_env()?;
    tracing::info!(
        port = config.port,
        reports_dir = %config.reports_dir.display(),
        session_timeout_secs = config.sessions.timeout.as_secs(),
        "Starting Jarvis research engine"
    );

    let chain = BackendChain::from_env(&config.backends);
    if chain.ready_count() == 0 {
        tracing::warn!(
            backends = ?chain.names(),
            "No search backend is configured; research choices will fail until an API key is set"
        );
    }

    let app_state = AppState::bootstrap(&config, chain, system_clock())
        .await
        .context("Failed to spawn workflow registry")?;

    let app = api::router()
        .with_state(api::ApiState {
            app_state: app_state.clone(),
        })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)?),
        );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.shutdown().await;
    Ok(())
}

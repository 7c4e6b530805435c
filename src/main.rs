use anyhow::Context;
use medicly::api::{AppState, app_router};
use medicly::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let http = reqwest::Client::builder()
        .user_agent(concat!("medicly/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState::from_config(&config, http)
        .await
        .context("Failed to initialise the access gate")?;
    let app = app_router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(
        port = config.port,
        backend = ?config.profile_backend,
        cookie = %config.supabase.auth_cookie,
        "Medicly gate listening"
    );
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

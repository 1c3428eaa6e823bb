use livetodo::{
    config::Config,
    http::{routing, types::AppState},
    infrastructure::Backend,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let backend = Backend::from_config(&config).await?;
    let state = AppState::new(backend, config.sign_up_redirect()).with_secure_cookies(config.is_https());
    let router = routing::app(state);

    let addr = config.bind_addr;
    tracing::info!(%addr, configured = config.is_configured(), "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}

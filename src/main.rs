use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ride_matcher::api;
use ride_matcher::config::{Config, LogFormat};
use ride_matcher::error::AppError;
use ride_matcher::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    if config.payment_callback_token.is_none() {
        tracing::warn!("PAYMENT_CALLBACK_TOKEN unset; payment callbacks will be refused");
    }
    let shared_state = Arc::new(
        AppState::new(config.notification_buffer_size)
            .with_payment_callback_token(config.payment_callback_token.clone()),
    );
    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        notification_buffer_size = config.notification_buffer_size,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

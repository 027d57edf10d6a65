mod api;
mod auth;
mod config;
mod errors;
mod headers;
mod logging;
mod openapi;
mod pipeline;
mod repository;
mod state;
#[cfg(test)]
mod test_utils;

use crate::config::{ConfigurationView, LoggingConfig, Settings};
use crate::pipeline::static_files::StaticFiles;
use crate::state::AppState;
use axum::Router;
use log::{error, info, warn};
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    let code = run().await;
    logging::flush();
    std::process::exit(code);
}

/// Load settings from the working directory. On failure a console logger is
/// installed so the error is still reported.
fn load_settings() -> Option<(String, Settings)> {
    let environment = config::active_environment();
    let loaded = std::env::current_dir()
        .map_err(|e| config::ConfigurationLoadError::Invalid(e.to_string()))
        .and_then(|dir| ConfigurationView::load(&dir, &environment))
        .and_then(|view| Ok((view.environment().to_string(), view.settings()?)));

    match loaded {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            logging::init(&LoggingConfig {
                file: None,
                ..Default::default()
            });
            error!("Configuration error: {}", e);
            None
        }
    }
}

async fn run() -> i32 {
    let Some((environment, settings)) = load_settings() else {
        return 1;
    };

    // Initialize logging
    logging::init(&settings.logging);
    info!("Starting web host in {} environment", environment);

    let missing = StaticFiles::new(&settings.static_files.root)
        .verify_bundle(&settings.static_files.vendor_scripts);
    for entry in &missing {
        warn!(
            "Front-end bundle entry '{}' is missing from {}",
            entry, settings.static_files.root
        );
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

    // Initialize application state
    let state = match AppState::new(settings) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return 1;
        }
    };
    let app = create_app(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return 1;
        }
    };

    info!("Server running on {}, press Ctrl+C to stop", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Host terminated unexpectedly: {}", e);
        return 1;
    }

    info!("Server shutdown complete");
    0
}

/// Create a new application instance with a given state
pub fn create_app(state: AppState) -> Router {
    pipeline::build(state, api::endpoints())
}

// Simple signal handler that works on all platforms
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

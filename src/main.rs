use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use config::Config;
use models::SessionContext;
use services::{canvas::CanvasService, openai::OpenAiService, planner::Planner};

pub struct AppState {
    pub config: Config,
    pub planner: Planner,
    /// The single planning session. Locked for the duration of each action.
    pub session: Mutex<SessionContext>,
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Planner page and its script
        .merge(routes::page::router())
        // Plan / ask / courses API
        .nest("/api", routes::plan::router())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studystride=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting StudyStride");
    tracing::info!(
        "Canvas API: {} ({} courses), LLM model: {}",
        config.canvas.base_url,
        config.canvas.courses.len(),
        config.openai.model
    );

    // Initialize services
    let canvas = CanvasService::new(&config.canvas)?;
    let openai = OpenAiService::new(&config.openai)?;
    let planner = Planner::new(
        Arc::new(canvas),
        Arc::new(openai),
        config.canvas.token.clone(),
        config.canvas.courses.clone(),
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        planner,
        session: Mutex::new(SessionContext::default()),
    });

    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(listener, app);

    let signal_fut = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM, only Ctrl+C will stop the server: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Shutdown signal received, stopping server");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

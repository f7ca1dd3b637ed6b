//! Web layer module
//!
//! HTTP interface for driving one playlist import session: load a playlist,
//! inspect and filter the staged records, adjust the selection and commit.
//! Handlers are thin and delegate to [`SessionService`].

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{config::Config, session::SessionService};

pub mod handlers;
pub mod responses;

pub use responses::{handle_error, handle_result, ApiResponse};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: SessionService,
    /// Largest accepted playlist upload, matching the URL fetch cap
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, service: SessionService) -> Self {
        Self {
            service,
            max_upload_bytes: usize::try_from(config.fetch.max_bytes).unwrap_or(usize::MAX),
        }
    }
}

/// Build the router with all routes and middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/import", import_routes(state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn import_routes(max_upload_bytes: usize) -> Router<AppState> {
    use handlers::import_session::*;

    Router::new()
        .route("/session", get(get_session).delete(abandon_session))
        .route("/load/url", post(load_from_url))
        .route(
            "/load/file",
            post(load_from_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/channels", get(list_channels))
        .route("/groups", get(list_groups))
        .route("/filter", put(set_filter))
        .route("/selection/:index/toggle", post(toggle_selection))
        .route("/selection/select-all", post(select_all))
        .route("/selection/deselect-all", post(deselect_all))
        .route("/commit", post(commit_import))
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, service: SessionService) -> Result<Self> {
        let app = router(AppState::new(config, service));
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("Web server listening on {}", self.addr);
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}

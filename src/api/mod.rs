use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

use crate::config::{Config, ServerConfig};
use crate::state::SharedState;

pub mod context;
mod error;
mod home;
mod login;
mod observability;
mod types;
mod users;
mod validation;

pub use context::{Access, RequestContext};
pub use error::{ApiError, INVALID_LOGIN_MESSAGE};
pub use types::*;

use crate::services::CredentialService;
use metrics_exporter_prometheus::PrometheusHandle;

/// How often expired rows are purged from the persistent session table.
const SESSION_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialService> {
        &self.shared.credentials
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let server_config = state.config().server.clone();

    let routes = create_page_router().with_state(state.clone());

    let routes = if server_config.persistent_sessions {
        let pool = state.store().conn.get_sqlite_connection_pool().clone();
        let session_store = SqliteStore::new(pool);
        session_store
            .migrate()
            .await
            .context("Failed to prepare session table")?;

        tokio::spawn(
            session_store
                .clone()
                .continuously_delete_expired(SESSION_CLEANUP_INTERVAL),
        );

        info!("Using SQLite-backed sessions");
        routes.layer(session_layer(session_store, &server_config))
    } else {
        routes.layer(session_layer(MemoryStore::default(), &server_config))
    };

    Ok(routes
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http()))
}

fn session_layer<S>(store: S, config: &ServerConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_secure(config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_inactivity_minutes,
        )))
}

fn create_page_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home::homepage))
        .route("/log/in", get(login::sign_in_page).post(login::sign_in))
        .route("/log/out", get(login::sign_out).post(login::sign_out))
        .route("/user", get(users::list_users))
        .route(
            "/user/create",
            get(users::create_page).post(users::create_user),
        )
        .route(
            "/user/edit/{id}",
            get(users::edit_page).post(users::edit_user),
        )
        .route("/user/delete/{id}", post(users::delete_user))
        .route("/metrics", get(observability::get_metrics))
}

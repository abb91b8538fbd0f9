//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::relay::{LivenessMonitor, MessageRouter, Relay};
use crate::config::Settings;
use crate::domain::{IdentityProvider, MessageStore};
use crate::infrastructure::{identity, storage};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::RateLimiter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub router: Arc<MessageRouter>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Option<Arc<dyn MessageStore>>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the relay and its collaborators from settings and an
    /// already-connected store.
    pub fn build(settings: Settings, store: Option<Arc<dyn MessageStore>>) -> Self {
        let relay = Arc::new(Relay::new(settings.relay_config()));
        let router = Arc::new(MessageRouter::new(relay.clone(), store.clone()));
        let identity = identity::from_settings(&settings.auth);
        let rate_limiter = settings
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_settings(&settings.rate_limit)));

        Self {
            relay,
            router,
            identity,
            store,
            rate_limiter,
            settings: Arc::new(settings),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let store = storage::connect(&settings).await?;
        let addr = settings.server_addr();
        let state = AppState::build(settings, store);

        tracing::info!(
            max_rooms = state.relay.config().max_rooms,
            rooms = state.relay.room_count(),
            heartbeat_ms = state.relay.config().heartbeat_interval.as_millis() as u64,
            "Relay initialized"
        );

        let router = routes::create_router(state.clone());

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        let cancel = CancellationToken::new();
        let monitor = LivenessMonitor::new(
            self.state.relay.clone(),
            self.state.relay.config().heartbeat_interval,
            cancel.clone(),
        )
        .spawn();

        let result = axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        cancel.cancel();
        let _ = monitor.await;
        tracing::info!(sessions = self.state.relay.session_count(), "Server stopped");

        result?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

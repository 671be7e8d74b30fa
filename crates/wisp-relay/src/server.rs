//! Server lifecycle: owns the store, spawns the janitor as a cancellable
//! task, assembles the axum router, and serves with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::RelayConfig;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::rate_limit::{NoopRateLimiter, RateLimitHook};
use crate::store::RelayStore;

/// Turn a timed-out request into the relay's stable JSON error shape rather
/// than letting tower's raw `Elapsed` escape as an opaque 500.
async fn handle_request_timeout(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::StoreOverloaded
    } else {
        ApiError::Internal
    }
}

pub struct RelayServer {
    config: RelayConfig,
    store: Arc<RelayStore>,
    metrics: Arc<Metrics>,
    rate_limiter: Arc<dyn RateLimitHook>,
    shutdown_tx: watch::Sender<bool>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self::with_rate_limiter(config, Arc::new(NoopRateLimiter))
    }

    pub fn with_rate_limiter(config: RelayConfig, rate_limiter: Arc<dyn RateLimitHook>) -> Self {
        let store = Arc::new(RelayStore::new(config.per_token_cap));
        let metrics = Arc::new(Metrics::new());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            store,
            metrics,
            rate_limiter,
            shutdown_tx,
        }
    }

    fn router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            rate_limiter: self.rate_limiter.clone(),
        };

        let timeout_middleware = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_request_timeout))
            .timeout(self.config.request_timeout());

        Router::new()
            .route("/", get(api::get_root))
            .route("/api/v1/health", get(api::get_health))
            .route("/api/v1/status", get(api::get_status))
            .route("/api/v1/send", post(api::post_send))
            .route("/api/v1/poll", post(api::post_poll))
            .route("/api/v1/consume", post(api::post_consume))
            .layer(TraceLayer::new_for_http())
            .layer(timeout_middleware)
            .with_state(state)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let janitor_shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(Self::janitor_task(
            self.store.clone(),
            self.config.sweep_interval(),
            janitor_shutdown,
        ));

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!("wisp-relay listening on {}", self.config.bind_addr);

        let shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal(shutdown_rx))
            .await?;

        Ok(())
    }

    async fn janitor_task(
        store: Arc<RelayStore>,
        interval: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let swept = store.sweep();
                    if swept > 0 {
                        info!(swept, "janitor sweep");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // One final sweep before the process exits.
                        store.sweep();
                        break;
                    }
                }
            }
        }
    }

    async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
        #[cfg(unix)]
        let mut sigterm = {
            use tokio::signal::unix::{signal, SignalKind};
            signal(SignalKind::terminate()).ok()
        };

        tokio::select! {
            _ = async {
                #[cfg(unix)]
                {
                    if let Some(ref mut sigterm) = sigterm {
                        sigterm.recv().await;
                    }
                }
                #[cfg(not(unix))]
                {
                    std::future::pending::<()>().await;
                }
            } => {
                info!("received SIGTERM, shutting down");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("shutdown requested");
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn store(&self) -> Arc<RelayStore> {
        self.store.clone()
    }
}

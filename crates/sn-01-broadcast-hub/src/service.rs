//! Broadcast hub service - HTTP/WebSocket entry point.
//!
//! Serves the WebSocket upgrade plus `/health` and `/stats`, runs the
//! periodic feeds and the stats logger, and shuts down on signal.

use crate::auth::Authenticator;
use crate::domain::config::HubConfig;
use crate::domain::error::HubError;
use crate::hub::BroadcastHub;
use crate::ports::{DataProvider, SystemTimeSource, TimeSource, UserStore};
use crate::publisher::EventPublisher;
use crate::registry::TopicRegistry;
use crate::ws::{ws_upgrade, WsState};
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Broadcast hub service state
pub struct HubService {
    config: HubConfig,
    hub: Arc<BroadcastHub>,
    authenticator: Arc<Authenticator>,
    shutdown: watch::Sender<bool>,
}

impl HubService {
    /// Create a new service
    pub fn new(
        config: HubConfig,
        users: Arc<dyn UserStore>,
        provider: Arc<dyn DataProvider>,
    ) -> Result<Self, HubError> {
        Self::with_clock(config, users, provider, Arc::new(SystemTimeSource))
    }

    /// Create a service with an explicit token clock
    pub fn with_clock(
        config: HubConfig,
        users: Arc<dyn UserStore>,
        provider: Arc<dyn DataProvider>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, HubError> {
        // Validate configuration
        config.validate()?;

        let hub = Arc::new(BroadcastHub::new(
            provider,
            config.websocket.message_buffer_size,
        ));
        let authenticator = Arc::new(Authenticator::new(&config.auth, users, clock));

        Ok(Self {
            config,
            hub,
            authenticator,
            shutdown: watch::channel(false).0,
        })
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    /// Publisher handed to business logic for alert broadcasts
    pub fn events(&self) -> EventPublisher {
        self.hub.events().clone()
    }

    /// Trigger graceful shutdown of [`HubService::start`], whether it is
    /// already running or not yet called.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Bind the configured address and serve until [`HubService::shutdown`].
    pub async fn start(&self) -> Result<(), HubError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HubError::Bind(format!("{}: {}", addr, e)))?;

        let mut shutdown = self.shutdown.subscribe();
        self.serve(listener, async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), HubError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| HubError::Bind(e.to_string()))?;
        info!(addr = %local_addr, path = %self.config.server.ws_path, "Starting broadcast hub");

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = self
            .hub
            .periodic()
            .spawn_feeds(&self.config.feeds, stop_rx.clone());
        tasks.push(self.start_stats_task(stop_rx));

        let router = self.build_router();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| HubError::Serve(e.to_string()));

        let _ = stop_tx.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        match &result {
            Ok(()) => info!("Broadcast hub stopped"),
            Err(e) => error!(error = %e, "Broadcast hub failed"),
        }
        result
    }

    /// Build the HTTP router
    pub fn build_router(&self) -> Router {
        let ws_state = WsState {
            hub: Arc::clone(&self.hub),
            authenticator: Arc::clone(&self.authenticator),
            config: self.config.websocket.clone(),
        };

        let registry = Arc::clone(self.hub.registry());
        let status = Router::new()
            .route("/health", get(health_check))
            .route("/stats", get(stats))
            .with_state(registry);

        Router::new()
            .route(&self.config.server.ws_path, get(ws_upgrade))
            .with_state(ws_state)
            .merge(status)
            .layer(create_cors_layer(&self.config.server.cors_origin))
            .layer(TraceLayer::new_for_http())
    }

    /// Periodic connection statistics log
    fn start_stats_task(&self, stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let registry = Arc::clone(self.hub.registry());
        let every = self.config.stats_interval;
        tokio::spawn(stats_task(registry, every, stop))
    }

    /// Bound address the service will use for [`HubService::start`]
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr()
    }
}

fn create_cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            warn!(origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

async fn stats_task(registry: Arc<TopicRegistry>, every: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!(
                    connections = registry.connection_count(),
                    topics = registry.topic_count(),
                    "Hub stats"
                );
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}

async fn health_check(State(registry): State<Arc<TopicRegistry>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "connections": registry.connection_count(),
    }))
}

async fn stats(State(registry): State<Arc<TopicRegistry>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "connections": registry.connection_count(),
        "topics": registry.topic_stats(),
    }))
}

//! Web application router and middleware setup.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::metrics::{MetricsSource, SnapshotAssembler};
use crate::shutdown::ShutdownSignal;
use crate::web::config::WebConfig;
use crate::web::{events, handlers};

/// State shared by every handler. Only the assembler is shared between sessions.
pub struct AppState<S> {
    pub assembler: Arc<SnapshotAssembler<S>>,
    pub shutdown: ShutdownSignal,
    pub stream_interval: Duration,
}

impl<S> AppState<S> {
    pub fn new(
        assembler: Arc<SnapshotAssembler<S>>,
        shutdown: ShutdownSignal,
        stream_interval: Duration,
    ) -> Self {
        Self {
            assembler,
            shutdown,
            stream_interval,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            assembler: Arc::clone(&self.assembler),
            shutdown: self.shutdown.clone(),
            stream_interval: self.stream_interval,
        }
    }
}

/// Create the axum application with all routes and middleware.
///
/// Unknown paths fall through to axum's 404 and wrong methods on known paths get a 405.
/// axum answers `HEAD` through the `GET` handler by default, so the API routes
/// reject it explicitly instead of sampling.
pub fn create_app<S: MetricsSource>(config: &WebConfig, state: AppState<S>) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/stats",
            get(handlers::get_stats::<S>).head(handlers::method_not_allowed),
        )
        .route(
            "/api/events",
            get(events::stream_events::<S>).head(handlers::method_not_allowed),
        )
        .with_state(state);

    // Add CORS if enabled
    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

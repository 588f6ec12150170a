//! HTTP surface: snapshot endpoint, event stream, and server lifecycle.
//!
//! `GET /api/stats` returns one [`Snapshot`](crate::metrics::Snapshot) as JSON,
//! `GET /api/events` streams one every [`WebConfig::stream_interval`] as
//! Server-Sent Events, and `GET /` describes the service.

pub mod config;
pub mod events;
pub mod handlers;
pub mod router;
pub mod session;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::{create_app, AppState};
pub use session::{SessionEvent, StreamSession};

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tower::Service;
use tracing::{debug, info, warn};

use crate::error::{Result, StatsError};
use crate::metrics::{MetricsSource, SnapshotAssembler};
use crate::shutdown::{self, ShutdownSignal};

/// Owns the listening socket for its whole life.
pub struct WebServer<S> {
    config: WebConfig,
    listener: TcpListener,
    assembler: Arc<SnapshotAssembler<S>>,
}

impl<S: MetricsSource> WebServer<S> {
    /// Bind the listener described by `config`.
    pub async fn bind(config: WebConfig, assembler: SnapshotAssembler<S>) -> Result<Self> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StatsError::listener_failure(format!("failed to bind to {}", addr), e))?;

        Ok(Self {
            config,
            listener,
            assembler: Arc::new(assembler),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| StatsError::listener_failure("failed to read local address", e))
    }

    /// Serve until `stop` resolves, then drain.
    ///
    /// On shutdown the listener is closed and every stream session is
    /// cancelled at once. Open connections get [`WebConfig::shutdown_grace`]
    /// to finish; the ones still running after that are aborted and their
    /// sockets closed.
    pub async fn run<F>(self, stop: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;
        let WebServer {
            config,
            listener,
            assembler,
        } = self;
        let (trigger, signal) = shutdown::channel();

        let state = AppState::new(assembler, signal.clone(), config.stream_interval);
        let app = create_app(&config, state);

        info!("Server running at http://{}", addr);
        info!("API endpoint: http://{}/api/stats", addr);
        info!("Event stream: http://{}/api/events", addr);

        let mut connections = JoinSet::new();
        tokio::pin!(stop);

        let failure = loop {
            tokio::select! {
                biased;
                _ = &mut stop => break None,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        debug!("Accepted connection from {}", remote);
                        connections.spawn(serve_connection(stream, remote, app.clone(), signal.clone()));
                    }
                    Err(e) if is_connection_error(&e) => {
                        debug!("Connection dropped before accept: {}", e);
                    }
                    Err(e) => break Some(StatsError::listener_failure("failed to accept connection", e)),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        drop(listener);
        info!("Shutting down server...");
        trigger.trigger();

        let grace = config.shutdown_grace;
        if tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!(
                "{} connections still open after {:?}, terminating them",
                connections.len(),
                grace
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
        info!("Server stopped");

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Serve one accepted connection until it closes or the server drains it.
async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    mut shutdown: ShutdownSignal,
) {
    let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
        app.clone().call(request)
    });

    let builder = Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.triggered() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        debug!("Connection from {} ended with error: {}", remote, e);
    }
}

// Per-connection failures that leave the listener usable.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Bind and serve `source` with the provided configuration until `stop` resolves.
pub async fn start_web_server<S, F>(config: WebConfig, source: S, stop: F) -> Result<()>
where
    S: MetricsSource,
    F: Future<Output = ()> + Send,
{
    let server = WebServer::bind(config, SnapshotAssembler::new(source)).await?;
    server.run(stop).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_keep_listener() {
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_connection_error(&io::Error::new(
            io::ErrorKind::Other,
            "too many open files"
        )));
    }
}

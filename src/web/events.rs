//! Server-Sent Events endpoint for continuous snapshots.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::error::Result;
use crate::metrics::{MetricsSource, Snapshot};
use crate::web::router::AppState;
use crate::web::session::{SessionEvent, StreamSession};

/// Open an event stream and spawn the session feeding it.
///
/// Each [`SessionEvent`] becomes its own body frame, so hyper writes it out
/// as soon as it is produced instead of waiting for a buffer to fill.
pub async fn stream_events<S: MetricsSource>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel(1);
    let session = StreamSession::new(
        Arc::clone(&state.assembler),
        tx,
        state.shutdown.clone(),
        state.stream_interval,
    );
    info!("Event stream client connected: {}", session.id());
    tokio::spawn(session.run());

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(to_sse_event(event)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream),
    )
}

/// Frame a session event as `event: <name>`, `id: <seq>`, `data: <payload>`.
pub fn to_sse_event(event: SessionEvent) -> Event {
    let frame = Event::default()
        .event(event.name())
        .id(event.seq().to_string());

    match event {
        SessionEvent::Stats { seq, snapshot } => match encode_snapshot(&snapshot) {
            Ok(json) => frame.data(json),
            Err(e) => {
                error!("Failed to encode snapshot {}: {}", seq, e);
                error_event(seq, &e.to_string())
            }
        },
        SessionEvent::Error { message, .. } => frame.data(sanitize(&message)),
    }
}

fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

fn error_event(seq: u64, message: &str) -> Event {
    Event::default()
        .event("error")
        .id(seq.to_string())
        .data(sanitize(message))
}

// Event fields may not contain carriage returns; newlines become extra data lines.
fn sanitize(message: &str) -> String {
    message.replace('\r', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_encodes_on_one_line() {
        let snapshot = Snapshot::new(1.5, 2.0, 3.0, 4, Vec::new());
        let json = encode_snapshot(&snapshot).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.starts_with("{\"cpuUsage\":1.5"));
    }

    #[test]
    fn test_sanitize_strips_carriage_returns() {
        assert_eq!(sanitize("disk:\r\nboom"), "disk: \nboom");
        assert_eq!(sanitize("plain"), "plain");
    }
}

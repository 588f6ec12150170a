//! Per-client streaming session.
//!
//! A [`StreamSession`] owns one client's ticking schedule. On every tick it
//! samples the host and hands a [`SessionEvent`] to the transport through a
//! bounded channel, so at most one snapshot is in flight per client. The
//! session ends when the server shuts down, when the transport drops the
//! receiving side (client disconnect), or when a hand-off fails.
//!
//! A session is open once built, streams while [`StreamSession::run`] is
//! awaited, and is closed when `run` hands back its [`CloseReason`].
//!
//! If sampling overruns the interval the next tick fires as soon as the
//! sample is delivered and the schedule restarts from there
//! ([`MissedTickBehavior::Delay`]); ticks are never bursted or merged.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StatsError;
use crate::metrics::{MetricsSource, Snapshot, SnapshotAssembler};
use crate::shutdown::ShutdownSignal;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Shutdown,
    ClientGone,
    WriteFailed,
}

/// One item of the stream, tagged with its position in the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Stats { seq: u64, snapshot: Snapshot },
    Error { seq: u64, message: String },
}

impl SessionEvent {
    pub fn seq(&self) -> u64 {
        match self {
            SessionEvent::Stats { seq, .. } | SessionEvent::Error { seq, .. } => *seq,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Stats { .. } => "stats",
            SessionEvent::Error { .. } => "error",
        }
    }
}

pub struct StreamSession<S> {
    id: Uuid,
    assembler: Arc<SnapshotAssembler<S>>,
    events: mpsc::Sender<SessionEvent>,
    shutdown: ShutdownSignal,
    interval: Duration,
    seq: u64,
}

impl<S: MetricsSource> StreamSession<S> {
    pub fn new(
        assembler: Arc<SnapshotAssembler<S>>,
        events: mpsc::Sender<SessionEvent>,
        shutdown: ShutdownSignal,
        interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assembler,
            events,
            shutdown,
            interval,
            seq: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drive the session until it closes.
    ///
    /// The session is consumed, so a closed session cannot be resumed or
    /// written to. The timer and the sender are dropped on return, whichever
    /// way the loop exits.
    pub async fn run(mut self) -> CloseReason {
        debug!("Stream session {} streaming", self.id);

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                _ = self.shutdown.triggered() => break CloseReason::Shutdown,
                _ = self.events.closed() => break CloseReason::ClientGone,
                _ = ticker.tick() => {}
            }

            let event = self.next_event().await;

            let sent = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => break CloseReason::Shutdown,
                sent = self.events.send(event) => sent,
            };
            if let Err(e) = sent {
                let err = StatsError::transport_write_failure(e.to_string());
                debug!("Stream session {}: {}", self.id, err);
                break CloseReason::WriteFailed;
            }
        };

        debug!(
            "Stream session {} closed after {} events ({:?})",
            self.id, self.seq, reason
        );
        reason
    }

    async fn next_event(&mut self) -> SessionEvent {
        self.seq += 1;
        match self.assembler.sample().await {
            Ok(snapshot) => SessionEvent::Stats {
                seq: self.seq,
                snapshot,
            },
            Err(e) => {
                warn!("Stream session {}: sample {} failed: {}", self.id, self.seq, e);
                SessionEvent::Error {
                    seq: self.seq,
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fake::FakeSource;
    use crate::shutdown;

    fn session(
        source: FakeSource,
    ) -> (
        StreamSession<FakeSource>,
        mpsc::Receiver<SessionEvent>,
        shutdown::ShutdownTrigger,
    ) {
        let (tx, rx) = mpsc::channel(1);
        let (trigger, signal) = shutdown::channel();
        let assembler = Arc::new(SnapshotAssembler::new(source));
        let session = StreamSession::new(assembler, tx, signal, Duration::from_secs(2));
        (session, rx, trigger)
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_tick_does_not_end_session() {
        let (session, mut rx, trigger) = session(FakeSource::healthy().with_disk_error("io"));
        let handle = tokio::spawn(session.run());

        for expected in 1..=2 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.name(), "error");
            assert_eq!(event.seq(), expected);
        }

        trigger.trigger();
        assert_eq!(handle.await.unwrap(), CloseReason::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_closes_session() {
        let (session, rx, _trigger) = session(FakeSource::healthy());
        let handle = tokio::spawn(session.run());

        drop(rx);
        assert_eq!(handle.await.unwrap(), CloseReason::ClientGone);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_releases_channel() {
        let (session, mut rx, trigger) = session(FakeSource::healthy());
        let handle = tokio::spawn(session.run());

        assert_eq!(rx.recv().await.unwrap().seq(), 1);
        trigger.trigger();
        assert_eq!(handle.await.unwrap(), CloseReason::Shutdown);

        // At most one event was still buffered; after that the sender is gone.
        let mut leftover = 0;
        while rx.recv().await.is_some() {
            leftover += 1;
        }
        assert!(leftover <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick_emits_nothing() {
        let (session, mut rx, trigger) = session(FakeSource::healthy());
        trigger.trigger();

        assert_eq!(session.run().await, CloseReason::Shutdown);
        assert!(rx.recv().await.is_none());
    }
}

// THEORY:
// The `session` module puts a `TrackingSession` behind an actor so that many
// concurrent callers (HTTP handlers, replay tools) can share one visitation grid.
//
// Key architectural principles:
// 1.  **Single Writer**: One worker owns the `TrackingSession`. Ingest and reset
//     requests queue on a bounded channel and are applied strictly in arrival
//     order; each caller gets its own result back on a oneshot channel.
// 2.  **Blocking Work Off the Runtime**: Aggregation and ledger commits are
//     synchronous, possibly disk-bound work, so the worker runs on tokio's
//     blocking pool and pulls messages with `blocking_recv`.
// 3.  **Readers Skip the Queue**: Projections read the store's consistent snapshot
//     directly. They never wait behind queued batches, only behind the store's own
//     short critical section.
// 4.  **Clean Shutdown**: The worker exits on `Shutdown` or once every handle has
//     been dropped.

use crate::core_modules::cell::RawSample;
use crate::core_modules::ledger::{LedgerStats, SharedStore};
use crate::core_modules::projector::{self, MapProjection};
use crate::error::{Result, TrailError};
use crate::pipeline::{IngestReport, TrackingSession};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const SESSION_QUEUE_DEPTH: usize = 64;

/// Message type for the session worker
enum SessionMessage {
    Ingest(Vec<RawSample>, oneshot::Sender<Result<IngestReport>>),
    Reset(oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Cloneable handle to a tracking session running on its own worker.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMessage>,
    store: SharedStore,
}

impl SessionHandle {
    /// Moves `session` onto a blocking worker. Must be called inside a tokio runtime.
    pub fn spawn(mut session: TrackingSession) -> Self {
        let store = session.store().clone();
        let (tx, mut rx) = mpsc::channel::<SessionMessage>(SESSION_QUEUE_DEPTH);

        tokio::task::spawn_blocking(move || {
            while let Some(msg) = rx.blocking_recv() {
                match msg {
                    SessionMessage::Ingest(batch, reply) => {
                        let _ = reply.send(session.ingest(&batch));
                    }
                    SessionMessage::Reset(reply) => {
                        let _ = reply.send(session.reset());
                    }
                    SessionMessage::Shutdown => break,
                }
            }
            debug!("session worker stopped");
        });

        Self { tx, store }
    }

    /// Queues a batch and waits for it to be committed (or to fail).
    pub async fn ingest(&self, batch: Vec<RawSample>) -> Result<IngestReport> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(SessionMessage::Ingest(batch, reply))
            .await
            .map_err(|_| TrailError::SessionClosed)?;
        result.await.map_err(|_| TrailError::SessionClosed)?
    }

    /// Queues a reset behind any batches already waiting.
    pub async fn reset(&self) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(SessionMessage::Reset(reply))
            .await
            .map_err(|_| TrailError::SessionClosed)?;
        result.await.map_err(|_| TrailError::SessionClosed)?
    }

    /// The map as of the most recent completed commit.
    pub async fn project(&self) -> Result<MapProjection> {
        let store = self.store.clone();
        let snapshot = tokio::task::spawn_blocking(move || store.snapshot()).await??;
        Ok(projector::project(snapshot))
    }

    /// Number of raw samples kept in the store's history.
    pub async fn sample_count(&self) -> Result<u64> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.sample_count()).await?
    }

    /// Map and history counters from a single store read.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.stats()).await?
    }

    /// Stops the worker once the batches ahead of this message are done.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionMessage::Shutdown).await;
    }
}

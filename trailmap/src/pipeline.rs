// THEORY:
// The `pipeline` module is the top-level, synchronous API of the engine. A
// `TrackingSession` owns the write path of one shared visitation grid: it reads the
// cursor, runs the aggregator over a batch, and hands the resulting delta to the
// ledger store in a single commit. Reads go straight to the store's consistent
// snapshot and are projected into a client payload.
//
// Ingesting requires `&mut self`, so the borrow checker enforces the
// single-writer rule for anyone embedding the session directly. The async
// `SessionHandle` in `session` builds on this for concurrent callers.

use crate::core_modules::aggregator::Aggregator;
use crate::core_modules::ledger::SharedStore;
use crate::core_modules::projector::{self, MapProjection};
use crate::error::Result;
use tracing::{debug, error, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::aggregator::{IngestReport, Rejection};
pub use crate::core_modules::cell::{Cell, CursorState, RawSample};
pub use crate::core_modules::projector::CellVisit;
pub use crate::core_modules::teleport_filter::{MAX_JUMP, MAX_JUMP_LIMIT};

/// Configuration for a tracking session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Moves longer than this many cells on either axis are treated as
    /// teleports and not interpolated. Clamped to `MAX_JUMP_LIMIT`.
    pub max_jump: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_jump: MAX_JUMP }
    }
}

/// The single writer of one visitation grid.
pub struct TrackingSession {
    store: SharedStore,
    aggregator: Aggregator,
}

impl TrackingSession {
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        Self {
            store,
            aggregator: Aggregator::new(config.max_jump),
        }
    }

    /// Aggregates one ordered batch and commits it atomically.
    ///
    /// On error nothing from this batch is applied and the caller should
    /// resubmit the whole batch.
    pub fn ingest(&mut self, batch: &[RawSample]) -> Result<IngestReport> {
        if batch.is_empty() {
            return Ok(IngestReport::default());
        }

        let cursor = self.store.cursor()?;
        let delta = self.aggregator.aggregate(batch, cursor.as_ref());
        if delta.is_empty() {
            debug!(rejected = delta.report.rejected.len(), "nothing to commit");
            return Ok(delta.report);
        }

        if let Err(err) = self.store.commit(&delta) {
            error!(%err, samples = batch.len(), "batch commit failed, nothing applied");
            return Err(err);
        }

        debug!(
            accepted = delta.report.accepted,
            rejected = delta.report.rejected.len(),
            teleports = delta.report.teleports,
            cells = delta.deltas.len(),
            "batch committed"
        );
        Ok(delta.report)
    }

    /// The current map, as of the last completed commit.
    pub fn project(&self) -> Result<MapProjection> {
        Ok(projector::project(self.store.snapshot()?))
    }

    /// Clears the ledger, the cursor and the sample history.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()?;
        info!("tracking session reset");
        Ok(())
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

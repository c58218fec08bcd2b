// THEORY:
// The `Aggregator` is where sparse pings become visit counts. It walks one
// ordered batch of raw samples, links each sample to the one before it through
// the teleport filter, and tallies every credited cell into a per-batch delta.
// It never touches storage; the delta is handed to a ledger store that merges
// it in one atomic commit.
//
// Key architectural principles:
// 1.  **Anchor Carry-Over**: The first sample of a batch is linked to the cursor
//     left by the previous batch, so a trail continues seamlessly across batch
//     boundaries and restarts.
// 2.  **Credit Each Cell Once Per Visit**: Adjacent links share an endpoint. Only
//     the very first sample a session ever sees is credited on its own; every
//     later link contributes its `fresh_cells` (the path minus its first cell).
//     Splitting a batch anywhere therefore yields exactly the same counts.
// 3.  **Local Recovery**: A bad reading is operational noise. It is reported with
//     its position in the batch and skipped; the anchor stays on the last good
//     sample and the rest of the batch proceeds.

use crate::core_modules::cell::{Cell, CursorState, HitCount, RawSample};
use crate::core_modules::teleport_filter::{MAX_JUMP, MAX_JUMP_LIMIT, connect};
use crate::error::SampleError;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A sample the aggregator refused, with its index in the submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: SampleError,
}

/// Summary of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Samples that were aggregated.
    pub accepted: usize,
    /// Samples that were skipped, in batch order.
    pub rejected: Vec<Rejection>,
    /// Links that were treated as teleports.
    pub teleports: usize,
    /// Total increments handed to the ledger (sum of all deltas).
    pub cells_credited: HitCount,
}

/// Everything one batch contributes to a tracking session.
#[derive(Debug, Clone, Default)]
pub struct BatchDelta {
    /// Incremental hit count per cell for this batch only.
    pub deltas: BTreeMap<Cell, HitCount>,
    /// The new cursor, or `None` when no sample was accepted.
    pub cursor: Option<CursorState>,
    /// The accepted raw samples, in order, for history retention.
    pub samples: Vec<RawSample>,
    pub report: IngestReport,
}

impl BatchDelta {
    /// `true` when there is nothing to commit.
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
    }

    fn credit(&mut self, cell: Cell) {
        *self.deltas.entry(cell).or_insert(0) += 1;
        self.report.cells_credited += 1;
    }
}

/// Turns sample batches into cell deltas.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    max_jump: u64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(MAX_JUMP)
    }
}

impl Aggregator {
    /// `max_jump` above `MAX_JUMP_LIMIT` is clamped to it.
    pub fn new(max_jump: u64) -> Self {
        Self {
            max_jump: max_jump.min(MAX_JUMP_LIMIT),
        }
    }

    pub fn max_jump(&self) -> u64 {
        self.max_jump
    }

    /// Aggregates `batch`, anchored at `cursor` when the session has one.
    pub fn aggregate(&self, batch: &[RawSample], cursor: Option<&CursorState>) -> BatchDelta {
        let mut delta = BatchDelta::default();
        let mut anchor = cursor.map(CursorState::cell);

        for (index, sample) in batch.iter().enumerate() {
            let cell = match sample.cell() {
                Ok(cell) => cell,
                Err(reason) => {
                    warn!(index, agent = %sample.agent_id, %reason, "rejecting sample");
                    delta.report.rejected.push(Rejection { index, reason });
                    continue;
                }
            };

            match anchor {
                None => delta.credit(cell),
                Some(prev) => {
                    let link = connect(prev, cell, self.max_jump);
                    if link.is_teleport() {
                        debug!(?prev, next = ?cell, "teleport, skipping interpolation");
                        delta.report.teleports += 1;
                    }
                    for &visited in link.fresh_cells() {
                        delta.credit(visited);
                    }
                }
            }

            anchor = Some(cell);
            delta.cursor = Some(CursorState::from(sample));
            delta.samples.push(sample.clone());
            delta.report.accepted += 1;
        }

        delta
    }
}

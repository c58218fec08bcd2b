// THEORY:
// The ledger is the sole persistent state of a tracking session: the per-cell
// visit counts and the cursor. This module defines the storage boundary as the
// `LedgerStore` trait and provides an in-memory implementation. The durable
// SQLite implementation lives in `sqlite_ledger`.
//
// Key architectural principles:
// 1.  **Batch Atomicity**: `commit` applies a whole `BatchDelta` (every cell
//     increment, the new cursor, and the history rows) or nothing at all.
// 2.  **Consistent Snapshots**: `snapshot` reads the cells and the cursor
//     together, so a reader never sees a ledger update without its cursor.
// 3.  **Single Writer, Many Readers**: Stores are `Send + Sync` and shared behind
//     an `Arc`. Writes are serialized one level up by the tracking session;
//     reads may come from any thread at any time.

use crate::core_modules::aggregator::BatchDelta;
use crate::core_modules::cell::{Cell, CursorState, HitCount, RawSample};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A store shared between the session writer and any number of readers.
pub type SharedStore = Arc<dyn LedgerStore>;

/// A consistent, point-in-time copy of a session's aggregate state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    /// Every visited cell with its count, ascending by `(x, z)`.
    pub cells: Vec<(Cell, HitCount)>,
    pub cursor: Option<CursorState>,
}

/// Summary counters, read in one step so they always describe the same commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Number of distinct visited cells.
    pub cells: u64,
    pub total_hits: HitCount,
    pub max_hits: HitCount,
    /// Raw samples kept in the history (0 when history is off).
    pub samples_recorded: u64,
}

/// The storage boundary of the engine.
pub trait LedgerStore: Send + Sync {
    /// The cursor of the last committed batch, if any.
    fn cursor(&self) -> Result<Option<CursorState>>;

    /// Applies one batch atomically. A delta without a cursor is a no-op.
    fn commit(&self, delta: &BatchDelta) -> Result<()>;

    /// Reads all cells and the cursor as one consistent view.
    fn snapshot(&self) -> Result<LedgerSnapshot>;

    /// Clears cells, cursor and history in one step.
    fn reset(&self) -> Result<()>;

    /// Number of raw samples retained in the history.
    fn sample_count(&self) -> Result<u64>;

    /// Cell and history counters as one consistent view.
    fn stats(&self) -> Result<LedgerStats>;
}

#[derive(Debug, Default)]
struct MemoryState {
    cells: BTreeMap<Cell, HitCount>,
    cursor: Option<CursorState>,
    history: Vec<RawSample>,
}

/// A process-local ledger. Fast, and gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<MemoryState>,
    retain_history: bool,
}

impl MemoryLedger {
    pub fn new(retain_history: bool) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            retain_history,
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn cursor(&self) -> Result<Option<CursorState>> {
        Ok(self.state.read().cursor)
    }

    fn commit(&self, delta: &BatchDelta) -> Result<()> {
        let Some(cursor) = delta.cursor else {
            return Ok(());
        };
        let mut state = self.state.write();
        for (cell, hits) in &delta.deltas {
            let count = state.cells.entry(*cell).or_insert(0);
            *count = count.saturating_add(*hits);
        }
        state.cursor = Some(cursor);
        if self.retain_history {
            state.history.extend(delta.samples.iter().cloned());
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.state.read();
        Ok(LedgerSnapshot {
            cells: state.cells.iter().map(|(cell, hits)| (*cell, *hits)).collect(),
            cursor: state.cursor,
        })
    }

    fn reset(&self) -> Result<()> {
        *self.state.write() = MemoryState::default();
        Ok(())
    }

    fn sample_count(&self) -> Result<u64> {
        Ok(self.state.read().history.len() as u64)
    }

    fn stats(&self) -> Result<LedgerStats> {
        let state = self.state.read();
        Ok(LedgerStats {
            cells: state.cells.len() as u64,
            total_hits: state.cells.values().fold(0, |sum: HitCount, hits| sum.saturating_add(*hits)),
            max_hits: state.cells.values().copied().max().unwrap_or(0),
            samples_recorded: state.history.len() as u64,
        })
    }
}

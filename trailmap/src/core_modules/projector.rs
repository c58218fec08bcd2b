// THEORY:
// The `projector` is the read side of the engine. It turns a ledger snapshot into
// the shape a renderer polls for: every visited cell with its count, plus the cell
// the agent currently stands on. It holds no state and never writes.

use crate::core_modules::cell::{Cell, HitCount};
use crate::core_modules::ledger::LedgerSnapshot;

/// A visited cell and how many times it was credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellVisit {
    pub cell: Cell,
    pub hits: HitCount,
}

/// Client-ready view of a tracking session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapProjection {
    /// Every ledger key exactly once, ascending by `(x, z)`.
    pub cells: Vec<CellVisit>,
    /// The floored cursor, absent until the first sample is ingested.
    pub current: Option<Cell>,
}

impl MapProjection {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Highest single-cell count; renderers normalize their color ramp on it.
    pub fn max_hits(&self) -> HitCount {
        self.cells.iter().map(|visit| visit.hits).max().unwrap_or(0)
    }

    pub fn total_hits(&self) -> HitCount {
        self.cells.iter().map(|visit| visit.hits).sum()
    }
}

/// Projects a snapshot into a client payload.
pub fn project(snapshot: LedgerSnapshot) -> MapProjection {
    let mut cells: Vec<CellVisit> = snapshot
        .cells
        .into_iter()
        .map(|(cell, hits)| CellVisit { cell, hits })
        .collect();
    // Stores already return sorted, unique keys; this keeps the contract for
    // any store that does not.
    cells.sort_by_key(|visit| visit.cell);
    cells.dedup_by(|later, earlier| {
        if later.cell == earlier.cell {
            earlier.hits = earlier.hits.saturating_add(later.hits);
            true
        } else {
            false
        }
    });

    MapProjection {
        cells,
        current: snapshot.cursor.map(|cursor| cursor.cell()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::cell::CursorState;

    #[test]
    fn uninitialized_ledger_projects_to_nothing() {
        let projection = project(LedgerSnapshot::default());
        assert!(projection.is_empty());
        assert_eq!(projection.current, None);
        assert_eq!(projection.max_hits(), 0);
    }

    #[test]
    fn current_is_the_floored_cursor() {
        let projection = project(LedgerSnapshot {
            cells: vec![(Cell::new(-1, 3), 1)],
            cursor: Some(CursorState::new(-0.5, 3.99)),
        });
        assert_eq!(projection.current, Some(Cell::new(-1, 3)));
    }

    #[test]
    fn cells_come_out_sorted_and_unique() {
        let projection = project(LedgerSnapshot {
            cells: vec![(Cell::new(2, 0), 3), (Cell::new(0, 1), 1), (Cell::new(2, 0), 2)],
            cursor: None,
        });
        assert_eq!(
            projection.cells,
            vec![
                CellVisit { cell: Cell::new(0, 1), hits: 1 },
                CellVisit { cell: Cell::new(2, 0), hits: 5 },
            ]
        );
        assert_eq!(projection.total_hits(), 6);
        assert_eq!(projection.max_hits(), 5);
    }

    #[test]
    fn projecting_the_same_snapshot_twice_is_identical() {
        let snapshot = LedgerSnapshot {
            cells: vec![(Cell::new(0, 0), 4), (Cell::new(1, 1), 2)],
            cursor: Some(CursorState::new(1.2, 1.8)),
        };
        assert_eq!(project(snapshot.clone()), project(snapshot));
    }
}

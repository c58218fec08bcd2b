// THEORY:
// The `teleport_filter` sits in front of the rasterizer and decides whether two
// consecutive positions describe continuous movement or a jump. Agents get
// relocated, sessions restart, and a new agent can report from the other side
// of the world; interpolating across those gaps would paint long straight
// trails over ground nobody walked.
//
// Key architectural principles:
// 1.  **Per-Axis Threshold**: A move longer than `max_jump` cells on either axis
//     is a teleport. Only its destination is credited. The threshold is capped
//     at `MAX_JUMP_LIMIT`, which bounds the length of any rasterized link.
// 2.  **Explicit Seam**: A continuous link starts on the cell the previous link
//     ended on. `Link::fresh_cells` drops that shared first cell so it is
//     credited once, not once per adjacent pair. A teleport shares nothing with
//     the previous link, so its destination is always fresh.

use crate::core_modules::cell::Cell;
use crate::core_modules::rasterizer::rasterizer::rasterize;
use std::slice;

/// Default teleport threshold, in cells per axis.
pub const MAX_JUMP: u64 = 50;

/// Largest accepted threshold. Larger values are clamped to it.
pub const MAX_JUMP_LIMIT: u64 = 4096;

/// The cells connecting one position to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    /// Continuous movement: the rasterized path, both endpoints included.
    Continuous(Vec<Cell>),
    /// Discontinuous jump: the destination only.
    Teleport(Cell),
}

impl Link {
    /// Every cell of the link, in travel order.
    pub fn cells(&self) -> &[Cell] {
        match self {
            Link::Continuous(path) => path,
            Link::Teleport(destination) => slice::from_ref(destination),
        }
    }

    /// The cells this link adds on top of the previous one.
    pub fn fresh_cells(&self) -> &[Cell] {
        match self {
            Link::Continuous(path) => path.get(1..).unwrap_or_default(),
            Link::Teleport(destination) => slice::from_ref(destination),
        }
    }

    pub fn is_teleport(&self) -> bool {
        matches!(self, Link::Teleport(_))
    }
}

/// Connects `prev` to `next`, suppressing interpolation across jumps longer
/// than `max_jump` on either axis.
pub fn connect(prev: Cell, next: Cell, max_jump: u64) -> Link {
    let max_jump = max_jump.min(MAX_JUMP_LIMIT);
    let (dx, dz) = prev.axis_distance(&next);
    if dx > max_jump || dz > max_jump {
        Link::Teleport(next)
    } else {
        Link::Continuous(rasterize(prev, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_moves_are_rasterized() {
        let link = connect(Cell::new(0, 0), Cell::new(3, 1), MAX_JUMP);
        assert!(!link.is_teleport());
        assert_eq!(link.cells(), rasterize(Cell::new(0, 0), Cell::new(3, 1)).as_slice());
        assert_eq!(
            link.fresh_cells(),
            &[Cell::new(1, 0), Cell::new(2, 1), Cell::new(3, 1)]
        );
    }

    #[test]
    fn threshold_is_inclusive_of_max_jump() {
        let link = connect(Cell::new(0, 0), Cell::new(50, -50), MAX_JUMP);
        assert!(!link.is_teleport());
        assert_eq!(link.cells().len(), 51);
    }

    #[test]
    fn a_long_jump_on_either_axis_is_a_teleport() {
        let link = connect(Cell::new(0, 0), Cell::new(51, 0), MAX_JUMP);
        assert_eq!(link, Link::Teleport(Cell::new(51, 0)));

        let link = connect(Cell::new(10, 10), Cell::new(12, -41), MAX_JUMP);
        assert_eq!(link.cells(), &[Cell::new(12, -41)]);
        assert_eq!(link.fresh_cells(), &[Cell::new(12, -41)]);
    }

    #[test]
    fn standing_still_adds_nothing_fresh() {
        let link = connect(Cell::new(7, 7), Cell::new(7, 7), MAX_JUMP);
        assert_eq!(link.cells(), &[Cell::new(7, 7)]);
        assert!(link.fresh_cells().is_empty());
    }

    #[test]
    fn oversized_threshold_is_clamped() {
        let far = Cell::new(i64::MAX, 0);
        assert_eq!(connect(Cell::new(0, 0), far, u64::MAX), Link::Teleport(far));

        let edge = Cell::new(MAX_JUMP_LIMIT as i64, 0);
        let link = connect(Cell::new(0, 0), edge, u64::MAX);
        assert_eq!(link.cells().len() as u64, MAX_JUMP_LIMIT + 1);
    }

    #[test]
    fn custom_threshold_is_honored() {
        assert!(connect(Cell::new(0, 0), Cell::new(6, 0), 5).is_teleport());
        assert!(!connect(Cell::new(0, 0), Cell::new(5, 0), 5).is_teleport());
    }
}

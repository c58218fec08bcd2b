// THEORY:
// The `rasterizer` turns a pair of grid cells into the chain of cells an agent
// must have crossed to get from one to the other. It is what fills the gaps
// between sparse, irregular pings so the heatmap shows a continuous trail.
//
// Key architectural principles & algorithm steps:
// 1.  **Dominant Axis Stepping**: Whichever of |dx| and |dz| is larger is the
//     dominant axis. Every iteration advances exactly one cell along it, so the
//     path has `max(|dx|, |dz|) + 1` cells and the loop always terminates.
// 2.  **Integer Error Accumulation**: The minor axis advances when the running
//     error drops below zero. The error starts at half a step; all error terms
//     are doubled so the half step stays an integer.
// 3.  **Canonical Direction**: Plain error accumulation breaks ties differently
//     depending on travel direction. The path is always traced from the smaller
//     endpoint (by x, then z) and reversed when the caller asked for the other
//     direction, so `rasterize(a, b)` is exactly the reverse of `rasterize(b, a)`.
// 4.  **Stateless Utility**: No memory between calls; identical input always
//     yields the identical path, which keeps visit counts reproducible.

use crate::core_modules::cell::{Cell, Coord};

pub mod rasterizer {
    use super::*;

    /// Returns the 8-connected cell path from `start` to `end`, both inclusive.
    pub fn rasterize(start: Cell, end: Cell) -> Vec<Cell> {
        if end < start {
            let mut path = trace(end, start);
            path.reverse();
            path
        } else {
            trace(start, end)
        }
    }

    fn trace(start: Cell, end: Cell) -> Vec<Cell> {
        // Widened so that deltas between extreme i64 cells cannot overflow.
        let (x0, z0) = (start.x as i128, start.z as i128);
        let (x1, z1) = (end.x as i128, end.z as i128);
        let dx = (x1 - x0).abs();
        let dz = (z1 - z0).abs();
        let sx: i128 = if x0 > x1 { -1 } else { 1 };
        let sz: i128 = if z0 > z1 { -1 } else { 1 };

        let mut path = Vec::with_capacity(usize::try_from(dx.max(dz) + 1).unwrap_or(0));
        let (mut x, mut z) = (x0, z0);

        if dx > dz {
            let mut err = dx;
            while x != x1 {
                path.push(cell_at(x, z));
                err -= 2 * dz;
                if err < 0 {
                    z += sz;
                    err += 2 * dx;
                }
                x += sx;
            }
        } else {
            let mut err = dz;
            while z != z1 {
                path.push(cell_at(x, z));
                err -= 2 * dx;
                if err < 0 {
                    x += sx;
                    err += 2 * dz;
                }
                z += sz;
            }
        }
        path.push(cell_at(x, z));
        path
    }

    // Every intermediate coordinate lies between two i64 endpoints.
    fn cell_at(x: i128, z: i128) -> Cell {
        Cell::new(x as Coord, z as Coord)
    }
}

// THEORY:
// The `cell` module holds the "dumb" data containers of the engine: the raw
// position sample as it arrives from an agent, the integer grid cell it lands
// in, and the cursor that carries the last known position from one ingestion
// batch to the next.
//
// Key architectural principles:
// 1.  **Floor Quantization**: A continuous position maps to exactly one cell,
//     `(floor(x), floor(z))`. The grid has a fixed resolution of one world unit
//     per cell; there is no origin offset and no scaling.
// 2.  **Validation at the Edge**: Turning a sample into a cell is the only place
//     a malformed reading (NaN, infinity, or a value too large to index) can be
//     detected. Every later stage works with `Cell`s and can assume they are sane.
// 3.  **Pre-floor Cursor**: The cursor remembers the raw, unfloored position. The
//     floor is taken again when the next batch starts, so a restart never loses
//     sub-cell precision.

use crate::error::SampleError;

/// Integer coordinate on the visitation grid.
pub type Coord = i64;
/// Cumulative visit count of a single cell.
pub type HitCount = u64;

// Smallest and first-out-of-range floats for an `i64` index.
const COORD_MIN: f64 = i64::MIN as f64;
const COORD_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// A single square of the visitation grid.
///
/// Ordering is lexicographic on `(x, z)`; the rasterizer and the ledgers rely
/// on that to produce stable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cell {
    pub x: Coord,
    pub z: Coord,
}

impl Cell {
    pub const fn new(x: Coord, z: Coord) -> Self {
        Self { x, z }
    }

    /// Floors a continuous position into its cell.
    pub fn from_position(x: f64, z: f64) -> Result<Self, SampleError> {
        Ok(Self {
            x: floor_axis("x", x)?,
            z: floor_axis("z", z)?,
        })
    }

    /// Per-axis distance to `other`, in cells.
    pub fn axis_distance(&self, other: &Cell) -> (u64, u64) {
        (self.x.abs_diff(other.x), self.z.abs_diff(other.z))
    }
}

impl From<(Coord, Coord)> for Cell {
    fn from((x, z): (Coord, Coord)) -> Self {
        Self { x, z }
    }
}

fn floor_axis(axis: &'static str, value: f64) -> Result<Coord, SampleError> {
    if !value.is_finite() {
        return Err(SampleError::NonFinite { axis, value });
    }
    let floored = value.floor();
    if floored < COORD_MIN || floored >= COORD_LIMIT {
        return Err(SampleError::OutOfRange { axis, value });
    }
    Ok(floored as Coord)
}

/// One position report from an agent, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Identifier of the reporting agent. Recorded for audit only; all agents
    /// share one grid.
    pub agent_id: String,
    pub x: f64,
    pub z: f64,
}

impl RawSample {
    pub fn new(agent_id: impl Into<String>, x: f64, z: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            x,
            z,
        }
    }

    /// The cell this sample lands in, or why it cannot land anywhere.
    pub fn cell(&self) -> Result<Cell, SampleError> {
        Cell::from_position(self.x, self.z)
    }
}

/// The last accepted raw position of a tracking session.
///
/// Only ever built from samples that passed validation (or read back from a
/// store that only holds such samples), so its cell is always representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    pub last_x: f64,
    pub last_z: f64,
}

impl CursorState {
    pub fn new(last_x: f64, last_z: f64) -> Self {
        Self { last_x, last_z }
    }

    /// The floored cell of the cursor position.
    pub fn cell(&self) -> Cell {
        Cell::new(self.last_x.floor() as Coord, self.last_z.floor() as Coord)
    }
}

impl From<&RawSample> for CursorState {
    fn from(sample: &RawSample) -> Self {
        Self::new(sample.x, sample.z)
    }
}

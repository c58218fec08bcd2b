// THEORY:
// This file is the main entry point for the `trailmap` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `trailmap_server`
// HTTP adapter).
//
// The engine turns a stream of 2-D position pings into a visitation heatmap over
// integer grid cells. The primary interface is `TrackingSession` (synchronous,
// single writer) and `SessionHandle` (the same session behind an async actor),
// with the ledger stores in `core_modules` as the storage boundary.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use core_modules::ledger::{LedgerSnapshot, LedgerStats, LedgerStore, MemoryLedger, SharedStore};
pub use core_modules::projector::MapProjection;
pub use core_modules::sqlite_ledger::SqliteLedger;
pub use error::{Result, SampleError, TrailError};
pub use pipeline::{EngineConfig, TrackingSession};
pub use session::SessionHandle;

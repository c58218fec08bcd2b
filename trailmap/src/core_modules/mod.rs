pub mod aggregator;
pub mod cell;
pub mod ledger;
pub mod projector;
pub mod rasterizer;
pub mod sqlite_ledger;
pub mod teleport_filter;

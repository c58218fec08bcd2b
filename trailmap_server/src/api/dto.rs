//! Wire types for the HTTP API.
//!
//! The request body is only split into raw JSON entries up front. Each entry is
//! then decoded on its own, so a single bad ping (a missing field, or a number
//! like `1e400` that does not fit an `f64`) is reported with its index instead
//! of failing the whole batch.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use trailmap::SampleError;
use trailmap::pipeline::{IngestReport, RawSample};
use trailmap::{LedgerStats, MapProjection};

use super::error::ApiError;

/// Agents identify themselves either by name or by a numeric id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AgentId {
    Text(String),
    Number(serde_json::Number),
}

impl AgentId {
    fn into_string(self) -> String {
        match self {
            AgentId::Text(text) => text,
            AgentId::Number(number) => number.to_string(),
        }
    }
}

/// One position report as sent by an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct PingPayload {
    #[serde(alias = "id")]
    pub agent_id: AgentId,
    pub x: f64,
    pub z: f64,
}

impl From<PingPayload> for RawSample {
    fn from(ping: PingPayload) -> Self {
        RawSample::new(ping.agent_id.into_string(), ping.x, ping.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionDto {
    pub index: usize,
    pub reason: String,
}

/// A batch split into decodable samples and entries rejected at the wire.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub samples: Vec<RawSample>,
    /// Position of each entry of `samples` in the submitted array.
    pub origin: Vec<usize>,
    pub rejected: Vec<RejectionDto>,
}

impl DecodedBatch {
    /// Splits a `POST /api/batch` body into its entries and decodes them.
    pub fn from_array_body(body: &[u8]) -> Result<Self, ApiError> {
        let entries: Vec<Box<RawValue>> = serde_json::from_slice(body)
            .map_err(|err| ApiError::BadRequest(format!("expected a JSON array of pings: {err}")))?;
        Ok(Self::decode(&entries))
    }

    /// Decodes a `POST /api/ping` body as a batch of one.
    pub fn from_single_body(body: &[u8]) -> Result<Self, ApiError> {
        let entry: Box<RawValue> = serde_json::from_slice(body)
            .map_err(|err| ApiError::BadRequest(format!("expected a JSON ping: {err}")))?;
        Ok(Self::decode(&[entry]))
    }

    pub fn decode(entries: &[Box<RawValue>]) -> Self {
        let mut batch = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_str::<PingPayload>(entry.get()) {
                Ok(ping) => {
                    batch.samples.push(ping.into());
                    batch.origin.push(index);
                }
                Err(err) => {
                    let reason = SampleError::Malformed(err.to_string());
                    tracing::warn!(index, %reason, "rejecting ping");
                    batch.rejected.push(RejectionDto {
                        index,
                        reason: reason.to_string(),
                    });
                }
            }
        }
        batch
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub accepted: usize,
    pub rejected: Vec<RejectionDto>,
    pub teleports: usize,
    pub cells_credited: u64,
}

impl IngestResponse {
    pub fn empty() -> Self {
        Self {
            status: "empty",
            accepted: 0,
            rejected: Vec::new(),
            teleports: 0,
            cells_credited: 0,
        }
    }

    /// Merges the engine's report with the wire-level rejections, mapping the
    /// engine's sample indices back to positions in the submitted array.
    pub fn from_report(report: IngestReport, batch: DecodedBatch) -> Self {
        let mut rejected = batch.rejected;
        rejected.extend(report.rejected.into_iter().map(|rejection| RejectionDto {
            index: batch.origin.get(rejection.index).copied().unwrap_or(rejection.index),
            reason: rejection.reason.to_string(),
        }));
        rejected.sort_by_key(|rejection| rejection.index);

        Self {
            status: "success",
            accepted: report.accepted,
            rejected,
            teleports: report.teleports,
            cells_credited: report.cells_credited,
        }
    }
}

/// `{"cells": [[x, z, count], ...], "current": [x, z] | null}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDataResponse {
    pub cells: Vec<(i64, i64, u64)>,
    pub current: Option<(i64, i64)>,
}

impl From<MapProjection> for MapDataResponse {
    fn from(projection: MapProjection) -> Self {
        Self {
            cells: projection
                .cells
                .iter()
                .map(|visit| (visit.cell.x, visit.cell.z, visit.hits))
                .collect(),
            current: projection.current.map(|cell| (cell.x, cell.z)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    pub cells: u64,
    pub total_hits: u64,
    pub max_hits: u64,
    pub samples_recorded: u64,
}

impl From<LedgerStats> for StatsResponse {
    fn from(stats: LedgerStats) -> Self {
        Self {
            cells: stats.cells,
            total_hits: stats.total_hits,
            max_hits: stats.max_hits,
            samples_recorded: stats.samples_recorded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trailmap::pipeline::{Cell, CellVisit};

    fn raw(values: &[serde_json::Value]) -> Vec<Box<RawValue>> {
        values
            .iter()
            .map(|value| RawValue::from_string(value.to_string()).unwrap())
            .collect()
    }

    #[test]
    fn numeric_and_text_agent_ids_are_accepted() {
        let batch = DecodedBatch::decode(&raw(&[
            json!({"id": 7, "x": 1.5, "z": -2.0}),
            json!({"agent_id": "turtle-3", "x": 0, "z": 0}),
        ]));
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.samples[0], RawSample::new("7", 1.5, -2.0));
        assert_eq!(batch.samples[1].agent_id, "turtle-3");
    }

    #[test]
    fn undecodable_entries_keep_their_index() {
        let batch = DecodedBatch::decode(&raw(&[
            json!({"id": "a", "x": 1.0, "z": 1.0}),
            json!({"id": "a", "x": 1.0}),
            json!("not a ping"),
            json!({"id": "a", "x": 2.0, "z": 1.0}),
        ]));
        assert_eq!(batch.origin, vec![0, 3]);
        let indices: Vec<_> = batch.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn unrepresentable_numbers_only_reject_their_own_entry() {
        let body = br#"[{"id":1,"x":0.5,"z":0.5},{"id":1,"x":1e400,"z":0.0},{"id":1,"x":2.5,"z":0.5}]"#;
        let batch = DecodedBatch::from_array_body(body).unwrap();
        assert_eq!(batch.origin, vec![0, 2]);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].index, 1);
        assert!(batch.rejected[0].reason.starts_with("malformed sample"));
    }

    #[test]
    fn body_that_is_not_an_array_is_a_bad_request() {
        assert!(matches!(
            DecodedBatch::from_array_body(br#"{"x": 1}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            DecodedBatch::from_array_body(b"[{\"x\": 1"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(DecodedBatch::from_single_body(br#"{"id":1,"x":1e999,"z":0}"#)
            .unwrap()
            .samples
            .is_empty());
    }

    #[test]
    fn engine_rejections_are_mapped_back_to_request_positions() {
        let batch = DecodedBatch {
            samples: Vec::new(),
            origin: vec![0, 2, 5],
            rejected: vec![RejectionDto { index: 1, reason: "missing z".into() }],
        };
        let report = IngestReport {
            accepted: 2,
            rejected: vec![trailmap::pipeline::Rejection {
                index: 1,
                reason: SampleError::OutOfRange { axis: "x", value: 1e30 },
            }],
            teleports: 0,
            cells_credited: 3,
        };
        let response = IngestResponse::from_report(report, batch);
        let indices: Vec<_> = response.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(response.status, "success");
    }

    #[test]
    fn map_payload_uses_triples_and_an_optional_pair() {
        let projection = MapProjection {
            cells: vec![CellVisit { cell: Cell::new(-1, 2), hits: 3 }],
            current: Some(Cell::new(-1, 2)),
        };
        let value = serde_json::to_value(MapDataResponse::from(projection)).unwrap();
        assert_eq!(value, json!({"cells": [[-1, 2, 3]], "current": [-1, 2]}));

        let value = serde_json::to_value(MapDataResponse::from(MapProjection::default())).unwrap();
        assert_eq!(value, json!({"cells": [], "current": null}));
    }
}

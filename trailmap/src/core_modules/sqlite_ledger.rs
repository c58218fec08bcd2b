//! SQLite-backed ledger for sessions that must survive restarts.

use crate::core_modules::aggregator::BatchDelta;
use crate::core_modules::cell::{Cell, CursorState, HitCount};
use crate::core_modules::ledger::{LedgerSnapshot, LedgerStats, LedgerStore};
use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

/// Durable ledger stored in a single SQLite database.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    retain_history: bool,
}

impl SqliteLedger {
    /// Opens (or creates) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, retain_history: bool) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        // WAL lets map-data reads proceed while a batch is being written.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        let ledger = Self {
            conn: Mutex::new(conn),
            retain_history,
        };
        ledger.init_schema()?;
        debug!(path = %path.as_ref().display(), "opened sqlite ledger");
        Ok(ledger)
    }

    /// Creates a throwaway database that lives as long as this value.
    pub fn in_memory(retain_history: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Mutex::new(conn),
            retain_history,
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS heatmap_cache (
                x INTEGER NOT NULL,
                z INTEGER NOT NULL,
                hit_count INTEGER NOT NULL,
                PRIMARY KEY (x, z)
            ) WITHOUT ROWID;

            CREATE TABLE IF NOT EXISTS cursor (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                last_x REAL NOT NULL,
                last_z REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pings (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                x REAL NOT NULL,
                z REAL NOT NULL,
                recorded_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );",
        )?;

        Ok(())
    }
}

fn read_cursor(conn: &Connection) -> Result<Option<CursorState>> {
    let cursor = conn
        .query_row("SELECT last_x, last_z FROM cursor WHERE slot = 0", [], |row| {
            Ok(CursorState::new(row.get(0)?, row.get(1)?))
        })
        .optional()?;
    Ok(cursor)
}

impl LedgerStore for SqliteLedger {
    fn cursor(&self) -> Result<Option<CursorState>> {
        let conn = self.conn.lock();
        read_cursor(&conn)
    }

    fn commit(&self, delta: &BatchDelta) -> Result<()> {
        let Some(cursor) = delta.cursor else {
            return Ok(());
        };
        let mut conn = self.conn.lock();
        // Dropping the transaction on any early return rolls the batch back.
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare_cached(
                "INSERT INTO heatmap_cache (x, z, hit_count) VALUES (?1, ?2, ?3)
                 ON CONFLICT(x, z) DO UPDATE SET hit_count = hit_count + excluded.hit_count",
            )?;
            for (cell, hits) in &delta.deltas {
                let hits = i64::try_from(*hits).unwrap_or(i64::MAX);
                upsert.execute(params![cell.x, cell.z, hits])?;
            }

            tx.execute(
                "INSERT INTO cursor (slot, last_x, last_z) VALUES (0, ?1, ?2)
                 ON CONFLICT(slot) DO UPDATE SET last_x = excluded.last_x, last_z = excluded.last_z",
                params![cursor.last_x, cursor.last_z],
            )?;

            if self.retain_history {
                let mut insert =
                    tx.prepare_cached("INSERT INTO pings (agent_id, x, z) VALUES (?1, ?2, ?3)")?;
                for sample in &delta.samples {
                    insert.execute(params![sample.agent_id, sample.x, sample.z])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn snapshot(&self) -> Result<LedgerSnapshot> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let cells = {
            let mut stmt = tx.prepare_cached("SELECT x, z, hit_count FROM heatmap_cache ORDER BY x, z")?;
            let rows = stmt.query_map([], |row| {
                let hits: i64 = row.get(2)?;
                Ok((Cell::new(row.get(0)?, row.get(1)?), hits.max(0) as HitCount))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        let cursor = read_cursor(&tx)?;
        tx.finish()?;
        Ok(LedgerSnapshot { cells, cursor })
    }

    fn reset(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM heatmap_cache;
             DELETE FROM cursor;
             DELETE FROM pings;",
        )?;
        tx.commit()?;
        Ok(())
    }

    fn sample_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pings", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn stats(&self) -> Result<LedgerStats> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let (cells, total_hits, max_hits): (i64, i64, i64) = tx.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hit_count), 0), COALESCE(MAX(hit_count), 0)
             FROM heatmap_cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let samples: i64 = tx.query_row("SELECT COUNT(*) FROM pings", [], |row| row.get(0))?;
        tx.finish()?;
        Ok(LedgerStats {
            cells: cells.max(0) as u64,
            total_hits: total_hits.max(0) as HitCount,
            max_hits: max_hits.max(0) as HitCount,
            samples_recorded: samples.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::aggregator::Aggregator;
    use crate::core_modules::cell::RawSample;
    use crate::core_modules::ledger::MemoryLedger;
    use tempfile::tempdir;

    fn delta_for(points: &[(f64, f64)], cursor: Option<&CursorState>) -> BatchDelta {
        let samples: Vec<_> = points.iter().map(|&(x, z)| RawSample::new("t", x, z)).collect();
        Aggregator::default().aggregate(&samples, cursor)
    }

    #[test]
    fn fresh_database_is_empty() {
        let ledger = SqliteLedger::in_memory(true).unwrap();
        assert_eq!(ledger.snapshot().unwrap(), LedgerSnapshot::default());
        assert_eq!(ledger.cursor().unwrap(), None);
    }

    #[test]
    fn upserts_increment_existing_cells() {
        let ledger = SqliteLedger::in_memory(true).unwrap();
        ledger.commit(&delta_for(&[(0.0, 0.0), (2.0, 0.0)], None)).unwrap();
        let cursor = ledger.cursor().unwrap();
        ledger.commit(&delta_for(&[(0.0, 0.0)], cursor.as_ref())).unwrap();

        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(
            snapshot.cells,
            vec![(Cell::new(0, 0), 2), (Cell::new(1, 0), 2), (Cell::new(2, 0), 1)]
        );
        assert_eq!(snapshot.cursor, Some(CursorState::new(0.0, 0.0)));
        assert_eq!(ledger.sample_count().unwrap(), 3);
    }

    #[test]
    fn agrees_with_the_memory_ledger() {
        let sqlite = SqliteLedger::in_memory(false).unwrap();
        let memory = MemoryLedger::new(false);
        let batches: [&[(f64, f64)]; 3] = [
            &[(0.5, 0.5), (6.2, -3.1), (-4.0, 2.0)],
            &[(-4.5, 9.9), (200.0, 200.0)],
            &[(201.0, 199.0), (190.3, 190.7)],
        ];
        for points in batches {
            let cursor = sqlite.cursor().unwrap();
            let delta = delta_for(points, cursor.as_ref());
            sqlite.commit(&delta).unwrap();
            memory.commit(&delta).unwrap();
        }
        assert_eq!(sqlite.snapshot().unwrap(), memory.snapshot().unwrap());
        assert_eq!(sqlite.stats().unwrap(), memory.stats().unwrap());
    }

    #[test]
    fn counts_and_cursor_survive_a_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.db");

        let before = {
            let ledger = SqliteLedger::open(&path, true).unwrap();
            ledger.commit(&delta_for(&[(0.2, 0.2), (3.4, 1.1)], None)).unwrap();
            ledger.snapshot().unwrap()
        };

        let reopened = SqliteLedger::open(&path, true).unwrap();
        assert_eq!(reopened.snapshot().unwrap(), before);
        assert_eq!(reopened.cursor().unwrap(), Some(CursorState::new(3.4, 1.1)));
        assert_eq!(reopened.sample_count().unwrap(), 2);
    }

    #[test]
    fn failed_commit_leaves_previous_state() {
        let ledger = SqliteLedger::in_memory(true).unwrap();
        ledger.commit(&delta_for(&[(0.0, 0.0), (1.0, 0.0)], None)).unwrap();
        let before = ledger.snapshot().unwrap();

        // Make the cursor write fail halfway through the next batch.
        ledger.conn.lock().execute_batch("DROP TABLE cursor;").unwrap();
        let cursor = before.cursor;
        let err = ledger.commit(&delta_for(&[(4.0, 0.0)], cursor.as_ref()));
        assert!(err.is_err());

        let cells = ledger
            .conn
            .lock()
            .prepare("SELECT x, z, hit_count FROM heatmap_cache ORDER BY x, z")
            .unwrap()
            .query_map([], |row| Ok((Cell::new(row.get(0)?, row.get(1)?), row.get::<_, i64>(2)? as u64)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(cells, before.cells);
        assert_eq!(ledger.sample_count().unwrap(), 2);
    }

    #[test]
    fn stats_come_from_one_read() {
        let ledger = SqliteLedger::in_memory(true).unwrap();
        assert_eq!(ledger.stats().unwrap(), LedgerStats::default());

        ledger.commit(&delta_for(&[(0.0, 0.0), (3.0, 0.0), (1.0, 0.0)], None)).unwrap();
        let stats = ledger.stats().unwrap();
        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(stats.cells, snapshot.cells.len() as u64);
        assert_eq!(stats.total_hits, snapshot.cells.iter().map(|(_, hits)| hits).sum::<u64>());
        assert_eq!(stats.max_hits, 2);
        assert_eq!(stats.samples_recorded, 3);
    }

    #[test]
    fn reset_wipes_every_table() {
        let ledger = SqliteLedger::in_memory(true).unwrap();
        ledger.commit(&delta_for(&[(0.0, 0.0), (9.0, 9.0)], None)).unwrap();
        ledger.reset().unwrap();
        assert_eq!(ledger.snapshot().unwrap(), LedgerSnapshot::default());
        assert_eq!(ledger.sample_count().unwrap(), 0);
    }
}

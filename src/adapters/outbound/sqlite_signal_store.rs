//! SQLite Signal Store
//!
//! Implements SignalStore on top of the SQLite shard tables
//! (`blue_shard`, `wifi_shard`, `cell_shard`). Rows are written by the
//! ingestion pipeline; this adapter only reads them.

use crate::domain::entities::{CellId, MacAddr, SignalKey, SignalRecord};
use crate::domain::errors::LookupError;
use crate::domain::ports::SignalStore;
use crate::domain::value_objects::{CountryCode, SignalKind};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Shard tables as the reader expects them.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS blue_shard (
    mac TEXT PRIMARY KEY,
    region TEXT,
    samples INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    modified INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS wifi_shard (
    mac TEXT PRIMARY KEY,
    region TEXT,
    samples INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    modified INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS cell_shard (
    radio INTEGER NOT NULL,
    mcc INTEGER NOT NULL,
    mnc INTEGER NOT NULL,
    lac INTEGER NOT NULL,
    cid INTEGER NOT NULL,
    region TEXT,
    samples INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL,
    modified INTEGER NOT NULL,
    PRIMARY KEY (radio, mcc, mnc, lac, cid)
);
";

const MAC_QUERY_BLUE: &str =
    "SELECT region, samples, created, modified FROM blue_shard WHERE mac = ?1";
const MAC_QUERY_WIFI: &str =
    "SELECT region, samples, created, modified FROM wifi_shard WHERE mac = ?1";
const CELL_QUERY: &str = "SELECT region, samples, created, modified FROM cell_shard
     WHERE radio = ?1 AND mcc = ?2 AND mnc = ?3 AND lac = ?4 AND cid = ?5";

/// Idle connections kept per store.
const MAX_IDLE_CONNECTIONS: usize = 8;

static NEXT_MEMORY_DB: AtomicUsize = AtomicUsize::new(0);

/// Connections to one database, opened on demand and reused.
///
/// Each shard read checks out its own connection, so concurrent reads never
/// queue behind each other and a read abandoned on timeout only ties up the
/// connection it holds.
struct ConnectionPool {
    uri: String,
    idle: Mutex<Vec<Connection>>,
}

impl ConnectionPool {
    fn new(uri: String) -> Self {
        Self {
            uri,
            idle: Mutex::new(Vec::new()),
        }
    }

    fn checkout(&self) -> rusqlite::Result<Connection> {
        if let Some(conn) = self.idle.lock().pop() {
            return Ok(conn);
        }
        Connection::open(&self.uri)
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
    }

    fn with_conn<T, F>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.checkout()?;
        let result = f(&conn);
        self.checkin(conn);
        result
    }

    fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

/// SQLite-backed signal store.
///
/// Every lookup runs on the blocking pool with a connection of its own.
pub struct SqliteSignalStore {
    pool: Arc<ConnectionPool>,
    /// Keeps a shared in-memory database alive between checkouts
    _anchor: Option<Mutex<Connection>>,
}

impl SqliteSignalStore {
    /// Open a shard database file.
    pub fn open(db_path: &str) -> Result<Self> {
        let pool = ConnectionPool::new(db_path.to_string());
        let conn = pool.checkout()?;
        pool.checkin(conn);
        Ok(Self {
            pool: Arc::new(pool),
            _anchor: None,
        })
    }

    /// Open a private in-memory database with the shard schema.
    pub fn open_in_memory() -> Result<Self> {
        let id = NEXT_MEMORY_DB.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:signal-shards-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            id
        );
        let pool = ConnectionPool::new(uri);
        let anchor = pool.checkout()?;

        let store = Self {
            pool: Arc::new(pool),
            _anchor: Some(Mutex::new(anchor)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the shard tables if they are missing.
    pub fn ensure_schema(&self) -> Result<()> {
        self.with_conn(|c| c.execute_batch(SCHEMA))
    }

    /// Run a closure against a pooled connection (for seeding data).
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        Ok(self.pool.with_conn(f)?)
    }

    /// Read the records for `keys` from the shard of `kind`.
    fn load_records(
        conn: &Connection,
        kind: SignalKind,
        keys: &[SignalKey],
    ) -> rusqlite::Result<Vec<SignalRecord>> {
        let mut records = Vec::with_capacity(keys.len());

        for key in keys {
            let row = match (kind, key) {
                (SignalKind::Bluetooth, SignalKey::Mac(mac)) => {
                    Self::query_mac(conn, MAC_QUERY_BLUE, mac)?
                }
                (SignalKind::Wifi, SignalKey::Mac(mac)) => {
                    Self::query_mac(conn, MAC_QUERY_WIFI, mac)?
                }
                (SignalKind::Cellular, SignalKey::Cell(cell)) => Self::query_cell(conn, cell)?,
                _ => None,
            };
            if let Some(row) = row {
                records.push(row.into_record(*key));
            }
        }

        Ok(records)
    }

    fn query_mac(
        conn: &Connection,
        sql: &str,
        mac: &MacAddr,
    ) -> rusqlite::Result<Option<ShardRow>> {
        conn.prepare_cached(sql)?
            .query_row(params![mac.to_string()], ShardRow::from_row)
            .optional()
    }

    fn query_cell(conn: &Connection, cell: &CellId) -> rusqlite::Result<Option<ShardRow>> {
        conn.prepare_cached(CELL_QUERY)?
            .query_row(
                params![
                    cell.radio.code(),
                    cell.mcc as i64,
                    cell.mnc as i64,
                    cell.lac as i64,
                    cell.cid as i64
                ],
                ShardRow::from_row,
            )
            .optional()
    }
}

/// Columns shared by every shard table.
struct ShardRow {
    region: Option<String>,
    samples: i64,
    created: i64,
    modified: i64,
}

impl ShardRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            region: row.get(0)?,
            samples: row.get(1)?,
            created: row.get(2)?,
            modified: row.get(3)?,
        })
    }

    /// Convert to a domain record. Unparsable regions read as unresolved.
    fn into_record(self, key: SignalKey) -> SignalRecord {
        SignalRecord {
            key,
            region: self.region.as_deref().and_then(CountryCode::parse),
            samples: self.samples.max(0) as u64,
            created: epoch_to_time(self.created),
            modified: epoch_to_time(self.modified),
        }
    }
}

fn epoch_to_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn lookup(
        &self,
        kind: SignalKind,
        keys: &[SignalKey],
    ) -> Result<Vec<SignalRecord>, LookupError> {
        let pool = self.pool.clone();
        let keys = keys.to_vec();

        let read = tokio::task::spawn_blocking(move || {
            pool.with_conn(|conn| Self::load_records(conn, kind, &keys))
        });

        match read.await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) => {
                tracing::error!("error reading {} shard: {:?}", kind, e);
                Err(LookupError::Unavailable(e.to_string()))
            }
            Err(e) => {
                tracing::error!("spawn_blocking error: {:?}", e);
                Err(LookupError::Unavailable(e.to_string()))
            }
        }
    }
}

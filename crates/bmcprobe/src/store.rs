//! Inventory persistence
//!
//! Explored systems are kept as server records keyed by an integer id. The
//! [`InventoryStore`] trait is the whole contract the rest of the crate relies
//! on; [`SqliteStore`] implements it over an explicitly opened connection that
//! lives as long as the store value.

use std::collections::HashSet;
use std::path::Path;

use bmcprobe_core::attributes::Attributes;
use bmcprobe_core::model::{Inventory, System};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS servers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tag         TEXT NOT NULL UNIQUE,
    system_id   TEXT NOT NULL,
    memory_gib  REAL,
    attributes  TEXT NOT NULL
);
";

/// A stored server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: i64,
    /// Service tag, unique across the store.
    pub tag: String,
    pub system_id: String,
    pub memory_gib: Option<f64>,
    pub attributes: Attributes,
}

/// Server fields supplied on create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewServer {
    pub tag: String,
    pub system_id: String,
    pub memory_gib: Option<f64>,
    pub attributes: Attributes,
}

impl From<&System> for NewServer {
    fn from(system: &System) -> Self {
        Self {
            tag: system.tag().to_string(),
            system_id: system.id.clone(),
            memory_gib: system.memory_gib,
            attributes: system.attributes.clone(),
        }
    }
}

/// Record-oriented persistence for server inventory.
///
/// Looking up, updating or deleting an unknown id is not an error: reads
/// return `None` and writes return `false`.
pub trait InventoryStore {
    fn create(&self, server: &NewServer) -> Result<i64, Error>;
    fn read(&self, id: i64) -> Result<Option<ServerRecord>, Error>;
    fn find_by_tag(&self, tag: &str) -> Result<Option<ServerRecord>, Error>;
    fn update(&self, id: i64, server: &NewServer) -> Result<bool, Error>;
    fn delete(&self, id: i64) -> Result<bool, Error>;
    fn list(&self) -> Result<Vec<ServerRecord>, Error>;
}

/// Row as read from SQLite, before decoding the attributes.
type RawRow = (i64, String, String, Option<f64>, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode((id, tag, system_id, memory_gib, attributes): RawRow) -> Result<ServerRecord, Error> {
    Ok(ServerRecord {
        id,
        tag,
        system_id,
        memory_gib,
        attributes: serde_json::from_str(&attributes)?,
    })
}

fn is_conflict(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

const SELECT: &str = "SELECT id, tag, system_id, memory_gib, attributes FROM servers";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        log::debug!("Opening inventory store {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Run `f` inside one transaction, committed only when `f` succeeds.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Close the connection, reporting any error the drop would swallow.
    pub fn close(self) -> Result<(), Error> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}

fn conflict_or(err: rusqlite::Error, tag: &str) -> Error {
    if is_conflict(&err) {
        Error::Conflict(tag.to_string())
    } else {
        err.into()
    }
}

impl InventoryStore for Connection {
    fn create(&self, server: &NewServer) -> Result<i64, Error> {
        let attributes = serde_json::to_string(&server.attributes)?;
        self.execute(
            "INSERT INTO servers (tag, system_id, memory_gib, attributes) VALUES (?1, ?2, ?3, ?4)",
            params![server.tag, server.system_id, server.memory_gib, attributes],
        )
        .map_err(|err| conflict_or(err, &server.tag))?;
        Ok(self.last_insert_rowid())
    }

    fn read(&self, id: i64) -> Result<Option<ServerRecord>, Error> {
        self.query_row(&format!("{SELECT} WHERE id = ?1"), params![id], raw_row)
            .optional()?
            .map(decode)
            .transpose()
    }

    fn find_by_tag(&self, tag: &str) -> Result<Option<ServerRecord>, Error> {
        self.query_row(&format!("{SELECT} WHERE tag = ?1"), params![tag], raw_row)
            .optional()?
            .map(decode)
            .transpose()
    }

    fn update(&self, id: i64, server: &NewServer) -> Result<bool, Error> {
        let attributes = serde_json::to_string(&server.attributes)?;
        let changed = self
            .execute(
                "UPDATE servers SET tag = ?1, system_id = ?2, memory_gib = ?3, attributes = ?4 WHERE id = ?5",
                params![server.tag, server.system_id, server.memory_gib, attributes, id],
            )
            .map_err(|err| conflict_or(err, &server.tag))?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> Result<bool, Error> {
        let changed = self.execute("DELETE FROM servers WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn list(&self) -> Result<Vec<ServerRecord>, Error> {
        let mut stmt = self.prepare(&format!("{SELECT} ORDER BY id"))?;
        let rows = stmt
            .query_map([], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode).collect()
    }
}

impl InventoryStore for SqliteStore {
    fn create(&self, server: &NewServer) -> Result<i64, Error> {
        self.conn.create(server)
    }

    fn read(&self, id: i64) -> Result<Option<ServerRecord>, Error> {
        self.conn.read(id)
    }

    fn find_by_tag(&self, tag: &str) -> Result<Option<ServerRecord>, Error> {
        self.conn.find_by_tag(tag)
    }

    fn update(&self, id: i64, server: &NewServer) -> Result<bool, Error> {
        self.conn.update(id, server)
    }

    fn delete(&self, id: i64) -> Result<bool, Error> {
        self.conn.delete(id)
    }

    fn list(&self) -> Result<Vec<ServerRecord>, Error> {
        self.conn.list()
    }
}

/// Outcome of [`save_inventory`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub created: usize,
    pub updated: usize,
    /// Systems that repeated a tag already written by the same save. The
    /// later system replaced the earlier one.
    pub duplicates: usize,
}

/// Store one record per explored system, updating records whose tag is known.
///
/// All writes happen in one transaction: on error nothing is saved.
pub fn save_inventory(
    store: &mut SqliteStore,
    inventory: &Inventory,
) -> Result<SaveSummary, Error> {
    store.transaction(|conn| upsert_systems(conn, inventory))
}

fn upsert_systems(
    store: &impl InventoryStore,
    inventory: &Inventory,
) -> Result<SaveSummary, Error> {
    let mut summary = SaveSummary::default();
    let mut written: HashSet<String> = HashSet::new();

    for system in inventory.systems.values() {
        let server = NewServer::from(system);
        let repeated = !written.insert(server.tag.clone());

        match store.find_by_tag(&server.tag)? {
            Some(existing) => {
                store.update(existing.id, &server)?;
                if repeated {
                    log::warn!(
                        "Systems {} and {} share tag {}, keeping {}",
                        existing.system_id,
                        server.system_id,
                        server.tag,
                        server.system_id
                    );
                    summary.duplicates += 1;
                } else {
                    log::debug!("Updated server {} ({})", existing.id, server.tag);
                    summary.updated += 1;
                }
            }
            None => {
                let id = store.create(&server)?;
                log::debug!("Created server {} ({})", id, server.tag);
                summary.created += 1;
            }
        }
    }

    Ok(summary)
}

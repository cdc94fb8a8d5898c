//! Persistent storage for sync bookkeeping (resources and configs).
//!
//! Uses a separate SQLite file so sync state is isolated from the document
//! database; rows survive restarts so dirty flags are never lost to a
//! crash. Hard deletes happen only through the purge calls used by
//! logout/reset.

use crate::error::{SyncError, SyncResult};
use crate::resource::{Config, Resource, SyncMode};
use courier_types::{AccountId, DocumentId, ResourceGroupId, Timestamp};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Persistent store for resources and configs backed by SQLite.
pub struct ResourceStore {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceStore {
    /// Opens (or creates) a store at the given path.
    pub fn new(path: &Path) -> SyncResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open resource store: {e}")))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SyncError::Storage(format!("failed to open in-memory resource store: {e}"))
        })?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                resource_group_id TEXT NOT NULL,
                version TEXT NOT NULL,
                name TEXT NOT NULL,
                created_by TEXT NOT NULL,
                last_edited INTEGER NOT NULL,
                last_edited_by TEXT NOT NULL,
                removed INTEGER NOT NULL,
                enc_content TEXT NOT NULL,
                dirty INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_resources_group
                ON resources(resource_group_id);
            CREATE INDEX IF NOT EXISTS idx_resources_dirty
                ON resources(dirty);

            CREATE TABLE IF NOT EXISTS configs (
                resource_group_id TEXT PRIMARY KEY,
                sync_mode TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init sync schema: {e}")))?;
        Ok(())
    }

    // ── Resources ────────────────────────────────────────────────

    /// Inserts a new resource row. Fails on a duplicate id.
    pub fn insert_resource(&self, resource: &Resource) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO resources
                (id, kind, resource_group_id, version, name, created_by,
                 last_edited, last_edited_by, removed, enc_content, dirty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            resource_params(resource),
        )
        .map_err(|e| SyncError::Storage(format!("failed to insert resource: {e}")))?;
        Ok(())
    }

    /// Writes a resource row, replacing any existing row with the same id.
    pub fn update_resource(&self, resource: &Resource) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO resources
                (id, kind, resource_group_id, version, name, created_by,
                 last_edited, last_edited_by, removed, enc_content, dirty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            resource_params(resource),
        )
        .map_err(|e| SyncError::Storage(format!("failed to update resource: {e}")))?;
        Ok(())
    }

    /// Loads the resource tracking the given document id.
    pub fn get_by_doc_id(&self, id: &DocumentId) -> SyncResult<Option<Resource>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ?1"
            ))
            .map_err(|e| SyncError::Storage(format!("failed to prepare resource query: {e}")))?;

        let mut rows = stmt
            .query_map(params![id.as_str()], map_resource_row)
            .map_err(|e| SyncError::Storage(format!("failed to query resource: {e}")))?;

        match rows.next() {
            Some(row) => Ok(Some(parse_resource(row.map_err(|e| {
                SyncError::Storage(format!("failed to read resource row: {e}"))
            })?)?)),
            None => Ok(None),
        }
    }

    /// Loads all resources, optionally scoped to one group.
    pub fn all_resources(&self, group: Option<&ResourceGroupId>) -> SyncResult<Vec<Resource>> {
        match group {
            Some(g) => self.query_resources(
                &format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE resource_group_id = ?1"),
                params![g.as_str()],
            ),
            None => self.query_resources(
                &format!("SELECT {RESOURCE_COLUMNS} FROM resources"),
                params![],
            ),
        }
    }

    /// Loads all dirty resources, optionally scoped to one group.
    pub fn find_dirty(&self, group: Option<&ResourceGroupId>) -> SyncResult<Vec<Resource>> {
        match group {
            Some(g) => self.query_resources(
                &format!(
                    "SELECT {RESOURCE_COLUMNS} FROM resources
                     WHERE dirty = 1 AND resource_group_id = ?1"
                ),
                params![g.as_str()],
            ),
            None => self.query_resources(
                &format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE dirty = 1"),
                params![],
            ),
        }
    }

    /// Hard-deletes one resource row. Used only by local reset.
    pub fn remove_resource(&self, id: &DocumentId) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM resources WHERE id = ?1", params![id.as_str()])
            .map_err(|e| SyncError::Storage(format!("failed to remove resource: {e}")))?;
        Ok(())
    }

    fn query_resources(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> SyncResult<Vec<Resource>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SyncError::Storage(format!("failed to prepare resource query: {e}")))?;
        let rows = stmt
            .query_map(params, map_resource_row)
            .map_err(|e| SyncError::Storage(format!("failed to query resources: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let raw =
                row.map_err(|e| SyncError::Storage(format!("failed to read resource row: {e}")))?;
            result.push(parse_resource(raw)?);
        }
        Ok(result)
    }

    // ── Configs ──────────────────────────────────────────────────

    /// Loads the config for a group, if one exists.
    pub fn get_config(&self, group: &ResourceGroupId) -> SyncResult<Option<Config>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT resource_group_id, sync_mode FROM configs WHERE resource_group_id = ?1")
            .map_err(|e| SyncError::Storage(format!("failed to prepare config query: {e}")))?;

        let mut rows = stmt
            .query_map(params![group.as_str()], |row| {
                let gid: String = row.get(0)?;
                let mode: String = row.get(1)?;
                Ok((gid, mode))
            })
            .map_err(|e| SyncError::Storage(format!("failed to query config: {e}")))?;

        match rows.next() {
            Some(row) => {
                let (gid, mode) = row
                    .map_err(|e| SyncError::Storage(format!("failed to read config row: {e}")))?;
                Ok(Some(parse_config(gid, mode)?))
            }
            None => Ok(None),
        }
    }

    /// Writes a config row, replacing any existing row for the group.
    pub fn upsert_config(&self, config: &Config) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO configs (resource_group_id, sync_mode) VALUES (?1, ?2)",
            params![config.resource_group_id.as_str(), config.sync_mode.as_str()],
        )
        .map_err(|e| SyncError::Storage(format!("failed to upsert config: {e}")))?;
        Ok(())
    }

    /// Loads every config.
    pub fn all_configs(&self) -> SyncResult<Vec<Config>> {
        self.query_configs("SELECT resource_group_id, sync_mode FROM configs")
    }

    /// Loads configs whose groups sit out the periodic full pull.
    pub fn inactive_configs(&self) -> SyncResult<Vec<Config>> {
        self.query_configs(
            "SELECT resource_group_id, sync_mode FROM configs WHERE sync_mode = 'off'",
        )
    }

    fn query_configs(&self, sql: &str) -> SyncResult<Vec<Config>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SyncError::Storage(format!("failed to prepare config query: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let gid: String = row.get(0)?;
                let mode: String = row.get(1)?;
                Ok((gid, mode))
            })
            .map_err(|e| SyncError::Storage(format!("failed to query configs: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (gid, mode) =
                row.map_err(|e| SyncError::Storage(format!("failed to read config row: {e}")))?;
            result.push(parse_config(gid, mode)?);
        }
        Ok(result)
    }

    // ── Reset ────────────────────────────────────────────────────

    /// Hard-deletes every resource and config row. The one exception to
    /// the no-hard-delete rule; used only on logout/reset.
    pub fn purge(&self) -> SyncResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("DELETE FROM resources; DELETE FROM configs;")
            .map_err(|e| SyncError::Storage(format!("failed to purge sync state: {e}")))?;
        Ok(())
    }
}

const RESOURCE_COLUMNS: &str = "id, kind, resource_group_id, version, name, created_by, \
     last_edited, last_edited_by, removed, enc_content, dirty";

type RawResource = (
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    bool,
    String,
    bool,
);

fn resource_params(r: &Resource) -> impl rusqlite::Params + '_ {
    (
        r.id.as_str(),
        r.kind.as_str(),
        r.resource_group_id.as_str(),
        r.version.as_str(),
        r.name.as_str(),
        r.created_by.as_str(),
        r.last_edited.as_millis() as i64,
        r.last_edited_by.as_str(),
        r.removed,
        r.enc_content.as_str(),
        r.dirty,
    )
}

fn map_resource_row(row: &Row<'_>) -> rusqlite::Result<RawResource> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn parse_resource(raw: RawResource) -> SyncResult<Resource> {
    let (
        id,
        kind,
        resource_group_id,
        version,
        name,
        created_by,
        last_edited,
        last_edited_by,
        removed,
        enc_content,
        dirty,
    ) = raw;

    let kind = kind
        .parse()
        .map_err(|e| SyncError::Storage(format!("invalid kind in resource row: {e}")))?;

    Ok(Resource {
        id: DocumentId::new(id),
        kind,
        resource_group_id: ResourceGroupId::new(resource_group_id),
        version,
        name,
        created_by: AccountId::new(created_by),
        last_edited: Timestamp::from_millis(last_edited as u64),
        last_edited_by: AccountId::new(last_edited_by),
        removed,
        enc_content,
        dirty,
    })
}

fn parse_config(gid: String, mode: String) -> SyncResult<Config> {
    let sync_mode: SyncMode = mode
        .parse()
        .map_err(|e| SyncError::Storage(format!("invalid config row: {e}")))?;
    Ok(Config {
        resource_group_id: ResourceGroupId::new(gid),
        sync_mode,
    })
}

//! # Option Store
//!
//! Persistence for the raw product → item table. Plays the role of the host
//! platform's settings store: one named option holding one map, loaded and
//! saved whole.
//!
//! The table is kept raw (string values, possibly blank, possibly pointing at
//! deleted products). Cleaning it up is the registry's job.

use crate::error::{GatewayError, GatewayResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Raw persisted table: product id → item identifier
pub type ItemTable = BTreeMap<u64, String>;

/// Backing store for the item table.
pub trait OptionStore: Send + Sync {
    /// Load the whole table. A missing option is an empty table.
    fn load(&self) -> GatewayResult<ItemTable>;

    /// Replace the whole table.
    fn save(&self, table: &ItemTable) -> GatewayResult<()>;
}

/// In-memory store, for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    table: Mutex<ItemTable>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing table
    pub fn with_table(table: ItemTable) -> Self {
        Self {
            table: Mutex::new(table),
        }
    }
}

impl OptionStore for MemoryOptionStore {
    fn load(&self) -> GatewayResult<ItemTable> {
        self.table
            .lock()
            .map(|t| t.clone())
            .map_err(|e| GatewayError::Storage(format!("item table lock poisoned: {}", e)))
    }

    fn save(&self, table: &ItemTable) -> GatewayResult<()> {
        let mut guard = self
            .table
            .lock()
            .map_err(|e| GatewayError::Storage(format!("item table lock poisoned: {}", e)))?;
        *guard = table.clone();
        Ok(())
    }
}

/// JSON file store (one file per option)
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> GatewayResult<std::sync::MutexGuard<'_, ()>> {
        self.io
            .lock()
            .map_err(|e| GatewayError::Storage(format!("store lock poisoned: {}", e)))
    }
}

impl OptionStore for JsonFileStore {
    fn load(&self) -> GatewayResult<ItemTable> {
        let _guard = self.lock()?;

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "item store not found, starting empty");
                return Ok(ItemTable::new());
            }
            Err(e) => {
                return Err(GatewayError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(ItemTable::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, table: &ItemTable) -> GatewayResult<()> {
        let _guard = self.lock()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GatewayError::Storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let body = serde_json::to_string_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                GatewayError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })
    }
}

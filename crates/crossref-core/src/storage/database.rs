//! SQLite database handle
//!
//! Owns the connection and hands out IMMEDIATE write transactions, so a
//! read-check-write sequence holds the write lock from its first read.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::config::Config;
use crate::error::RegistryResult;
use crate::storage::schema::{init_schema, needs_init};

/// The document store backing the registry
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database configured in `config`
    pub fn open(config: &Config) -> RegistryResult<Self> {
        Self::open_path(&config.database_path())
    }

    /// Open or create the database at `path`
    pub fn open_path(path: &Path) -> RegistryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            debug!("Initializing schema at {:?}", path);
            init_schema(&conn)?;
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> RegistryResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction that takes the write lock immediately
    pub fn write_transaction(&mut self) -> RegistryResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Location of the database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size of the database file in bytes
    pub fn size_bytes(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

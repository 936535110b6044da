//! Concurrency-controlled service layer over the shared store handle.
//!
//! One coarse reader/writer gate guards every operation on both entity
//! types: reads (get, list) take it shared, writes (add, update, delete)
//! take it exclusive, and the guard is held for the whole operation —
//! relation lookups and full list iteration included. Reads interleave with
//! reads but never with a write; writes are serialized against everything.
//! That trades throughput for simplicity, which suits a low-traffic
//! administrative service; shard the gate only if write contention ever
//! shows up in profiles.

pub mod error;
mod service_event;
mod service_user;

pub use error::ServiceError;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use muster_db::Database;

/// Stateless per call; the only persistent state is the store handle and
/// the gate guarding it.
pub struct Backend {
    db: Database,
    gate: RwLock<()>,
}

impl Backend {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            gate: RwLock::new(()),
        }
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Shared gate for read operations. A poisoned gate is still usable:
    /// the guarded value is a unit, so there is no state to have corrupted.
    pub(crate) fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive gate for write operations.
    pub(crate) fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }
}

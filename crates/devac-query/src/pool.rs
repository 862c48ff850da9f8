//! A small fixed-size connection pool, round-robin over a `Vec<Mutex<_>>`
//! the way the teacher's own connection-pooling code cycles over pooled
//! backends rather than handing out exclusive ownership per caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::QueryError;

pub struct ConnectionPool {
    slots: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ConnectionPool {
    /// Opens `size` in-memory connections, each with `cache_size` derived
    /// from `memory_limit_kb` (spec §4.2: "a configurable memory limit").
    pub fn open(size: usize, memory_limit_kb: i64) -> Result<Self, QueryError> {
        let mut slots = Vec::with_capacity(size.max(1));
        for _ in 0..size.max(1) {
            let conn = Connection::open_in_memory()?;
            conn.pragma_update(None, "cache_size", -memory_limit_kb)?;
            slots.push(Mutex::new(conn));
        }
        Ok(Self { slots, next: AtomicUsize::new(0) })
    }

    /// Borrows the next connection in round-robin order. The lock is held
    /// only for the duration of the caller's closure, matching the
    /// single-writer-per-connection discipline described in spec §4.2.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let guard = self.slots[idx].lock().expect("connection mutex poisoned");
        f(&guard)
    }
}

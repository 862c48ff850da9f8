//! A small fixed-size pool of read-only connections against the catalog
//! file, round-robin over a `Vec<Mutex<_>>` the same way `devac-query`
//! pools its scratch in-memory connections — here opened read-only
//! against the on-disk catalog so readers never contend with the single
//! writer connection (spec §4.7: "Reads are served concurrently").

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use crate::error::HubError;

const POOL_SIZE: usize = 4;

pub struct ReadPool {
    slots: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    pub fn open(path: &Path) -> Result<Self, HubError> {
        let mut slots = Vec::with_capacity(POOL_SIZE);
        for _ in 0..POOL_SIZE {
            let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            slots.push(Mutex::new(conn));
        }
        Ok(Self { slots, next: AtomicUsize::new(0) })
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T, HubError>) -> Result<T, HubError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let guard = self.slots[idx].lock().expect("connection mutex poisoned");
        f(&guard)
    }
}

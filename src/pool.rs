//! Fixed-size SQLite connection pool with scoped checkout.
//!
//! Each persister owns one pool. A checked-out [`PooledConnection`] goes back
//! to the pool when dropped, on every exit path.

use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use tracing::debug;

use crate::errors::LoaderError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

struct PoolInner {
    name: &'static str,
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
    size: usize,
    location: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Opens `size` connections to `location` (`None` = in memory) and runs
    /// `init` once on the first connection, before the others are opened.
    ///
    /// In-memory databases are private to their connection, so the pool is
    /// clamped to a single connection in that case.
    pub fn open<F>(
        name: &'static str,
        location: Option<&Path>,
        size: usize,
        init: F,
    ) -> Result<Self, LoaderError>
    where
        F: Fn(&Connection) -> Result<(), LoaderError>,
    {
        if size == 0 {
            return Err(LoaderError::config(format!("{name} pool size must be positive")));
        }
        let size = if location.is_some() { size } else { 1 };
        let mut conns = Vec::with_capacity(size);
        for idx in 0..size {
            let conn = open_connection(location)?;
            if idx == 0 {
                init(&conn)?;
            }
            conns.push(conn);
        }
        debug!(pool = name, size, "connection pool opened");
        Ok(Self {
            inner: Arc::new(PoolInner {
                name,
                idle: Mutex::new(conns),
                available: Condvar::new(),
                size,
                location: location.map(Path::to_path_buf),
            }),
        })
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn location(&self) -> Option<&Path> {
        self.inner.location.as_deref()
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Blocks until a connection is free. Exhaustion past the checkout
    /// timeout is reported as transient so the caller may retry.
    pub fn get(&self) -> Result<PooledConnection, LoaderError> {
        let mut idle = self.inner.idle.lock();
        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection {
                    pool: Arc::clone(&self.inner),
                    conn: Some(conn),
                });
            }
            if self
                .inner
                .available
                .wait_for(&mut idle, CHECKOUT_TIMEOUT)
                .timed_out()
                && idle.is_empty()
            {
                return Err(LoaderError::transient(format!(
                    "{} pool exhausted after {:?}",
                    self.inner.name, CHECKOUT_TIMEOUT
                )));
            }
        }
    }
}

fn open_connection(location: Option<&Path>) -> Result<Connection, LoaderError> {
    let conn = match location {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| LoaderError::from_sqlite("open", e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| LoaderError::from_sqlite("busy_timeout", e))?;
    conn.set_prepared_statement_cache_capacity(64);
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| LoaderError::from_sqlite("foreign_keys", e))?;
    if location.is_some() {
        if conn.pragma_update(None, "journal_mode", "WAL").is_err() {
            let _ = conn.pragma_update(None, "journal_mode", "DELETE");
        }
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    }
    Ok(conn)
}

/// Connection checked out of a [`ConnectionPool`].
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.idle.lock().push(conn);
            self.pool.available.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_init(_: &Connection) -> Result<(), LoaderError> {
        Ok(())
    }

    #[test]
    fn connection_returns_to_pool_on_drop() {
        let pool = ConnectionPool::open("test", None, 4, no_init).unwrap();
        assert_eq!(pool.size(), 1);
        {
            let conn = pool.get().unwrap();
            conn.execute_batch("CREATE TABLE t(x INTEGER)").unwrap();
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.idle_count(), 1);
        let conn = pool.get().unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn file_pool_opens_requested_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let pool = ConnectionPool::open("test", Some(&path), 3, |conn| {
            conn.execute_batch("CREATE TABLE IF NOT EXISTS t(x INTEGER)")
                .map_err(|e| LoaderError::from_sqlite("init", e))
        })
        .unwrap();
        assert_eq!(pool.size(), 3);
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        a.execute("INSERT INTO t(x) VALUES (1)", []).unwrap();
        let n: i64 = b
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(ConnectionPool::open("test", None, 0, no_init).is_err());
    }
}

//! Bounded SQLite connection pool.
//!
//! Connections are opened lazily up to `pool_size`. When every connection is
//! checked out, `get` blocks until one is returned. A [`PooledConnection`]
//! hands its connection back when dropped, so release happens on every exit
//! path including early `?` returns.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

const CONNECTION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
";

/// Snapshot of pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    pub open: usize,
    pub idle: usize,
}

pub struct ConnectionPool {
    path: PathBuf,
    max_size: usize,
    busy_timeout: Duration,
    state: Mutex<PoolState>,
    returned: Condvar,
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

impl ConnectionPool {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        if config.pool_size == 0 {
            return Err(StoreError::Unavailable(
                "connection pool size must be at least 1".into(),
            ));
        }
        Ok(Self {
            path: config.path.clone(),
            max_size: config.pool_size,
            busy_timeout: config.busy_timeout(),
            state: Mutex::new(PoolState::default()),
            returned: Condvar::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check out a connection, blocking while the pool is exhausted.
    pub fn get(&self) -> StoreResult<PooledConnection<'_>> {
        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(self, conn));
            }

            if state.open < self.max_size {
                state.open += 1;
                drop(state);
                return match self.open_connection() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(err) => {
                        self.state.lock().open -= 1;
                        self.returned.notify_one();
                        Err(err)
                    }
                };
            }

            self.returned.wait(&mut state);
        }
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            max_size: self.max_size,
            open: state.open,
            idle: state.idle.len(),
        }
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open {}: {e}", self.path.display()))
        })?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        tracing::debug!(path = %self.path.display(), "opened pooled connection");
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        self.state.lock().idle.push(conn);
        self.returned.notify_one();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("ConnectionPool")
            .field("path", &self.path)
            .field("max_size", &status.max_size)
            .field("open", &status.open)
            .field("idle", &status.idle)
            .finish()
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// `conn` is `Some` for the guard's whole life and is taken only in `Drop`,
/// which is why `Deref` may rely on it.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn pool_in(dir: &tempfile::TempDir, size: usize) -> ConnectionPool {
        ConnectionPool::new(&StoreConfig {
            path: dir.path().join("pool.db"),
            pool_size: size,
            busy_timeout_ms: 1_000,
        })
        .unwrap()
    }

    #[test]
    fn zero_sized_pool_rejected() {
        let config = StoreConfig {
            pool_size: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            ConnectionPool::new(&config),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn connections_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, 2);
        {
            let conn = pool.get().unwrap();
            let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
            assert_eq!(one, 1);
        }
        {
            let _conn = pool.get().unwrap();
        }
        let status = pool.status();
        assert_eq!(status.open, 1);
        assert_eq!(status.idle, 1);
    }

    #[test]
    fn foreign_keys_enabled_per_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, 1);
        let conn = pool.get().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn exhausted_pool_blocks_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(pool_in(&dir, 1));

        let held = pool.get().unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let conn = pool.get().unwrap();
                conn.query_row("SELECT 2", [], |r| r.get::<_, i64>(0)).unwrap()
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        assert_eq!(pool.status().open, 1);

        drop(held);
        assert_eq!(waiter.join().unwrap(), 2);
        assert_eq!(pool.status().idle, 1);
    }

    fn failing_query(pool: &ConnectionPool) -> StoreResult<i64> {
        let conn = pool.get()?;
        let value = conn.query_row("SELECT * FROM no_such_table", [], |r| r.get(0))?;
        Ok(value)
    }

    #[test]
    fn early_return_releases_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, 1);

        for _ in 0..3 {
            assert!(matches!(failing_query(&pool), Err(StoreError::Sql(_))));
            let status = pool.status();
            assert_eq!((status.open, status.idle), (1, 1));
        }

        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();
        tx.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn failed_open_frees_its_slot() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::new(&StoreConfig {
            path: dir.path().join("missing").join("nested").join("x.db"),
            pool_size: 1,
            busy_timeout_ms: 10,
        })
        .unwrap();
        assert!(matches!(pool.get(), Err(StoreError::Unavailable(_))));
        assert_eq!(pool.status().open, 0);
    }
}

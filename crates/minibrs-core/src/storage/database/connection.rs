use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use super::schema::apply_pragmas;
use crate::config::PoolConfig;
use crate::error::{MinibrsError, Result};

struct IdleConnection {
    conn: Connection,
    created_at: Instant,
    last_used: Instant,
}

struct PoolState {
    idle: Vec<IdleConnection>,
    /// Connections currently open, idle or checked out.
    total: usize,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub total: usize,
    pub max_size: usize,
}

/// Bounded pool of SQLite connections to one database.
pub struct ConnectionPool {
    path: Option<PathBuf>,
    max_size: usize,
    connection_timeout: Duration,
    idle_timeout: Option<Duration>,
    max_lifetime: Option<Duration>,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    pub fn open(path: &Path, config: &PoolConfig) -> Result<Self> {
        let pool = Self {
            path: Some(path.to_path_buf()),
            max_size: config.size.max(1),
            connection_timeout: config.connection_timeout(),
            idle_timeout: non_zero(config.idle_timeout()),
            max_lifetime: non_zero(config.max_lifetime()),
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                total: 0,
            }),
            available: Condvar::new(),
        };

        // Fail fast on an unreadable path instead of on the first query.
        drop(pool.get()?);
        tracing::debug!(path = %path.display(), size = pool.max_size, "opened connection pool");
        Ok(pool)
    }

    /// A single never-expiring connection: the database lives only as long as it does.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        let now = Instant::now();
        Ok(Self {
            path: None,
            max_size: 1,
            connection_timeout: PoolConfig::default().connection_timeout(),
            idle_timeout: None,
            max_lifetime: None,
            state: Mutex::new(PoolState {
                idle: vec![IdleConnection {
                    conn,
                    created_at: now,
                    last_used: now,
                }],
                total: 1,
            }),
            available: Condvar::new(),
        })
    }

    /// Check out a connection, waiting up to the connection timeout for one to free up.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.connection_timeout;
        let mut state = self.lock();

        loop {
            while let Some(entry) = state.idle.pop() {
                if self.is_expired(&entry) {
                    state.total -= 1;
                    tracing::debug!("closing expired pooled connection");
                    continue;
                }
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(entry.conn),
                    created_at: entry.created_at,
                });
            }

            if state.total < self.max_size {
                state.total += 1;
                drop(state);
                return match self.connect() {
                    Ok(conn) => Ok(PooledConnection {
                        pool: self,
                        conn: Some(conn),
                        created_at: Instant::now(),
                    }),
                    Err(e) => {
                        self.lock().total -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(timeout = ?self.connection_timeout, "connection pool exhausted");
                return Err(MinibrsError::PoolTimeout(self.connection_timeout));
            }
            state = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.lock();
        PoolStatus {
            idle: state.idle.len(),
            total: state.total,
            max_size: self.max_size,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(self.connection_timeout)?;
        apply_pragmas(&conn)?;
        Ok(conn)
    }

    fn is_expired(&self, entry: &IdleConnection) -> bool {
        let lifetime_over = self
            .max_lifetime
            .is_some_and(|max| entry.created_at.elapsed() >= max);
        let idle_over = self
            .idle_timeout
            .is_some_and(|max| entry.last_used.elapsed() >= max);
        lifetime_over || idle_over
    }

    fn release(&self, conn: Connection, created_at: Instant) {
        let mut state = self.lock();
        state.idle.push(IdleConnection {
            conn,
            created_at,
            last_used: Instant::now(),
        });
        drop(state);
        self.available.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

/// A checked-out connection; returns itself to the pool on drop.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
    created_at: Instant,
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
            self.pool.release(conn, self.created_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn config(size: usize, timeout_ms: u64) -> PoolConfig {
        PoolConfig {
            size,
            connection_timeout_ms: timeout_ms,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn test_connections_are_reused() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("pool.db"), &config(4, 1000)).unwrap();

        {
            let _a = pool.get().unwrap();
            let _b = pool.get().unwrap();
            assert_eq!(pool.status().total, 2);
            assert_eq!(pool.status().idle, 0);
        }

        assert_eq!(pool.status().idle, 2);
        let _c = pool.get().unwrap();
        assert_eq!(pool.status().total, 2);
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("pool.db"), &config(1, 50)).unwrap();

        let _held = pool.get().unwrap();
        let started = Instant::now();
        let result = pool.get();
        assert!(matches!(result, Err(MinibrsError::PoolTimeout(_))));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_waiter_gets_released_connection() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(
            ConnectionPool::open(&dir.path().join("pool.db"), &config(1, 5000)).unwrap(),
        );

        let held = pool.get().unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let conn = pool.get().unwrap();
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .unwrap()
            })
        };

        thread::sleep(Duration::from_millis(50));
        drop(held);
        assert_eq!(waiter.join().unwrap(), 1);
        assert_eq!(pool.status().total, 1);
    }

    /// Temp tables live and die with their connection.
    fn mark(conn: &Connection) {
        conn.execute_batch("CREATE TEMP TABLE marker (x INTEGER)").unwrap();
    }

    fn has_marker(conn: &Connection) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_temp_master WHERE name = 'marker'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_idle_connection_expires() {
        let dir = TempDir::new().unwrap();
        let cfg = PoolConfig {
            size: 1,
            connection_timeout_ms: 1000,
            idle_timeout_ms: 100,
            max_lifetime_ms: 0,
        };
        let pool = ConnectionPool::open(&dir.path().join("pool.db"), &cfg).unwrap();

        mark(&pool.get().unwrap());
        assert!(has_marker(&pool.get().unwrap()));

        thread::sleep(Duration::from_millis(200));
        assert!(!has_marker(&pool.get().unwrap()));
        assert_eq!(pool.status().total, 1);
    }

    #[test]
    fn test_connection_expires_after_max_lifetime() {
        let dir = TempDir::new().unwrap();
        let cfg = PoolConfig {
            size: 1,
            connection_timeout_ms: 1000,
            idle_timeout_ms: 0,
            max_lifetime_ms: 300,
        };
        let pool = ConnectionPool::open(&dir.path().join("pool.db"), &cfg).unwrap();
        mark(&pool.get().unwrap());

        // Busy the whole time, so only the lifetime can retire it.
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(150) {
            assert!(has_marker(&pool.get().unwrap()));
            thread::sleep(Duration::from_millis(10));
        }

        thread::sleep(Duration::from_millis(250));
        assert!(!has_marker(&pool.get().unwrap()));
        assert_eq!(pool.status().total, 1);
    }

    #[test]
    fn test_pragmas_applied() {
        let pool = ConnectionPool::open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        assert!(pool.is_in_memory());
    }
}

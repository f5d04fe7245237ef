// src/pool/bounded.rs
//! Bounded connection pool.
//!
//! # Acquire
//!
//! [`Pool::get`] never waits. It takes an idle connection if one is queued and
//! otherwise asks the factory for a fresh one, so the number of connections
//! checked out at once is bounded only by the factory itself.
//!
//! # Recycle
//!
//! Closing a [`PooledConn`] re-enters the pool. The raw connection goes back
//! into the idle queue if there is room; a full queue, an unusable flag, or a
//! shut-down pool makes the pool close it physically instead. Returning a
//! connection never blocks.
//!
//! # Shutdown
//!
//! Pool-wide state is a single `Open | Closed` value behind a read/write lock.
//! [`Pool::close`] swaps it to `Closed` under the write lock, then drains the
//! old idle queue outside the lock. Any snapshot taken after the swap sees a
//! closed pool. Callers that snapshotted earlier may still hold the old queue;
//! the queue itself is marked closed before the drain, so their dequeue also
//! reports a closed pool. Shutdown runs at most once; later calls are no-ops.

use super::config::PoolConfig;
use super::pooled::{PooledConn, Recycle};
use super::queue::{IdleQueue, Pop};
use super::stats::{PoolStats, StatsInner};
use crate::connection::Connection;
use crate::error::{PoolError, Result};
use crate::factory::Factory;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

enum State<F: Factory> {
    Open {
        idle: Arc<IdleQueue<F::Conn>>,
        factory: Arc<F>,
    },
    Closed,
}

pub(crate) struct Shared<F: Factory> {
    state: RwLock<State<F>>,
    stats: StatsInner,
    max_cap: usize,
}

impl<F: Factory> Shared<F> {
    /// Copies out both halves of the open state; the lock is released on return.
    fn snapshot(&self) -> Option<(Arc<IdleQueue<F::Conn>>, Arc<F>)> {
        match &*self.state.read() {
            State::Open { idle, factory } => Some((Arc::clone(idle), Arc::clone(factory))),
            State::Closed => None,
        }
    }

    /// Best-effort physical close.
    fn discard(&self, conn: F::Conn) {
        StatsInner::bump(&self.stats.discarded);
        if let Err(err) = conn.close() {
            tracing::warn!(error = %err, "failed to close connection");
        }
    }

    fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), State::Closed);
        let State::Open { idle, factory } = previous else {
            return;
        };
        drop(factory);

        if !idle.close() {
            return;
        }
        let mut closed = 0usize;
        for conn in idle.drain() {
            self.discard(conn);
            closed += 1;
        }
        tracing::debug!(closed, "connection pool shut down");
    }
}

impl<F: Factory> Recycle<F::Conn> for Shared<F> {
    fn recycle(&self, conn: Option<F::Conn>, unusable: bool) -> Result<()> {
        let conn = conn.ok_or(PoolError::NilConnection)?;

        if unusable {
            tracing::trace!("discarding connection marked unusable");
            self.discard(conn);
            return Ok(());
        }

        // The read lock is held across the push so shutdown cannot drain the
        // queue underneath it.
        let rejected = {
            let state = self.state.read();
            match &*state {
                State::Open { idle, .. } => match idle.push(conn) {
                    Ok(()) => {
                        StatsInner::bump(&self.stats.returned);
                        return Ok(());
                    }
                    Err(conn) => Rejected::Full(conn),
                },
                State::Closed => Rejected::Closed(conn),
            }
        };

        match rejected {
            Rejected::Full(conn) => {
                tracing::trace!("idle queue full, closing connection");
                self.discard(conn);
                Ok(())
            }
            Rejected::Closed(conn) => {
                tracing::trace!("pool closed, closing returned connection");
                StatsInner::bump(&self.stats.discarded);
                conn.close().map_err(PoolError::Close)
            }
        }
    }
}

enum Rejected<C> {
    Full(C),
    Closed(C),
}

/// Thread-safe pool of reusable connections.
///
/// Share it across threads with `Arc`. Dropping the pool shuts it down.
///
/// # Example
///
/// ```no_run
/// use connpool::Pool;
/// use std::io::Write;
/// use std::net::TcpStream;
///
/// let pool = Pool::new(5, 30, || TcpStream::connect("127.0.0.1:8888"))?;
///
/// let mut conn = pool.get()?;
/// conn.write_all(b"ping")?;
/// conn.close()?; // back into the idle queue
///
/// pool.close();
/// assert!(pool.get().unwrap_err().is_closed());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Pool<F: Factory> {
    shared: Arc<Shared<F>>,
}

impl<F: Factory> Pool<F> {
    /// Creates a pool holding up to `max_cap` idle connections and opens
    /// `init_cap` of them right away.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidCapacity`] if `init_cap < 0`, `init_cap > max_cap`
    ///   or `max_cap == 0`; the factory is not called.
    /// - [`PoolError::Fill`] if the factory fails during the initial fill.
    ///   Connections opened so far are closed.
    pub fn new(init_cap: isize, max_cap: usize, factory: F) -> Result<Self> {
        Self::with_config(PoolConfig { init_cap, max_cap }, factory)
    }

    /// Creates a pool from a [`PoolConfig`]. See [`Pool::new`].
    pub fn with_config(config: PoolConfig, factory: F) -> Result<Self> {
        config.validate()?;

        let idle = Arc::new(IdleQueue::new(config.max_cap));
        let factory = Arc::new(factory);
        let pool = Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State::Open {
                    idle: Arc::clone(&idle),
                    factory: Arc::clone(&factory),
                }),
                stats: StatsInner::new(),
                max_cap: config.max_cap,
            }),
        };

        for _ in 0..config.initial() {
            let conn = match factory.create() {
                Ok(conn) => conn,
                Err(err) => {
                    pool.close();
                    return Err(PoolError::Fill(err));
                }
            };
            StatsInner::bump(&pool.shared.stats.created);
            if let Err(conn) = idle.push(conn) {
                pool.shared.discard(conn);
            }
        }

        tracing::debug!(
            init_cap = config.init_cap,
            max_cap = config.max_cap,
            "connection pool ready"
        );
        Ok(pool)
    }

    /// Returns a connection, reusing an idle one when available.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Closed`] once the pool has been shut down.
    /// - [`PoolError::Factory`] carrying the factory's own error when a new
    ///   connection was needed and could not be opened.
    pub fn get(&self) -> Result<PooledConn<F::Conn>> {
        let (idle, factory) = self.shared.snapshot().ok_or(PoolError::Closed)?;

        let conn = match idle.pop() {
            Pop::Item(conn) => {
                tracing::trace!("reusing idle connection");
                StatsInner::bump(&self.shared.stats.reused);
                conn
            }
            Pop::Closed => return Err(PoolError::Closed),
            Pop::Empty => {
                tracing::trace!("idle queue empty, opening connection");
                let conn = factory.create().map_err(PoolError::Factory)?;
                StatsInner::bump(&self.shared.stats.created);
                conn
            }
        };

        StatsInner::bump(&self.shared.stats.acquired);
        Ok(self.wrap(conn))
    }

    fn wrap(&self, conn: F::Conn) -> PooledConn<F::Conn> {
        let owner: Weak<Shared<F>> = Arc::downgrade(&self.shared);
        PooledConn::new(conn, owner)
    }

    /// Shuts the pool down and closes every idle connection.
    ///
    /// Connections still checked out are closed when they are returned.
    /// Calling this more than once has no further effect.
    pub fn close(&self) {
        self.shared.shutdown();
    }

    /// Number of idle connections right now.
    ///
    /// Approximate under concurrent use; always `0` after [`close`](Self::close).
    pub fn len(&self) -> usize {
        match &*self.shared.state.read() {
            State::Open { idle, .. } => idle.len(),
            State::Closed => 0,
        }
    }

    /// Whether no connection is idle right now.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of idle connections the pool keeps.
    pub fn capacity(&self) -> usize {
        self.shared.max_cap
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        matches!(&*self.shared.state.read(), State::Closed)
    }

    /// Returns a snapshot of pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.shared.stats.snapshot(self.len(), self.shared.max_cap)
    }

    #[cfg(test)]
    pub(crate) fn recycle(&self, conn: Option<F::Conn>) -> Result<()> {
        self.shared.recycle(conn, false)
    }
}

impl<F: Factory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.len())
            .field("max_cap", &self.shared.max_cap)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The operations every connection pool offers, independent of its factory.
///
/// Lets code hold a pool as `&dyn ConnectionPool<Conn = TcpStream>` without
/// naming the factory type.
pub trait ConnectionPool: Send + Sync {
    /// The raw connection type handed out.
    type Conn: Connection;

    /// See [`Pool::get`].
    fn get(&self) -> Result<PooledConn<Self::Conn>>;

    /// See [`Pool::close`].
    fn close(&self);

    /// See [`Pool::len`].
    fn len(&self) -> usize;

    /// Whether no connection is idle right now.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: Factory> ConnectionPool for Pool<F> {
    type Conn = F::Conn;

    fn get(&self) -> Result<PooledConn<F::Conn>> {
        Pool::get(self)
    }

    fn close(&self) {
        Pool::close(self)
    }

    fn len(&self) -> usize {
        Pool::len(self)
    }
}

impl<F: Factory> Drop for Pool<F> {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::{MockConn, MockDialer};
    use std::collections::HashSet;
    use std::io;
    use std::thread;

    type MockFactory = Box<dyn Fn() -> io::Result<MockConn> + Send + Sync>;

    fn factory(dialer: &Arc<MockDialer>) -> MockFactory {
        let d = Arc::clone(dialer);
        Box::new(move || d.dial())
    }

    #[test]
    fn test_new_fills_init_cap() {
        for (init_cap, max_cap) in [(0, 1), (0, 10), (5, 30), (10, 10)] {
            let dialer = Arc::new(MockDialer::default());
            let pool = Pool::new(init_cap, max_cap, factory(&dialer)).unwrap();
            assert_eq!(pool.len(), init_cap as usize);
            assert_eq!(pool.capacity(), max_cap);
            assert_eq!(pool.stats().created, init_cap as usize);
        }
    }

    #[test]
    fn test_negative_init_cap_never_dials() {
        let dialer = Arc::new(MockDialer::default());
        let err = Pool::new(-1, 10, factory(&dialer)).unwrap_err();
        assert!(matches!(err, PoolError::InvalidCapacity { init_cap: -1, .. }));
        assert_eq!(dialer.created.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fill_failure_closes_partial_fill() {
        let dialer = Arc::new(MockDialer::failing_after(3));
        let err = Pool::new(5, 10, factory(&dialer)).unwrap_err();
        assert!(matches!(err, PoolError::Fill(_)));
        assert_eq!(dialer.closed_count(), 3);
    }

    #[test]
    fn test_get_drains_idle_queue() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(5, 30, factory(&dialer)).unwrap();

        let mut held = Vec::new();
        for n in 1..=3 {
            held.push(pool.get().unwrap());
            assert_eq!(pool.len(), 5 - n);
        }
        assert_eq!(pool.stats().reused, 3);
    }

    #[test]
    fn test_get_on_empty_dials() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(0, 2, factory(&dialer)).unwrap();

        let conns: Vec<_> = (0..4).map(|_| pool.get().unwrap()).collect();
        assert_eq!(conns.len(), 4);
        assert_eq!(pool.stats().created, 4);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_factory_error_passes_through() {
        let dialer = Arc::new(MockDialer::failing_after(1));
        let pool = Pool::new(1, 5, factory(&dialer)).unwrap();

        let _first = pool.get().unwrap();
        match pool.get().unwrap_err() {
            PoolError::Factory(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_closed_connection_is_reused() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(0, 4, factory(&dialer)).unwrap();

        let conn = pool.get().unwrap();
        let id = conn.id;
        conn.close().unwrap();
        assert_eq!(pool.len(), 1);

        let again = pool.get().unwrap();
        assert_eq!(again.id, id);
        assert!(!dialer.is_closed(id));
    }

    #[test]
    fn test_idle_queue_is_fifo() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(0, 4, factory(&dialer)).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        let (a_id, b_id) = (a.id, b.id);
        b.close().unwrap();
        a.close().unwrap();

        assert_eq!(pool.get().unwrap().id, b_id);
        assert_eq!(pool.get().unwrap().id, a_id);
    }

    #[test]
    fn test_overflow_is_closed() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(0, 3, factory(&dialer)).unwrap();

        let conns: Vec<_> = (0..5).map(|_| pool.get().unwrap()).collect();
        for conn in conns {
            conn.close().unwrap();
        }

        assert_eq!(pool.len(), 3);
        assert_eq!(dialer.closed_count(), 2);
        assert!(dialer.is_closed(3));
        assert!(dialer.is_closed(4));
        assert_eq!(pool.stats().discarded, 2);
    }

    #[test]
    fn test_overflow_close_error_is_swallowed() {
        let dialer = Arc::new(MockDialer {
            fail_close: true,
            ..MockDialer::default()
        });
        let pool = Pool::new(0, 1, factory(&dialer)).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        a.close().unwrap();
        assert!(b.close().is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_unusable_is_closed_not_cached() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(1, 4, factory(&dialer)).unwrap();

        let conn = pool.get().unwrap();
        let id = conn.id;
        conn.mark_unusable();
        conn.close().unwrap();

        assert!(dialer.is_closed(id));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_recycle_rejects_nil() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(2, 4, factory(&dialer)).unwrap();

        let err = pool.recycle(None).unwrap_err();
        assert!(matches!(err, PoolError::NilConnection));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_close_pool() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(3, 10, factory(&dialer)).unwrap();
        let out = pool.get().unwrap();
        let out_id = out.id;

        pool.close();
        assert!(pool.is_closed());
        assert_eq!(pool.len(), 0);
        assert_eq!(dialer.closed_count(), 2);
        assert!(pool.get().unwrap_err().is_closed());

        // Returning into a closed pool closes the connection.
        out.close().unwrap();
        assert!(dialer.is_closed(out_id));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(2, 4, factory(&dialer)).unwrap();

        pool.close();
        pool.close();
        assert_eq!(pool.stats().discarded, 2);
        assert_eq!(dialer.closed_count(), 2);
    }

    #[test]
    fn test_unusable_after_shutdown_is_closed() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(1, 4, factory(&dialer)).unwrap();

        let conn = pool.get().unwrap();
        let id = conn.id;
        pool.close();

        conn.mark_unusable();
        assert!(conn.close().is_ok());
        assert!(dialer.is_closed(id));
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[test]
    fn test_pool_behind_trait_object() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(2, 4, factory(&dialer)).unwrap();
        let shared: &dyn ConnectionPool<Conn = MockConn> = &pool;

        let conn = shared.get().unwrap();
        assert_eq!(shared.len(), 1);
        conn.close().unwrap();
        assert_eq!(shared.len(), 2);

        shared.close();
        assert!(shared.is_empty());
        assert!(shared.get().unwrap_err().is_closed());
    }

    #[test]
    fn test_return_into_closed_pool_reports_close_error() {
        let dialer = Arc::new(MockDialer {
            fail_close: true,
            ..MockDialer::default()
        });
        let pool = Pool::new(0, 4, factory(&dialer)).unwrap();

        let conn = pool.get().unwrap();
        pool.close();
        assert!(matches!(conn.close().unwrap_err(), PoolError::Close(_)));
    }

    #[test]
    fn test_stale_snapshot_sees_closed_queue() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(2, 4, factory(&dialer)).unwrap();

        let (idle, _factory) = pool.shared.snapshot().unwrap();
        pool.close();
        assert!(matches!(idle.pop(), Pop::Closed));
    }

    #[test]
    fn test_drop_pool_shuts_down() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(2, 4, factory(&dialer)).unwrap();
        let out = pool.get().unwrap();
        let out_id = out.id;

        drop(pool);
        assert!(dialer.is_closed(1));
        out.close().unwrap();
        assert!(dialer.is_closed(out_id));
    }

    #[test]
    fn test_dropped_conn_returns_to_pool() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(0, 4, factory(&dialer)).unwrap();
        {
            let _conn = pool.get().unwrap();
        }
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.stats().returned, 1);
    }

    #[test]
    fn test_concurrent_get() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Arc::new(Pool::new(5, 30, factory(&dialer)).unwrap());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let p = Arc::clone(&pool);
                thread::spawn(move || p.get().unwrap().leak().id)
            })
            .collect();

        let ids: HashSet<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.stats().created, 5);
    }

    #[test]
    fn test_concurrent_get_and_close() {
        let dialer = Arc::new(MockDialer::default());
        let pool = Arc::new(Pool::new(4, 8, factory(&dialer)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..200 {
                        match p.get() {
                            Ok(conn) => {
                                if i % 3 == 0 {
                                    conn.mark_unusable();
                                }
                                let _ = conn.close();
                            }
                            Err(e) => assert!(e.is_closed()),
                        }
                    }
                })
            })
            .collect();

        pool.close();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(pool.len(), 0);
        let created = dialer.created.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(dialer.closed_count(), created);
    }
}

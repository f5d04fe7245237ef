// src/pool/pooled.rs
//! Pooled connection wrapper.
//!
//! # Close Semantics
//!
//! [`PooledConn`] looks like an ordinary connection: it reads, writes and
//! closes. Its close, however, does **not** necessarily terminate the
//! transport. The owning pool decides:
//!
//! - pool open and idle queue not full: the raw connection becomes idle again;
//! - idle queue full, connection marked unusable, or pool shut down: the raw
//!   connection is physically closed.
//!
//! Dropping a `PooledConn` without calling [`close`](PooledConn::close) takes
//! the same path; errors are logged instead of returned.
//!
//! The wrapper keeps only a weak reference to its pool. If the pool is gone,
//! closing the wrapper terminates the connection.

use crate::connection::Connection;
use crate::error::{PoolError, Result};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner side of a [`PooledConn`]: takes the raw connection back.
pub(crate) trait Recycle<C>: Send + Sync {
    /// `None` is rejected with [`PoolError::NilConnection`].
    fn recycle(&self, conn: Option<C>, unusable: bool) -> Result<()>;
}

/// A connection borrowed from a [`crate::Pool`].
///
/// Derefs to the raw connection for transport-specific calls such as
/// `peer_addr()`.
pub struct PooledConn<C: Connection> {
    conn: Option<C>,
    unusable: AtomicBool,
    pool: Weak<dyn Recycle<C>>,
}

impl<C: Connection> PooledConn<C> {
    pub(crate) fn new(conn: C, pool: Weak<dyn Recycle<C>>) -> Self {
        Self {
            conn: Some(conn),
            unusable: AtomicBool::new(false),
            pool,
        }
    }

    /// Hands the connection back to the pool.
    ///
    /// Returns the pool's verdict: `Ok(())` when the connection was cached or
    /// discarded cleanly, or the physical close error if the pool had already
    /// been shut down.
    pub fn close(mut self) -> Result<()> {
        let conn = self.conn.take();
        self.release(conn)
    }

    /// Flags the connection as corrupted so the pool terminates it on close.
    ///
    /// There is no way to undo this.
    pub fn mark_unusable(&self) {
        self.unusable.store(true, Ordering::Release);
    }

    /// Whether [`mark_unusable`](Self::mark_unusable) was called.
    #[inline]
    pub fn is_unusable(&self) -> bool {
        self.unusable.load(Ordering::Acquire)
    }

    /// Detaches the raw connection from the pool.
    ///
    /// The pool forgets about it; the caller owns its lifecycle from here on.
    pub fn leak(mut self) -> C {
        self.conn.take().expect("connection is present until close")
    }

    fn release(&self, conn: Option<C>) -> Result<()> {
        let unusable = self.is_unusable();
        match self.pool.upgrade() {
            Some(pool) => pool.recycle(conn, unusable),
            None => {
                let conn = conn.ok_or(PoolError::NilConnection)?;
                tracing::trace!("pool dropped, closing connection");
                conn.close().map_err(PoolError::Close)
            }
        }
    }

    #[inline]
    fn inner(&self) -> &C {
        self.conn.as_ref().expect("connection is present until close")
    }

    #[inline]
    fn inner_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection is present until close")
    }
}

impl<C: Connection> std::ops::Deref for PooledConn<C> {
    type Target = C;
    fn deref(&self) -> &Self::Target {
        self.inner()
    }
}

impl<C: Connection> std::ops::DerefMut for PooledConn<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner_mut()
    }
}

impl<C: Connection> Read for PooledConn<C> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner_mut().read(buf)
    }
}

impl<C: Connection> Write for PooledConn<C> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner_mut().write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.inner_mut().flush()
    }
}

/// A pooled connection is itself a [`Connection`], so it can be passed to
/// code written against raw connections. Its `close` still recycles.
impl<C: Connection> Connection for PooledConn<C> {
    fn close(self) -> io::Result<()> {
        PooledConn::close(self).map_err(io::Error::from)
    }
}

impl<C: Connection + fmt::Debug> fmt::Debug for PooledConn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConn")
            .field("conn", &self.conn)
            .field("unusable", &self.is_unusable())
            .finish()
    }
}

impl<C: Connection> Drop for PooledConn<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = self.release(Some(conn)) {
                tracing::warn!(error = %err, "failed to release dropped connection");
            }
        }
    }
}

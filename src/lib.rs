// src/lib.rs
//! # Bounded Connection Pool
//!
//! A thread-safe pool of reusable network connections. Callers borrow a
//! connection with [`Pool::get`], use it like any other stream, and hand it
//! back by closing it; the pool decides whether to keep it for reuse or close
//! it for real.
//!
//! Features:
//! - Fixed-capacity, lock-free FIFO idle queue
//! - Never blocks on exhaustion: a miss opens a new connection through the factory
//! - Connections close "into" the pool, explicitly or on drop
//! - Caller-driven invalidation with [`PooledConn::mark_unusable`]
//! - Idempotent shutdown that is safe against in-flight `get`/`close` calls
//!
//! ```no_run
//! use connpool::prelude::*;
//! use std::net::TcpStream;
//!
//! let pool = Pool::new(5, 30, || TcpStream::connect("127.0.0.1:8888"))?;
//! let conn = pool.get()?;
//! println!("peer: {}", conn.peer_addr()?);
//! conn.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod error;
pub mod factory;
pub mod pool;

// Re-export main types
pub use connection::Connection;
pub use error::{PoolError, Result, ResultExt};
pub use factory::Factory;
pub use pool::{ConnectionPool, Pool, PoolConfig, PoolStats, PooledConn};

/// Commonly used imports.
pub mod prelude {
    pub use crate::connection::Connection;
    pub use crate::error::{PoolError, Result, ResultExt};
    pub use crate::factory::Factory;
    pub use crate::pool::{ConnectionPool, Pool, PoolConfig, PoolStats, PooledConn};
}

// src/factory.rs
//! Connection factory contract.

use crate::connection::Connection;
use std::io;

/// Creates new connections on demand.
///
/// The pool calls [`create`](Self::create) during its initial fill and
/// whenever a caller asks for a connection while no idle one is available.
/// Failures are never retried by the pool; they surface to the caller of
/// [`crate::Pool::get`] unchanged.
///
/// Any `Fn() -> io::Result<C>` closure is a factory:
///
/// ```no_run
/// use connpool::Pool;
/// use std::net::TcpStream;
///
/// let pool = Pool::new(2, 10, || TcpStream::connect("127.0.0.1:8888"))?;
/// # Ok::<(), connpool::PoolError>(())
/// ```
pub trait Factory: Send + Sync + 'static {
    /// The connection type this factory produces.
    type Conn: Connection;

    /// Opens a new connection.
    fn create(&self) -> io::Result<Self::Conn>;
}

impl<F, C> Factory for F
where
    F: Fn() -> io::Result<C> + Send + Sync + 'static,
    C: Connection,
{
    type Conn = C;

    #[inline]
    fn create(&self) -> io::Result<C> {
        self()
    }
}

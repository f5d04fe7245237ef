// src/connection.rs
//! Raw connection contract.
//!
//! A [`Connection`] is the transport handle the pool stores. The pool only
//! needs two things from it: byte-level I/O, which it hands through to the
//! caller untouched, and a way to terminate it for good.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// A raw, physically closable network connection.
///
/// `close` consumes the handle, so a connection that has been terminated can
/// never find its way back into an idle queue.
pub trait Connection: Read + Write + Send + 'static {
    /// Physically terminates the connection.
    ///
    /// Implementations should release the underlying transport even when an
    /// error is reported.
    fn close(self) -> io::Result<()>;
}

/// Treats "already disconnected" as a successful close.
fn shutdown_result(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

impl Connection for TcpStream {
    fn close(self) -> io::Result<()> {
        shutdown_result(self.shutdown(Shutdown::Both))
    }
}

#[cfg(unix)]
impl Connection for std::os::unix::net::UnixStream {
    fn close(self) -> io::Result<()> {
        shutdown_result(self.shutdown(Shutdown::Both))
    }
}

// src/pool/mod.rs
//! Bounded connection pool and its pooled connection wrapper.

pub(crate) mod bounded;
pub(crate) mod config;
pub(crate) mod pooled;
pub(crate) mod queue;
pub(crate) mod stats;

pub use bounded::{ConnectionPool, Pool};
pub use config::PoolConfig;
pub use pooled::PooledConn;
pub use stats::PoolStats;

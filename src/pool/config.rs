// src/pool/config.rs
//! Configuration for connection pools

use crate::error::{PoolError, Result};

/// Capacity settings for a [`crate::Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of connections opened eagerly at construction
    pub init_cap: isize,
    /// Maximum number of idle connections kept for reuse
    pub max_cap: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            init_cap: 5,
            max_cap: 30,
        }
    }
}

impl PoolConfig {
    /// No eager connections; the pool fills as handles are returned.
    pub fn lazy(max_cap: usize) -> Self {
        Self {
            init_cap: 0,
            max_cap,
        }
    }

    /// Opens `max_cap` connections up front.
    pub fn eager(max_cap: usize) -> Self {
        Self {
            init_cap: isize::try_from(max_cap).unwrap_or(isize::MAX),
            max_cap,
        }
    }

    /// Checks `0 <= init_cap <= max_cap` and `max_cap > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidCapacity`] when the settings cannot describe
    /// a working pool.
    pub fn validate(&self) -> Result<()> {
        let fits = usize::try_from(self.init_cap).is_ok_and(|init| init <= self.max_cap);
        if !fits || self.max_cap == 0 {
            return Err(PoolError::InvalidCapacity {
                init_cap: self.init_cap,
                max_cap: self.max_cap,
            });
        }
        Ok(())
    }

    /// `init_cap` as a count; only meaningful after [`validate`](Self::validate).
    pub(crate) fn initial(&self) -> usize {
        usize::try_from(self.init_cap).unwrap_or(0)
    }
}

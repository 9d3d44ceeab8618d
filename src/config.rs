//! Pool configuration: worker counts, stack size, and dispatcher backoff
//! bounds, loadable from JSON or environment variables.

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Default worker stack size.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Configuration for a [`crate::direct_pool::DirectPool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads to spawn.
    pub worker_count: usize,
    /// Stack size, in bytes, for each worker thread.
    pub stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { worker_count: num_cpus::get(), stack_size: DEFAULT_STACK_SIZE }
    }
}

impl PoolConfig {
    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `stack_size` is zero. A
    /// `worker_count` of zero is valid (see [`crate::direct_pool::DirectPool::new`]).
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.stack_size == 0 {
            return Err(PoolError::InvalidConfig("stack_size must be greater than 0".into()));
        }
        Ok(())
    }

    /// Parses a `PoolConfig` from a JSON string and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the input fails to parse or
    /// the parsed configuration fails validation.
    pub fn from_json_str(input: &str) -> Result<Self, PoolError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| PoolError::InvalidConfig(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a `PoolConfig` from `WORKER_POOL_SIZE` / `WORKER_POOL_STACK_SIZE`
    /// environment variables (loading a `.env` file first, if present),
    /// falling back to [`PoolConfig::default`] for any variable that is
    /// absent or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        let worker_count = std::env::var("WORKER_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.worker_count);
        let stack_size = std::env::var("WORKER_POOL_STACK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.stack_size);
        Self { worker_count, stack_size }
    }
}

/// Configuration for a [`crate::queued_pool::QueuedPool`]: a [`PoolConfig`]
/// for the underlying worker roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPoolConfig {
    /// The underlying worker pool's configuration.
    #[serde(flatten)]
    pub pool: PoolConfig,
}

impl Default for QueuedPoolConfig {
    fn default() -> Self {
        Self { pool: PoolConfig::default() }
    }
}

impl QueuedPoolConfig {
    /// Validates this configuration by delegating to [`PoolConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`], if the underlying pool
    /// configuration is invalid.
    pub fn validate(&self) -> Result<(), PoolError> {
        self.pool.validate()
    }
}

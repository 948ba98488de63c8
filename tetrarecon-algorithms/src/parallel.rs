//! Parallel processing utilities
//!
//! Normal estimation, grid sampling and cell classification are all
//! parallel-for loops over independent items. They go through the helpers in
//! this module so one configuration controls the pool they run on. Until
//! [`init_thread_pool`] is called, work runs on rayon's global pool.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, OnceLock};
use tetrarecon_core::{Error, Result};
use tracing::debug;

static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();
static THREAD_POOL_CONFIG: Mutex<ThreadPoolConfig> = Mutex::new(ThreadPoolConfig::new());

/// Thread pool configuration for parallel processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPoolConfig {
    /// Number of threads to use (None = rayon's choice)
    pub num_threads: Option<usize>,
    /// Thread stack size in bytes
    pub stack_size: Option<usize>,
    /// Thread name prefix
    pub thread_name_prefix: String,
    /// Enable parallel processing (can be disabled for debugging)
    pub enabled: bool,
    /// Inputs shorter than this run sequentially
    pub min_parallel_len: usize,
}

impl ThreadPoolConfig {
    const fn new() -> Self {
        Self {
            num_threads: None,
            stack_size: None,
            thread_name_prefix: String::new(),
            enabled: true,
            min_parallel_len: 64,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Enable or disable parallel processing
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_parallel_len(mut self, min_parallel_len: usize) -> Self {
        self.min_parallel_len = min_parallel_len;
        self
    }

    fn runs_parallel(&self, len: usize) -> bool {
        self.enabled && len >= self.min_parallel_len
    }
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "tetrarecon".to_string(),
            ..Self::new()
        }
    }
}

/// Build the dedicated thread pool used by every parallel helper
///
/// The pool can be built once per process; a second call only updates the
/// `enabled` and `min_parallel_len` settings.
pub fn init_thread_pool(config: ThreadPoolConfig) -> Result<()> {
    if THREAD_POOL.get().is_none() {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        if !config.thread_name_prefix.is_empty() {
            let prefix = config.thread_name_prefix.clone();
            builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
        }

        let pool = builder
            .build()
            .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))?;
        debug!("Thread pool ready with {} threads", pool.current_num_threads());
        // Lost races leave the other caller's pool in place
        let _ = THREAD_POOL.set(pool);
    }

    if let Ok(mut global_config) = THREAD_POOL_CONFIG.lock() {
        *global_config = config;
    }
    Ok(())
}

/// Get current thread pool configuration
pub fn get_config() -> ThreadPoolConfig {
    THREAD_POOL_CONFIG
        .lock()
        .map(|config| config.clone())
        .unwrap_or_default()
}

/// Number of worker threads parallel helpers will use
pub fn current_num_threads() -> usize {
    match THREAD_POOL.get() {
        Some(pool) => pool.current_num_threads(),
        None => rayon::current_num_threads(),
    }
}

/// Execute an operation inside the configured pool
pub fn execute_parallel<F, R>(op: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match THREAD_POOL.get() {
        Some(pool) if get_config().enabled => pool.install(op),
        _ => op(),
    }
}

/// Parallel map preserving input order
pub fn parallel_map<T, U, F>(data: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    map_with(&get_config(), data, f)
}

/// Parallel map over `0..len`, preserving index order
pub fn parallel_map_range<U, F>(len: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    if !get_config().runs_parallel(len) {
        return (0..len).map(f).collect();
    }
    execute_parallel(|| (0..len).into_par_iter().map(f).collect())
}

fn map_with<T, U, F>(config: &ThreadPoolConfig, data: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if !config.runs_parallel(data.len()) {
        return data.iter().map(f).collect();
    }
    execute_parallel(|| data.par_iter().map(f).collect())
}

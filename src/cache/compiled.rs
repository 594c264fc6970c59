//! In-memory cache of compiled SQL.

use chrono::NaiveDate;
use moka::sync::Cache;
use std::time::Duration;
use tracing::{trace, warn};

use crate::config::CacheSettings;
use crate::error::{ExpressionError, ExpressionResult};
use crate::sql::DEFAULT_TABLE_ALIAS;
use crate::validation::ExpectedType;

/// Default initial capacity (entries).
pub const DEFAULT_INITIAL_CAPACITY: usize = 10_000;

/// Default maximum capacity (entries).
pub const DEFAULT_MAX_CAPACITY: u64 = 50_000;

/// Default idle expiry (10 hours).
pub const DEFAULT_TIME_TO_IDLE_SECS: u64 = 10 * 60 * 60;

/// What compiled SQL is cached under.
///
/// The table alias and expected type default to `ax` and `Numeric`; both
/// change the generated SQL, so they are part of the key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SqlCacheKey {
    pub expression: String,
    pub program_indicator_uid: String,
    pub reporting_start_date: NaiveDate,
    pub reporting_end_date: NaiveDate,
    pub table_alias: String,
    pub expected: ExpectedType,
}

impl SqlCacheKey {
    pub fn new(
        expression: impl Into<String>,
        program_indicator_uid: impl Into<String>,
        reporting_start_date: NaiveDate,
        reporting_end_date: NaiveDate,
    ) -> Self {
        Self {
            expression: expression.into(),
            program_indicator_uid: program_indicator_uid.into(),
            reporting_start_date,
            reporting_end_date,
            table_alias: DEFAULT_TABLE_ALIAS.to_string(),
            expected: ExpectedType::Numeric,
        }
    }

    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = alias.into();
        self
    }

    pub fn expecting(mut self, expected: ExpectedType) -> Self {
        self.expected = expected;
        self
    }
}

/// A cached compilation outcome. Failures are cached too, so a known-bad
/// expression is not recompiled on every request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledSql {
    Sql(String),
    Invalid(String),
}

/// Compiled SQL keyed by expression and reporting window.
///
/// Entries are evicted least-recently-used past the maximum capacity and
/// expire after sitting idle. Metadata changes do not invalidate entries.
#[derive(Clone)]
pub struct CompiledSqlCache {
    entries: Option<Cache<SqlCacheKey, CompiledSql>>,
}

impl CompiledSqlCache {
    /// Create a cache with the default capacity and expiry.
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_INITIAL_CAPACITY,
            DEFAULT_MAX_CAPACITY,
            Duration::from_secs(DEFAULT_TIME_TO_IDLE_SECS),
        )
    }

    /// Create a cache with custom capacity and idle expiry.
    pub fn with_config(initial_capacity: usize, max_capacity: u64, time_to_idle: Duration) -> Self {
        let entries = Cache::builder()
            .initial_capacity(initial_capacity)
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        Self {
            entries: Some(entries),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }
        Self::with_config(
            settings.initial_capacity,
            settings.max_capacity,
            Duration::from_secs(settings.time_to_idle_seconds),
        )
    }

    /// A cache that stores nothing and computes on every call.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Return the cached SQL for `key`, compiling it with `compute` on a miss.
    ///
    /// Concurrent callers asking for the same missing key wait for a single
    /// computation. A failed compilation is cached and later lookups return
    /// `CacheComputeFailure` without calling `compute`.
    pub fn get_or_compute<F>(&self, key: SqlCacheKey, compute: F) -> ExpressionResult<String>
    where
        F: FnOnce() -> ExpressionResult<String>,
    {
        let Some(entries) = &self.entries else {
            return compute();
        };

        trace!(expression = %key.expression, "compiled SQL cache lookup");
        let mut computed_error = None;
        let entry = entries.get_with_by_ref(&key, || match compute() {
            Ok(sql) => CompiledSql::Sql(sql),
            Err(err) => {
                warn!(expression = %key.expression, error = %err, "caching invalid expression");
                let message = err.to_string();
                computed_error = Some(err);
                CompiledSql::Invalid(message)
            }
        });

        match (entry, computed_error) {
            (_, Some(err)) => Err(err),
            (CompiledSql::Sql(sql), None) => Ok(sql),
            (CompiledSql::Invalid(message), None) => Err(ExpressionError::CacheComputeFailure(message)),
        }
    }

    /// Look a key up without computing.
    pub fn get(&self, key: &SqlCacheKey) -> Option<CompiledSql> {
        self.entries.as_ref().and_then(|entries| entries.get(key))
    }

    /// Number of cached entries, after pending maintenance has run.
    pub fn entry_count(&self) -> u64 {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks();
                entries.entry_count()
            }
            None => 0,
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
        }
    }
}

impl Default for CompiledSqlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompiledSqlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSqlCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

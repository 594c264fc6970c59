//! Caching of compiled SQL.
//!
//! Compiling an expression to SQL resolves every item it references, so the
//! result is cached per expression and reporting window:
//!
//! ```text
//! (expression, program indicator, start, end) -> Sql(..) | Invalid(..)
//! ```

mod compiled;

pub use compiled::{
    CompiledSql, CompiledSqlCache, SqlCacheKey, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY,
    DEFAULT_TIME_TO_IDLE_SECS,
};

//! # Program Indicator Engine
//!
//! Parses, validates, describes and compiles DHIS2 program indicator
//! expressions into PostgreSQL fragments over the analytics tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Expression text  (#{ps.de} + d2:zing(A{a}))       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dsl: lexer + parser]
//! ┌─────────────────────────────────────────────────────────┐
//! │                         AST                              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!          ┌───────────────┼────────────────┐
//!          ▼               ▼                ▼
//!    [validation]     [describe]         [sql]
//!    type inference   display names      PostgreSQL
//!                                           │
//!                                           ▼ [cache]
//!                                    compiled SQL, keyed by
//!                                    expression and window
//! ```
//!
//! Every pass resolves items through a [`metadata::MetadataResolver`] and
//! dispatches functions through the [`registry`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use pi_engine::prelude::*;
//!
//! let metadata = InMemoryMetadata::new()
//!     .with_program_stage("ProgrmStagA", "Birth")
//!     .with_data_element("DataElmentA", "Weight", ValueType::Number);
//! let engine = ProgramIndicatorEngine::new(Arc::new(metadata));
//!
//! let date = NaiveDate::from_ymd_opt(2020, 1, 9).unwrap();
//! let context = ProgramIndicatorContext::event("ProgrmIndA1", "Program000A", date, date);
//! let sql = engine.analytics_sql("#{ProgrmStagA.DataElmentA} * 2", &context).unwrap();
//! assert_eq!(sql, "coalesce(\"DataElmentA\"::numeric,0) * 2");
//! ```

pub mod cache;
pub mod config;
pub mod describe;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod sql;
pub mod validation;
pub mod visitor;

pub use engine::ProgramIndicatorEngine;
pub use error::{ExpressionError, ExpressionResult};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CompiledSqlCache, SqlCacheKey};
    pub use crate::config::EngineSettings;
    pub use crate::describe::{DefaultI18n, I18n, MapI18n};
    pub use crate::engine::ProgramIndicatorEngine;
    pub use crate::error::{ExpressionError, ExpressionResult};
    pub use crate::metadata::{InMemoryMetadata, MetadataResolver, ValueType};
    pub use crate::registry::DataType;
    pub use crate::sql::{
        AnalyticsPeriodBoundary, AnalyticsType, BoundaryType, PeriodType, ProgramIndicatorContext,
    };
    pub use crate::validation::{ExpectedType, ValidationOutcome, ValidationReport};
}

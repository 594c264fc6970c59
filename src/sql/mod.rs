//! SQL generation for program indicator expressions.
//!
//! Expressions compile to PostgreSQL fragments over the analytics tables:
//!
//! - `ax` is the outer analytics row (event or enrollment); callers nesting
//!   the fragment elsewhere set their own alias on the context
//! - `analytics_event_<programUid>` holds one row per event, used by the
//!   correlated subqueries of enrollment indicators and `d2:count*`
//!
//! ```text
//! #{stage.de}   EVENT       "de"
//!               ENROLLMENT  (select "de" from analytics_event_<p> where ... order by executiondate desc limit 1 )
//! ```

mod context;
mod functions;
mod generator;
mod quote;
mod variables;

#[cfg(test)]
pub(crate) mod test_utils;

pub use context::{
    AnalyticsPeriodBoundary, AnalyticsType, BoundaryOffset, BoundaryType, PeriodType,
    ProgramIndicatorContext, DEFAULT_TABLE_ALIAS,
};
pub use generator::SqlGenerator;
pub use quote::{quote_identifier, quote_string};

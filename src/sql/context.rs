//! The indicator context every SQL generation runs in.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dsl::ItemKind;

use super::quote::quote_string;

/// Alias of the outer analytics table subqueries correlate with.
pub const DEFAULT_TABLE_ALIAS: &str = "ax";

fn default_table_alias() -> String {
    DEFAULT_TABLE_ALIAS.to_string()
}

/// Whether the indicator aggregates events or enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsType {
    Event,
    Enrollment,
}

impl AnalyticsType {
    /// The analytics column holding the values of a data element or
    /// attribute, or `None` for other items.
    ///
    /// Enrollment analytics store stage data elements as `<stage>_<element>`.
    pub fn value_column(self, item: &ItemKind) -> Option<String> {
        match item {
            ItemKind::StageDataElement {
                program_stage,
                data_element,
            } => Some(match self {
                AnalyticsType::Event => data_element.clone(),
                AnalyticsType::Enrollment => format!("{}_{}", program_stage, data_element),
            }),
            ItemKind::Attribute(uid) => Some(uid.clone()),
            _ => None,
        }
    }
}

/// Where an event boundary sits relative to the reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryType {
    BeforeStartOfReportingPeriod,
    BeforeEndOfReportingPeriod,
    AfterStartOfReportingPeriod,
    AfterEndOfReportingPeriod,
}

impl BoundaryType {
    fn is_end_of_period(self) -> bool {
        matches!(
            self,
            BoundaryType::BeforeEndOfReportingPeriod | BoundaryType::AfterEndOfReportingPeriod
        )
    }

    fn is_before(self) -> bool {
        matches!(
            self,
            BoundaryType::BeforeStartOfReportingPeriod | BoundaryType::BeforeEndOfReportingPeriod
        )
    }
}

/// Unit of a boundary offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
}

/// Shift a boundary by a number of periods (negative moves it earlier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryOffset {
    pub periods: i32,
    pub period_type: PeriodType,
}

impl BoundaryOffset {
    fn apply(&self, date: NaiveDate) -> NaiveDate {
        let months = |n: i32| -> Option<NaiveDate> {
            let step = Months::new(n.unsigned_abs());
            if n >= 0 {
                date.checked_add_months(step)
            } else {
                date.checked_sub_months(step)
            }
        };
        let shifted = match self.period_type {
            PeriodType::Days => date.checked_add_signed(Duration::days(self.periods.into())),
            PeriodType::Weeks => date.checked_add_signed(Duration::weeks(self.periods.into())),
            PeriodType::Months => months(self.periods),
            PeriodType::Quarters => months(self.periods.saturating_mul(3)),
            PeriodType::Years => months(self.periods.saturating_mul(12)),
        };
        shifted.unwrap_or_else(|| {
            warn!(%date, offset = ?self, "boundary offset out of range, using unshifted date");
            date
        })
    }
}

/// A constraint on which events' dates count towards the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPeriodBoundary {
    pub boundary_type: BoundaryType,
    #[serde(default)]
    pub offset: Option<BoundaryOffset>,
}

impl AnalyticsPeriodBoundary {
    pub fn new(boundary_type: BoundaryType) -> Self {
        Self {
            boundary_type,
            offset: None,
        }
    }

    pub fn with_offset(mut self, periods: i32, period_type: PeriodType) -> Self {
        self.offset = Some(BoundaryOffset {
            periods,
            period_type,
        });
        self
    }

    /// The date the boundary compares against.
    ///
    /// End-of-period boundaries are exclusive, so they move to the day after
    /// the (offset) reporting end date.
    pub fn boundary_date(&self, reporting_start: NaiveDate, reporting_end: NaiveDate) -> NaiveDate {
        let base = if self.boundary_type.is_end_of_period() {
            reporting_end
        } else {
            reporting_start
        };
        let date = self.offset.map_or(base, |offset| offset.apply(base));
        if self.boundary_type.is_end_of_period() {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// `executiondate < cast( '2020-01-10' as date )` and the like.
    pub fn sql(&self, reporting_start: NaiveDate, reporting_end: NaiveDate) -> String {
        let operator = if self.boundary_type.is_before() { "<" } else { ">=" };
        let date = self.boundary_date(reporting_start, reporting_end);
        format!(
            "executiondate {} cast( {} as date )",
            operator,
            quote_string(&date.format("%Y-%m-%d").to_string())
        )
    }
}

/// Everything SQL generation needs to know about the indicator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramIndicatorContext {
    pub program_indicator_uid: String,
    pub program_uid: String,
    pub analytics_type: AnalyticsType,
    pub reporting_start_date: NaiveDate,
    pub reporting_end_date: NaiveDate,
    #[serde(default)]
    pub start_event_boundary: Option<AnalyticsPeriodBoundary>,
    #[serde(default)]
    pub end_event_boundary: Option<AnalyticsPeriodBoundary>,
    /// Alias of the enclosing analytics table.
    #[serde(default = "default_table_alias")]
    pub table_alias: String,
}

impl ProgramIndicatorContext {
    pub fn new(
        program_indicator_uid: impl Into<String>,
        program_uid: impl Into<String>,
        analytics_type: AnalyticsType,
        reporting_start_date: NaiveDate,
        reporting_end_date: NaiveDate,
    ) -> Self {
        Self {
            program_indicator_uid: program_indicator_uid.into(),
            program_uid: program_uid.into(),
            analytics_type,
            reporting_start_date,
            reporting_end_date,
            start_event_boundary: None,
            end_event_boundary: None,
            table_alias: default_table_alias(),
        }
    }

    pub fn event(
        program_indicator_uid: impl Into<String>,
        program_uid: impl Into<String>,
        reporting_start_date: NaiveDate,
        reporting_end_date: NaiveDate,
    ) -> Self {
        Self::new(
            program_indicator_uid,
            program_uid,
            AnalyticsType::Event,
            reporting_start_date,
            reporting_end_date,
        )
    }

    pub fn enrollment(
        program_indicator_uid: impl Into<String>,
        program_uid: impl Into<String>,
        reporting_start_date: NaiveDate,
        reporting_end_date: NaiveDate,
    ) -> Self {
        Self::new(
            program_indicator_uid,
            program_uid,
            AnalyticsType::Enrollment,
            reporting_start_date,
            reporting_end_date,
        )
    }

    pub fn with_start_boundary(mut self, boundary: AnalyticsPeriodBoundary) -> Self {
        self.start_event_boundary = Some(boundary);
        self
    }

    pub fn with_end_boundary(mut self, boundary: AnalyticsPeriodBoundary) -> Self {
        self.end_event_boundary = Some(boundary);
        self
    }

    /// Correlate subqueries with an outer table other than `ax`.
    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = alias.into();
        self
    }

    /// `analytics_event_<programUid>`
    pub fn event_table(&self) -> String {
        format!("analytics_event_{}", self.program_uid)
    }

    /// SQL conditions for the event boundaries, end boundary first.
    pub fn boundary_conditions(&self) -> Vec<String> {
        [self.end_event_boundary, self.start_event_boundary]
            .iter()
            .flatten()
            .map(|b| b.sql(self.reporting_start_date, self.reporting_end_date))
            .collect()
    }

    /// The boundary conditions, each prefixed with ` and `.
    pub(crate) fn boundary_clause(&self) -> String {
        self.boundary_conditions()
            .iter()
            .map(|c| format!(" and {}", c))
            .collect()
    }
}

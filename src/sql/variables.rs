//! SQL for program variables.

use crate::registry::ProgramVariable;

use super::context::AnalyticsType;
use super::generator::SqlGenerator;
use super::quote::quote_string;

impl SqlGenerator<'_> {
    pub(super) fn variable_sql(&self, variable: ProgramVariable) -> String {
        let event_type = self.context.analytics_type == AnalyticsType::Event;
        let date = |d: chrono::NaiveDate| quote_string(&d.format("%Y-%m-%d").to_string());

        match variable {
            ProgramVariable::AnalyticsPeriodStart => date(self.context.reporting_start_date),
            ProgramVariable::AnalyticsPeriodEnd | ProgramVariable::ReportDate => {
                date(self.context.reporting_end_date)
            }
            ProgramVariable::CurrentDate => date(self.today),
            ProgramVariable::CompletedDate => "completeddate".to_string(),
            ProgramVariable::CreationDate => "created".to_string(),
            ProgramVariable::DueDate => "duedate".to_string(),
            ProgramVariable::EnrollmentCount => "distinct pi".to_string(),
            ProgramVariable::EnrollmentDate => "enrollmentdate".to_string(),
            ProgramVariable::EnrollmentId => "pi".to_string(),
            ProgramVariable::EnrollmentStatus => "enrollmentstatus".to_string(),
            ProgramVariable::EventCount => "distinct psi".to_string(),
            ProgramVariable::EventDate if event_type => "executiondate".to_string(),
            ProgramVariable::EventDate => self.latest_event_value("executiondate", None),
            ProgramVariable::EventStatus => "psistatus".to_string(),
            ProgramVariable::IncidentDate => "incidentdate".to_string(),
            ProgramVariable::OrgUnitCount => "distinct ou".to_string(),
            ProgramVariable::ProgramStageId if event_type => "ps".to_string(),
            ProgramVariable::ProgramStageName if event_type => {
                "(select name from programstage where uid = ps)".to_string()
            }
            ProgramVariable::ProgramStageId | ProgramVariable::ProgramStageName => "''".to_string(),
            ProgramVariable::TeiCount => "distinct tei".to_string(),
            ProgramVariable::ValueCount => self.value_count_sql("is not null"),
            ProgramVariable::ZeroPosValueCount => self.value_count_sql(">= 0"),
        }
    }

    /// How many of the expression's data elements and attributes match `test`.
    fn value_count_sql(&self, test: &str) -> String {
        if self.value_columns.is_empty() {
            return "0".to_string();
        }
        let terms: Vec<String> = self
            .value_columns
            .iter()
            .map(|column| format!("case when {} {} then 1 else 0 end", column, test))
            .collect();
        format!(
            "nullif(cast(({}) as double precision),0)",
            terms.join(" + ")
        )
    }
}

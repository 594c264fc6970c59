//! Program variables: `V{name}`.

use super::value::DataType;

/// The fixed set of program variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramVariable {
    AnalyticsPeriodEnd,
    AnalyticsPeriodStart,
    CompletedDate,
    CreationDate,
    CurrentDate,
    DueDate,
    EnrollmentCount,
    EnrollmentDate,
    EnrollmentId,
    EnrollmentStatus,
    EventCount,
    EventDate,
    EventStatus,
    IncidentDate,
    OrgUnitCount,
    ProgramStageId,
    ProgramStageName,
    ReportDate,
    TeiCount,
    ValueCount,
    ZeroPosValueCount,
}

impl ProgramVariable {
    pub const ALL: [ProgramVariable; 21] = [
        ProgramVariable::AnalyticsPeriodEnd,
        ProgramVariable::AnalyticsPeriodStart,
        ProgramVariable::CompletedDate,
        ProgramVariable::CreationDate,
        ProgramVariable::CurrentDate,
        ProgramVariable::DueDate,
        ProgramVariable::EnrollmentCount,
        ProgramVariable::EnrollmentDate,
        ProgramVariable::EnrollmentId,
        ProgramVariable::EnrollmentStatus,
        ProgramVariable::EventCount,
        ProgramVariable::EventDate,
        ProgramVariable::EventStatus,
        ProgramVariable::IncidentDate,
        ProgramVariable::OrgUnitCount,
        ProgramVariable::ProgramStageId,
        ProgramVariable::ProgramStageName,
        ProgramVariable::ReportDate,
        ProgramVariable::TeiCount,
        ProgramVariable::ValueCount,
        ProgramVariable::ZeroPosValueCount,
    ];

    /// Look a variable up by the name written inside `V{..}`.
    pub fn from_name(name: &str) -> Option<Self> {
        let variable = match name {
            "analytics_period_end" | "reporting_period_end" => ProgramVariable::AnalyticsPeriodEnd,
            "analytics_period_start" | "reporting_period_start" => {
                ProgramVariable::AnalyticsPeriodStart
            }
            "completed_date" => ProgramVariable::CompletedDate,
            "creation_date" => ProgramVariable::CreationDate,
            "current_date" => ProgramVariable::CurrentDate,
            "due_date" => ProgramVariable::DueDate,
            "enrollment_count" => ProgramVariable::EnrollmentCount,
            "enrollment_date" => ProgramVariable::EnrollmentDate,
            "enrollment_id" => ProgramVariable::EnrollmentId,
            "enrollment_status" => ProgramVariable::EnrollmentStatus,
            "event_count" => ProgramVariable::EventCount,
            "event_date" | "execution_date" => ProgramVariable::EventDate,
            "event_status" => ProgramVariable::EventStatus,
            "incident_date" => ProgramVariable::IncidentDate,
            "org_unit_count" => ProgramVariable::OrgUnitCount,
            "program_stage_id" => ProgramVariable::ProgramStageId,
            "program_stage_name" => ProgramVariable::ProgramStageName,
            "report_date" => ProgramVariable::ReportDate,
            "tei_count" => ProgramVariable::TeiCount,
            "value_count" => ProgramVariable::ValueCount,
            "zero_pos_value_count" => ProgramVariable::ZeroPosValueCount,
            _ => return None,
        };
        Some(variable)
    }

    /// Canonical name, also the i18n key for its display name.
    pub fn name(self) -> &'static str {
        match self {
            ProgramVariable::AnalyticsPeriodEnd => "analytics_period_end",
            ProgramVariable::AnalyticsPeriodStart => "analytics_period_start",
            ProgramVariable::CompletedDate => "completed_date",
            ProgramVariable::CreationDate => "creation_date",
            ProgramVariable::CurrentDate => "current_date",
            ProgramVariable::DueDate => "due_date",
            ProgramVariable::EnrollmentCount => "enrollment_count",
            ProgramVariable::EnrollmentDate => "enrollment_date",
            ProgramVariable::EnrollmentId => "enrollment_id",
            ProgramVariable::EnrollmentStatus => "enrollment_status",
            ProgramVariable::EventCount => "event_count",
            ProgramVariable::EventDate => "event_date",
            ProgramVariable::EventStatus => "event_status",
            ProgramVariable::IncidentDate => "incident_date",
            ProgramVariable::OrgUnitCount => "org_unit_count",
            ProgramVariable::ProgramStageId => "program_stage_id",
            ProgramVariable::ProgramStageName => "program_stage_name",
            ProgramVariable::ReportDate => "report_date",
            ProgramVariable::TeiCount => "tei_count",
            ProgramVariable::ValueCount => "value_count",
            ProgramVariable::ZeroPosValueCount => "zero_pos_value_count",
        }
    }

    /// Static result type of the variable.
    pub fn data_type(self) -> DataType {
        match self {
            ProgramVariable::AnalyticsPeriodEnd
            | ProgramVariable::AnalyticsPeriodStart
            | ProgramVariable::CompletedDate
            | ProgramVariable::CreationDate
            | ProgramVariable::CurrentDate
            | ProgramVariable::DueDate
            | ProgramVariable::EnrollmentDate
            | ProgramVariable::EventDate
            | ProgramVariable::IncidentDate
            | ProgramVariable::ReportDate => DataType::Date,

            ProgramVariable::EnrollmentCount
            | ProgramVariable::EventCount
            | ProgramVariable::OrgUnitCount
            | ProgramVariable::TeiCount
            | ProgramVariable::ValueCount
            | ProgramVariable::ZeroPosValueCount => DataType::Number,

            ProgramVariable::EnrollmentId
            | ProgramVariable::EnrollmentStatus
            | ProgramVariable::EventStatus
            | ProgramVariable::ProgramStageId
            | ProgramVariable::ProgramStageName => DataType::Text,
        }
    }
}

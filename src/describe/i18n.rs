//! Localized display names for program variables.

use std::collections::HashMap;

/// Source of localized strings, keyed by message id.
///
/// Program variable names are looked up by their canonical name
/// (`enrollment_date`, `event_count`, ...).
pub trait I18n: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
}

/// English display names.
#[derive(Debug, Clone, Default)]
pub struct DefaultI18n;

const ENGLISH: &[(&str, &str)] = &[
    ("analytics_period_end", "Analytics period end"),
    ("analytics_period_start", "Analytics period start"),
    ("completed_date", "Completed date"),
    ("creation_date", "Creation date"),
    ("current_date", "Current date"),
    ("due_date", "Due date"),
    ("enrollment_count", "Enrollment count"),
    ("enrollment_date", "Enrollment date"),
    ("enrollment_id", "Enrollment ID"),
    ("enrollment_status", "Enrollment status"),
    ("event_count", "Event count"),
    ("event_date", "Event date"),
    ("event_status", "Event status"),
    ("incident_date", "Incident date"),
    ("org_unit_count", "Organisation unit count"),
    ("program_stage_id", "Program stage ID"),
    ("program_stage_name", "Program stage name"),
    ("report_date", "Report date"),
    ("tei_count", "Tracked entity instance count"),
    ("value_count", "Value count"),
    ("zero_pos_value_count", "Zero or positive value count"),
];

impl I18n for DefaultI18n {
    fn get_string(&self, key: &str) -> Option<String> {
        ENGLISH
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

/// Strings supplied by the caller, falling back to English.
#[derive(Debug, Clone, Default)]
pub struct MapI18n {
    strings: HashMap<String, String>,
}

impl MapI18n {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }
}

impl I18n for MapI18n {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings
            .get(key)
            .cloned()
            .or_else(|| DefaultI18n.get_string(key))
    }
}

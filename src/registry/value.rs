//! Expression-level types and the sample values used to type-check.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The type an expression or sub-expression evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Number,
    Boolean,
    Date,
    Text,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Number => "Number",
            DataType::Boolean => "Boolean",
            DataType::Date => "Date",
            DataType::Text => "Text",
        };
        f.write_str(name)
    }
}

/// A stand-in value carried through validation in place of real data.
///
/// The validator evaluates operators on these so that, for example,
/// `'a' + 'b'` stays text while `1 + 2` stays numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Text(String),
}

impl SampleValue {
    /// The canned sample for a type.
    pub fn of(data_type: DataType) -> Self {
        match data_type {
            DataType::Number => SampleValue::Number(1.0),
            DataType::Boolean => SampleValue::Boolean(true),
            DataType::Date => {
                SampleValue::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default())
            }
            DataType::Text => SampleValue::Text("abc".to_string()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SampleValue::Number(_) => DataType::Number,
            SampleValue::Boolean(_) => DataType::Boolean,
            SampleValue::Date(_) => DataType::Date,
            SampleValue::Text(_) => DataType::Text,
        }
    }

    /// Compare two samples of the same type.
    ///
    /// Numbers compare as doubles with exact equality, text lexicographically.
    /// A date and a text value compare as text, so date columns can be
    /// compared with literals like `'2020-01-01'`.
    pub fn compare(&self, other: &SampleValue) -> Option<Ordering> {
        match (self, other) {
            (SampleValue::Number(a), SampleValue::Number(b)) => a.partial_cmp(b),
            (SampleValue::Boolean(a), SampleValue::Boolean(b)) => Some(a.cmp(b)),
            (SampleValue::Date(a), SampleValue::Date(b)) => Some(a.cmp(b)),
            (SampleValue::Text(a), SampleValue::Text(b)) => Some(a.cmp(b)),
            (SampleValue::Date(_), SampleValue::Text(_))
            | (SampleValue::Text(_), SampleValue::Date(_)) => {
                Some(self.to_string().cmp(&other.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Number(n) => write!(f, "{}", n),
            SampleValue::Boolean(b) => write!(f, "{}", b),
            SampleValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SampleValue::Text(s) => f.write_str(s),
        }
    }
}

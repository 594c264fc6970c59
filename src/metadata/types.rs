//! Metadata value types returned by a [`MetadataResolver`](super::MetadataResolver).

use serde::{Deserialize, Serialize};

use crate::registry::DataType;

/// Value type of a data element or tracked entity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Text,
    LongText,
    Letter,
    PhoneNumber,
    Email,
    Boolean,
    TrueOnly,
    Date,
    Datetime,
    Time,
    Number,
    UnitInterval,
    Percentage,
    Integer,
    IntegerPositive,
    IntegerNegative,
    IntegerZeroOrPositive,
    TrackerAssociate,
    Username,
    Coordinate,
    OrganisationUnit,
    Age,
    Url,
    FileResource,
    Image,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Number
                | ValueType::UnitInterval
                | ValueType::Percentage
                | ValueType::Integer
                | ValueType::IntegerPositive
                | ValueType::IntegerNegative
                | ValueType::IntegerZeroOrPositive
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, ValueType::Boolean | ValueType::TrueOnly)
    }

    pub fn is_date(self) -> bool {
        matches!(self, ValueType::Date | ValueType::Datetime | ValueType::Age)
    }

    /// The expression-level type values of this kind take part in.
    pub fn data_type(self) -> DataType {
        if self.is_numeric() {
            DataType::Number
        } else if self.is_boolean() {
            DataType::Boolean
        } else if self.is_date() {
            DataType::Date
        } else {
            DataType::Text
        }
    }
}

/// A data element or attribute as seen by the expression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMetadataItem {
    pub uid: String,
    pub display_name: String,
    pub value_type: ValueType,
}

impl ResolvedMetadataItem {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            value_type,
        }
    }
}

/// A constant: display name plus its numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConstant {
    pub uid: String,
    pub display_name: String,
    pub value: f64,
}

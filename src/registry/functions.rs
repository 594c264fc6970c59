//! The closed set of functions an expression may call.
//!
//! Each [`FunctionKind`] variant has one handler per pass (validation, SQL,
//! description). Adding a function means adding a variant here and a match
//! arm in each pass; the compiler points at every arm that is missing.

use std::fmt;

use crate::dsl::FunctionNamespace;

/// Units for the `d2:*Between` date-difference functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    Minutes,
    Days,
    Weeks,
    Months,
    Years,
}

/// Vector aggregates over repeated-stage values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Avg,
    Count,
    Max,
    Min,
    Stddev,
    Sum,
    Variance,
}

impl AggregateFunction {
    /// The SQL aggregate with the same meaning.
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Stddev => "stddev",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Variance => "variance",
        }
    }
}

/// Every function known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    // d2: program functions
    Condition,
    Count,
    CountIfCondition,
    CountIfValue,
    Between(DateUnit),
    HasValue,
    MaxValue,
    MinValue,
    Oizp,
    RelationshipCount,
    Zing,
    Zpvc,

    // Unprefixed functions
    Aggregate(AggregateFunction),
    If,
    IsNull,
    IsNotNull,
    Coalesce,
    Greatest,
    Least,
}

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

impl FunctionKind {
    /// Find the function for a name in the given namespace.
    pub fn lookup(namespace: FunctionNamespace, name: &str) -> Option<Self> {
        match namespace {
            FunctionNamespace::D2 => Self::lookup_d2(name),
            FunctionNamespace::Plain => Self::lookup_plain(name),
        }
    }

    fn lookup_d2(name: &str) -> Option<Self> {
        let kind = match name {
            "condition" => FunctionKind::Condition,
            "count" => FunctionKind::Count,
            "countIfCondition" => FunctionKind::CountIfCondition,
            "countIfValue" => FunctionKind::CountIfValue,
            "minutesBetween" => FunctionKind::Between(DateUnit::Minutes),
            "daysBetween" => FunctionKind::Between(DateUnit::Days),
            "weeksBetween" => FunctionKind::Between(DateUnit::Weeks),
            "monthsBetween" => FunctionKind::Between(DateUnit::Months),
            "yearsBetween" => FunctionKind::Between(DateUnit::Years),
            "hasValue" => FunctionKind::HasValue,
            "maxValue" => FunctionKind::MaxValue,
            "minValue" => FunctionKind::MinValue,
            "oizp" => FunctionKind::Oizp,
            "relationshipCount" => FunctionKind::RelationshipCount,
            "zing" => FunctionKind::Zing,
            "zpvc" => FunctionKind::Zpvc,
            _ => return None,
        };
        Some(kind)
    }

    fn lookup_plain(name: &str) -> Option<Self> {
        let kind = match name {
            "avg" => FunctionKind::Aggregate(AggregateFunction::Avg),
            "count" => FunctionKind::Aggregate(AggregateFunction::Count),
            "max" => FunctionKind::Aggregate(AggregateFunction::Max),
            "min" => FunctionKind::Aggregate(AggregateFunction::Min),
            "stddev" => FunctionKind::Aggregate(AggregateFunction::Stddev),
            "sum" => FunctionKind::Aggregate(AggregateFunction::Sum),
            "variance" => FunctionKind::Aggregate(AggregateFunction::Variance),
            "if" => FunctionKind::If,
            "isNull" => FunctionKind::IsNull,
            "isNotNull" => FunctionKind::IsNotNull,
            "coalesce" => FunctionKind::Coalesce,
            "greatest" => FunctionKind::Greatest,
            "least" => FunctionKind::Least,
            _ => return None,
        };
        Some(kind)
    }

    pub fn arity(self) -> Arity {
        match self {
            FunctionKind::Condition | FunctionKind::If => Arity::Exact(3),
            FunctionKind::CountIfCondition | FunctionKind::CountIfValue | FunctionKind::Between(_) => {
                Arity::Exact(2)
            }
            FunctionKind::Count
            | FunctionKind::HasValue
            | FunctionKind::MaxValue
            | FunctionKind::MinValue
            | FunctionKind::Oizp
            | FunctionKind::Zing
            | FunctionKind::Aggregate(_)
            | FunctionKind::IsNull
            | FunctionKind::IsNotNull => Arity::Exact(1),
            FunctionKind::RelationshipCount => Arity::Range(0, 1),
            FunctionKind::Zpvc
            | FunctionKind::Coalesce
            | FunctionKind::Greatest
            | FunctionKind::Least => Arity::AtLeast(1),
        }
    }

    /// Index of the string argument that holds a nested expression.
    pub fn condition_argument(self) -> Option<usize> {
        match self {
            FunctionKind::Condition => Some(0),
            FunctionKind::CountIfCondition => Some(1),
            _ => None,
        }
    }

    /// Whether arguments must be rendered without null replacement.
    pub fn suspends_null_replacement(self) -> bool {
        matches!(
            self,
            FunctionKind::HasValue
                | FunctionKind::Oizp
                | FunctionKind::Zpvc
                | FunctionKind::Between(_)
                | FunctionKind::Count
                | FunctionKind::CountIfCondition
                | FunctionKind::CountIfValue
                | FunctionKind::MaxValue
                | FunctionKind::MinValue
                | FunctionKind::IsNull
                | FunctionKind::IsNotNull
        )
    }
}

//! Error types shared by the parse, validate, describe and SQL passes.

use thiserror::Error;

use crate::dsl::Span;
use crate::registry::DataType;
use crate::validation::{ExpectedType, ValidationOutcome};

/// Errors raised while compiling a program indicator expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Malformed expression at {span:?}: {message}")]
    MalformedSyntax { message: String, span: Span },

    #[error("Program stage not found: {0}")]
    UnknownProgramStage(String),

    #[error("Data element not found: {data_element} (program stage {program_stage})")]
    UnknownDataElement {
        program_stage: String,
        data_element: String,
    },

    #[error("Tracked entity attribute not found: {0}")]
    UnknownAttribute(String),

    #[error("Constant not found: {0}")]
    UnknownConstant(String),

    #[error("Relationship type not found: {0}")]
    UnknownRelationshipType(String),

    #[error("Unknown program variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: DataType,
    },

    #[error("Expression evaluates to {found}, expected {expected}")]
    ResultTypeMismatch {
        expected: ExpectedType,
        found: DataType,
    },

    #[error("{function} expects {expected} argument(s), found {found}")]
    ArgumentCountMismatch {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Invalid argument to {function}: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("SQL generation failed earlier for this expression: {0}")]
    CacheComputeFailure(String),

    #[error("{source} in expression: {expression}")]
    InExpression {
        expression: String,
        source: Box<ExpressionError>,
    },
}

impl ExpressionError {
    /// Attach the text of the expression the error was raised in.
    ///
    /// Errors that already carry it, or that replay a cached failure, are
    /// returned unchanged.
    pub fn in_expression(self, expression: &str) -> Self {
        match self {
            ExpressionError::InExpression { .. } | ExpressionError::CacheComputeFailure(_) => self,
            other => ExpressionError::InExpression {
                expression: expression.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, without expression context.
    pub fn root(&self) -> &ExpressionError {
        match self {
            ExpressionError::InExpression { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the error is an unresolvable reference rather than a
    /// problem with the expression's shape or types.
    pub fn is_unknown_identifier(&self) -> bool {
        matches!(
            self.root(),
            ExpressionError::UnknownProgramStage(_)
                | ExpressionError::UnknownDataElement { .. }
                | ExpressionError::UnknownAttribute(_)
                | ExpressionError::UnknownConstant(_)
                | ExpressionError::UnknownRelationshipType(_)
                | ExpressionError::UnknownVariable(_)
        )
    }

    /// Classify the error into a validation outcome.
    pub fn outcome(&self) -> ValidationOutcome {
        match self.root() {
            e if e.is_unknown_identifier() => ValidationOutcome::InvalidIdentifiersInExpression,
            ExpressionError::ResultTypeMismatch {
                expected: ExpectedType::Boolean,
                ..
            } => ValidationOutcome::FilterNotEvaluatingToTrueOrFalse,
            _ => ValidationOutcome::ExpressionNotValid,
        }
    }

    pub(crate) fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: DataType,
    ) -> Self {
        ExpressionError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found,
        }
    }
}

/// Result type for expression operations.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

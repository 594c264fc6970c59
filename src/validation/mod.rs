//! Static validation of program indicator expressions.
//!
//! The validator walks the tree with canned [`SampleValue`]s standing in for
//! data, so every operator and function is checked against the types it
//! would see at run time. Along the way it records a description for every
//! item it resolves.

mod functions;

use serde::Serialize;
use std::fmt;

use crate::describe::{I18n, ItemDescriptions};
use crate::dsl::{BinaryOp, ExprNode, FunctionCall, ItemKind, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::metadata::MetadataResolver;
use crate::registry::{resolve_item, DataType, FunctionKind, ResolvedItem, SampleValue};
use crate::visitor::ExpressionVisitor;

/// The type an expression must evaluate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpectedType {
    /// Indicator expressions.
    Numeric,
    /// Filters.
    Boolean,
    Any,
}

impl ExpectedType {
    pub fn accepts(self, data_type: DataType) -> bool {
        match self {
            ExpectedType::Numeric => data_type == DataType::Number,
            ExpectedType::Boolean => data_type == DataType::Boolean,
            ExpectedType::Any => true,
        }
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpectedType::Numeric => "Number",
            ExpectedType::Boolean => "Boolean",
            ExpectedType::Any => "any type",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutcome {
    Valid,
    ExpressionNotValid,
    InvalidIdentifiersInExpression,
    FilterNotEvaluatingToTrueOrFalse,
}

impl ValidationOutcome {
    pub fn is_valid(self) -> bool {
        self == ValidationOutcome::Valid
    }
}

/// Everything validation found out about an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub expression: String,
    pub outcome: ValidationOutcome,
    /// The inferred type, when the expression was well-typed.
    pub data_type: Option<DataType>,
    /// Descriptions of the items resolved before validation stopped.
    pub descriptions: ItemDescriptions,
    pub error: Option<ExpressionError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    /// The expression with items replaced by their descriptions.
    pub fn description(&self) -> String {
        self.descriptions.substitute(&self.expression)
    }
}

/// Type-checks a tree and collects item descriptions.
pub struct Validator<'a> {
    pub(super) resolver: &'a dyn MetadataResolver,
    i18n: &'a dyn I18n,
    pub(super) descriptions: ItemDescriptions,
}

impl<'a> Validator<'a> {
    pub fn new(resolver: &'a dyn MetadataResolver, i18n: &'a dyn I18n) -> Self {
        Self {
            resolver,
            i18n,
            descriptions: ItemDescriptions::new(),
        }
    }

    /// Validate a parsed expression against the type it must produce.
    pub fn validate(
        mut self,
        expression: &str,
        tree: &ExprNode,
        expected: ExpectedType,
    ) -> ValidationReport {
        let result = self.visit(tree).and_then(|value| {
            let found = value.data_type();
            if expected.accepts(found) {
                Ok(found)
            } else {
                Err(ExpressionError::ResultTypeMismatch { expected, found })
            }
        });

        match result {
            Ok(data_type) => ValidationReport {
                expression: expression.to_string(),
                outcome: ValidationOutcome::Valid,
                data_type: Some(data_type),
                descriptions: self.descriptions,
                error: None,
            },
            Err(err) => ValidationReport {
                expression: expression.to_string(),
                outcome: err.outcome(),
                data_type: None,
                descriptions: self.descriptions,
                error: Some(err),
            },
        }
    }
}

/// Parse and validate in one step. Syntax errors produce a report too.
pub fn validate_expression(
    expression: &str,
    resolver: &dyn MetadataResolver,
    i18n: &dyn I18n,
    expected: ExpectedType,
) -> ValidationReport {
    match crate::dsl::parse_expression(expression) {
        Ok(tree) => Validator::new(resolver, i18n).validate(expression, &tree, expected),
        Err(err) => ValidationReport {
            expression: expression.to_string(),
            outcome: err.outcome(),
            data_type: None,
            descriptions: ItemDescriptions::new(),
            error: Some(err),
        },
    }
}

// ============================================================================
// Sample value checks
// ============================================================================

/// A number, with booleans counting as 0 or 1.
pub(super) fn numeric(value: &SampleValue, context: &str) -> ExpressionResult<f64> {
    match value {
        SampleValue::Number(n) => Ok(*n),
        SampleValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ExpressionError::type_mismatch(
            context,
            "Number",
            other.data_type(),
        )),
    }
}

pub(super) fn boolean(value: &SampleValue, context: &str) -> ExpressionResult<bool> {
    match value {
        SampleValue::Boolean(b) => Ok(*b),
        other => Err(ExpressionError::type_mismatch(
            context,
            "Boolean",
            other.data_type(),
        )),
    }
}

/// Dates, or text that may hold a date.
pub(super) fn date_like(value: &SampleValue, context: &str) -> ExpressionResult<()> {
    match value {
        SampleValue::Date(_) | SampleValue::Text(_) => Ok(()),
        other => Err(ExpressionError::type_mismatch(context, "Date", other.data_type())),
    }
}

/// Both values must share a type.
pub(super) fn same_type(
    first: &SampleValue,
    second: &SampleValue,
    context: &str,
) -> ExpressionResult<()> {
    if first.data_type() == second.data_type() {
        Ok(())
    } else {
        Err(ExpressionError::type_mismatch(
            context,
            first.data_type().to_string(),
            second.data_type(),
        ))
    }
}

fn compare(op: BinaryOp, left: &SampleValue, right: &SampleValue) -> ExpressionResult<bool> {
    let context = format!("'{}' comparison", op.symbol());
    let ordering = match (left, right) {
        (SampleValue::Boolean(_), SampleValue::Number(_))
        | (SampleValue::Number(_), SampleValue::Boolean(_)) => {
            numeric(left, &context)?.partial_cmp(&numeric(right, &context)?)
        }
        _ => left.compare(right),
    }
    .ok_or_else(|| {
        ExpressionError::type_mismatch(context.as_str(), left.data_type().to_string(), right.data_type())
    })?;

    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        BinaryOp::Ne => ordering.is_ne(),
        _ => ordering.is_eq(),
    })
}

impl ExpressionVisitor for Validator<'_> {
    type Output = SampleValue;

    fn visit_number(&mut self, value: f64) -> ExpressionResult<SampleValue> {
        Ok(SampleValue::Number(value))
    }

    fn visit_string(&mut self, value: &str) -> ExpressionResult<SampleValue> {
        Ok(SampleValue::Text(value.to_string()))
    }

    fn visit_boolean(&mut self, value: bool) -> ExpressionResult<SampleValue> {
        Ok(SampleValue::Boolean(value))
    }

    fn visit_item(&mut self, item: &ItemKind) -> ExpressionResult<SampleValue> {
        let resolved = resolve_item(item, self.resolver)?;
        self.descriptions
            .insert(item.to_string(), resolved.description(self.i18n));
        Ok(match resolved {
            ResolvedItem::Constant(constant) => SampleValue::Number(constant.value),
            other => SampleValue::of(other.data_type()),
        })
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: SampleValue) -> ExpressionResult<SampleValue> {
        match op {
            UnaryOp::Plus => Ok(SampleValue::Number(numeric(&operand, "unary '+'")?)),
            UnaryOp::Neg => Ok(SampleValue::Number(-numeric(&operand, "unary '-'")?)),
            UnaryOp::Not => Ok(SampleValue::Boolean(!boolean(&operand, "'!' operator")?)),
        }
    }

    fn visit_binary(
        &mut self,
        op: BinaryOp,
        left: SampleValue,
        right: SampleValue,
    ) -> ExpressionResult<SampleValue> {
        let context = format!("'{}' operator", op.symbol());
        match (op, &left, &right) {
            (BinaryOp::Add, SampleValue::Text(_), _) | (BinaryOp::Add, _, SampleValue::Text(_)) => {
                Ok(SampleValue::Text(format!("{}{}", left, right)))
            }
            (BinaryOp::Sub, SampleValue::Date(a), SampleValue::Date(b)) => {
                Ok(SampleValue::Number((*a - *b).num_days() as f64))
            }
            _ if op.is_arithmetic() => {
                let a = numeric(&left, &context)?;
                let b = numeric(&right, &context)?;
                let value = match op {
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    BinaryOp::Add => a + b,
                    _ => a - b,
                };
                Ok(SampleValue::Number(value))
            }
            _ if op.is_comparison() => Ok(SampleValue::Boolean(compare(op, &left, &right)?)),
            _ => {
                let a = boolean(&left, &context)?;
                let b = boolean(&right, &context)?;
                Ok(SampleValue::Boolean(if op == BinaryOp::And {
                    a && b
                } else {
                    a || b
                }))
            }
        }
    }

    fn visit_paren(&mut self, inner: SampleValue) -> ExpressionResult<SampleValue> {
        Ok(inner)
    }

    fn visit_function(
        &mut self,
        kind: FunctionKind,
        call: &FunctionCall,
    ) -> ExpressionResult<SampleValue> {
        self.function_value(kind, call)
    }
}

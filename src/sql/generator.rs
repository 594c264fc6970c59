//! Tree walk that renders an expression as a PostgreSQL fragment.

use chrono::{Local, NaiveDate};

use crate::dsl::{BinaryOp, Expr, ExprNode, FunctionCall, ItemKind, UnaryOp};
use crate::error::ExpressionResult;
use crate::metadata::MetadataResolver;
use crate::registry::{resolve_item, DataType, FunctionKind, ResolvedItem};
use crate::validation::ExpectedType;
use crate::visitor::{condition_source, walk, walk_source, ExpressionVisitor, ItemCollector};

use super::context::{AnalyticsType, ProgramIndicatorContext};
use super::quote::{format_bool, quote_identifier, quote_string};

/// Renders expressions against the analytics tables.
///
/// The fragment is meant to be embedded in a larger select over the
/// context's table alias (`ax` unless set). Data elements and attributes
/// are wrapped in `coalesce` when null replacement is on, except inside
/// functions that test for nulls themselves (`d2:hasValue`, `d2:count`,
/// `isNull`, ...).
///
/// Boolean items standing where a truth value is required (a filter, the
/// operands of `&&`, `||` and `!`, the test of `if` and `d2:condition`)
/// coalesce to `false` instead of `0`.
pub struct SqlGenerator<'a> {
    pub(super) resolver: &'a dyn MetadataResolver,
    pub(super) context: &'a ProgramIndicatorContext,
    pub(super) replace_nulls: bool,
    pub(super) nulls_active: bool,
    pub(super) expected: ExpectedType,
    pub(super) boolean_position: bool,
    pub(super) today: NaiveDate,
    pub(super) value_columns: Vec<String>,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(resolver: &'a dyn MetadataResolver, context: &'a ProgramIndicatorContext) -> Self {
        Self {
            resolver,
            context,
            replace_nulls: true,
            nulls_active: true,
            expected: ExpectedType::Numeric,
            boolean_position: false,
            today: Local::now().date_naive(),
            value_columns: Vec::new(),
        }
    }

    /// Whether items are wrapped in `coalesce` (on by default).
    pub fn replace_nulls(mut self, replace_nulls: bool) -> Self {
        self.replace_nulls = replace_nulls;
        self
    }

    /// The type the whole expression produces. Filters are `Boolean`.
    pub fn expecting(mut self, expected: ExpectedType) -> Self {
        self.expected = expected;
        self
    }

    /// The date `V{current_date}` renders as.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Render `tree` as SQL.
    pub fn generate(mut self, tree: &ExprNode) -> ExpressionResult<String> {
        let analytics_type = self.context.analytics_type;
        self.value_columns = ItemCollector::collect(tree)?
            .iter()
            .filter_map(|item| analytics_type.value_column(item))
            .map(|column| quote_identifier(&column))
            .collect();
        self.nulls_active = self.replace_nulls;
        self.boolean_position = self.expected == ExpectedType::Boolean;
        self.visit(tree)
    }

    /// Run `f` with null replacement switched on or off, restoring it after.
    pub(super) fn with_nulls<F>(&mut self, active: bool, f: F) -> ExpressionResult<String>
    where
        F: FnOnce(&mut Self) -> ExpressionResult<String>,
    {
        let saved = self.nulls_active;
        self.nulls_active = active;
        let result = f(self);
        self.nulls_active = saved;
        result
    }

    /// Render a node that must produce a truth value.
    pub(super) fn visit_truth_value(&mut self, node: &ExprNode) -> ExpressionResult<String> {
        let saved = std::mem::replace(&mut self.boolean_position, true);
        let result = self.visit(node);
        self.boolean_position = saved;
        result
    }

    /// Render a sub-expression held in a string argument.
    pub(super) fn visit_condition(
        &mut self,
        kind: FunctionKind,
        text: &str,
    ) -> ExpressionResult<String> {
        let source = condition_source(kind, text);
        let saved = std::mem::replace(&mut self.boolean_position, true);
        let result = self.with_nulls(self.replace_nulls, |g| walk_source(g, &source));
        self.boolean_position = saved;
        result
    }

    /// `(select <column> from <events> where ... order by executiondate desc limit 1 )`
    pub(super) fn latest_event_value(&self, column: &str, program_stage: Option<&str>) -> String {
        let table = self.context.event_table();
        let alias = &self.context.table_alias;
        let stage_filter = program_stage
            .map(|ps| format!(" and ps = {}", quote_string(ps)))
            .unwrap_or_default();
        format!(
            "(select {column} from {table} where {table}.pi = {alias}.pi and {column} is not null{bounds}{stage_filter} order by executiondate desc limit 1 )",
            column = column,
            table = table,
            alias = alias,
            bounds = self.context.boundary_clause(),
            stage_filter = stage_filter,
        )
    }

    fn replace_null(&self, sql: String, data_type: DataType) -> String {
        if !self.nulls_active {
            return sql;
        }
        match data_type {
            DataType::Boolean if self.boolean_position => {
                format!("coalesce({}::numeric!=0,false)", sql)
            }
            DataType::Number | DataType::Boolean => format!("coalesce({}::numeric,0)", sql),
            DataType::Date | DataType::Text => format!("coalesce({},'')", sql),
        }
    }

    fn item_sql(&self, resolved: &ResolvedItem) -> String {
        match resolved {
            ResolvedItem::DataElement {
                stage_uid, item, ..
            } => {
                let column = quote_identifier(&item.uid);
                let sql = match self.context.analytics_type {
                    AnalyticsType::Event => column,
                    AnalyticsType::Enrollment => self.latest_event_value(&column, Some(stage_uid)),
                };
                self.replace_null(sql, resolved.data_type())
            }
            ResolvedItem::Attribute(item) => {
                self.replace_null(quote_identifier(&item.uid), resolved.data_type())
            }
            ResolvedItem::Constant(constant) => constant.value.to_string(),
            ResolvedItem::Variable(variable) => self.variable_sql(*variable),
            ResolvedItem::StageEventDate { stage_uid, .. } => match self.context.analytics_type {
                AnalyticsType::Event => "executiondate".to_string(),
                AnalyticsType::Enrollment => {
                    self.latest_event_value("executiondate", Some(stage_uid))
                }
            },
        }
    }
}

impl ExpressionVisitor for SqlGenerator<'_> {
    type Output = String;

    /// Track whether the node's children stand where a truth value is
    /// required before walking them.
    fn visit(&mut self, node: &ExprNode) -> ExpressionResult<String> {
        let operands_boolean = match &node.value {
            Expr::Item(_) => return walk(self, node),
            Expr::Unary {
                op: UnaryOp::Not, ..
            }
            | Expr::Binary {
                op: BinaryOp::And | BinaryOp::Or,
                ..
            } => true,
            Expr::Paren(_) => self.boolean_position,
            _ => false,
        };
        let saved = std::mem::replace(&mut self.boolean_position, operands_boolean);
        let result = walk(self, node);
        self.boolean_position = saved;
        result
    }

    fn visit_number(&mut self, value: f64) -> ExpressionResult<String> {
        Ok(value.to_string())
    }

    fn visit_string(&mut self, value: &str) -> ExpressionResult<String> {
        Ok(quote_string(value))
    }

    fn visit_boolean(&mut self, value: bool) -> ExpressionResult<String> {
        Ok(format_bool(value).to_string())
    }

    fn visit_item(&mut self, item: &ItemKind) -> ExpressionResult<String> {
        let resolved = resolve_item(item, self.resolver)?;
        Ok(self.item_sql(&resolved))
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: String) -> ExpressionResult<String> {
        // `--` opens a line comment
        if op == UnaryOp::Neg && operand.starts_with('-') {
            return Ok(format!("- {}", operand));
        }
        Ok(format!("{}{}", op.sql(), operand))
    }

    fn visit_binary(&mut self, op: BinaryOp, left: String, right: String) -> ExpressionResult<String> {
        Ok(format!("{} {} {}", left, op.sql(), right))
    }

    fn visit_paren(&mut self, inner: String) -> ExpressionResult<String> {
        Ok(format!("({})", inner))
    }

    fn visit_function(&mut self, kind: FunctionKind, call: &FunctionCall) -> ExpressionResult<String> {
        self.function_sql(kind, call)
    }
}

//! SQL for each function in the registry.

use crate::dsl::{FunctionCall, ItemKind};
use crate::error::{ExpressionError, ExpressionResult};
use crate::registry::{resolve_item, DateUnit, FunctionKind};
use crate::visitor::{stage_element_argument, string_argument, ExpressionVisitor};

use super::context::AnalyticsType;
use super::generator::SqlGenerator;
use super::quote::{quote_identifier, quote_string};

impl SqlGenerator<'_> {
    pub(super) fn function_sql(
        &mut self,
        kind: FunctionKind,
        call: &FunctionCall,
    ) -> ExpressionResult<String> {
        if kind.suspends_null_replacement() {
            return self.with_nulls(false, |g| g.render_function(kind, call));
        }
        self.render_function(kind, call)
    }

    fn render_function(&mut self, kind: FunctionKind, call: &FunctionCall) -> ExpressionResult<String> {
        let args = &call.args;
        match kind {
            FunctionKind::Condition => {
                let condition = self.visit_condition(kind, string_argument(call, 0)?)?;
                let when_true = self.visit(&args[1])?;
                let when_false = self.visit(&args[2])?;
                Ok(format!(
                    "case when ({}) then {} else {} end",
                    condition, when_true, when_false
                ))
            }
            FunctionKind::Count | FunctionKind::CountIfValue | FunctionKind::CountIfCondition => {
                self.count_sql(kind, call)
            }
            FunctionKind::Between(unit) => {
                let start = self.visit(&args[0])?;
                let end = self.visit(&args[1])?;
                Ok(between_sql(unit, &start, &end))
            }
            FunctionKind::HasValue => {
                let value = self.visit(&args[0])?;
                Ok(format!("({} is not null)", value))
            }
            FunctionKind::MaxValue => self.min_max_sql("max", call),
            FunctionKind::MinValue => self.min_max_sql("min", call),
            FunctionKind::Oizp => {
                let value = self.visit(&args[0])?;
                Ok(format!(
                    "coalesce(case when {} >= 0 then 1 else 0 end, 0)",
                    value
                ))
            }
            FunctionKind::Zing => {
                let value = self.with_nulls(self.replace_nulls, |g| g.visit(&args[0]))?;
                Ok(format!("greatest(0,{})", value))
            }
            FunctionKind::Zpvc => {
                let terms = args
                    .iter()
                    .map(|arg| {
                        let value = self.visit(arg)?;
                        Ok(format!("case when {} >= 0 then 1 else 0 end", value))
                    })
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(format!(
                    "nullif(cast(({}) as double precision),0)",
                    terms.join(" + ")
                ))
            }
            FunctionKind::RelationshipCount => self.relationship_count_sql(call),
            FunctionKind::Aggregate(aggregate) => {
                let value = self.visit(&args[0])?;
                Ok(format!("{}({})", aggregate.sql_name(), value))
            }
            FunctionKind::If => {
                let test = self.visit_truth_value(&args[0])?;
                let when_true = self.visit(&args[1])?;
                let when_false = self.visit(&args[2])?;
                Ok(format!(
                    "case when ({}) then {} else {} end",
                    test, when_true, when_false
                ))
            }
            FunctionKind::IsNull => {
                let value = self.visit(&args[0])?;
                Ok(format!("({} is null)", value))
            }
            FunctionKind::IsNotNull => {
                let value = self.visit(&args[0])?;
                Ok(format!("({} is not null)", value))
            }
            FunctionKind::Coalesce | FunctionKind::Greatest | FunctionKind::Least => {
                let name = match kind {
                    FunctionKind::Coalesce => "coalesce",
                    FunctionKind::Greatest => "greatest",
                    _ => "least",
                };
                let values = args
                    .iter()
                    .map(|arg| self.visit(arg))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                Ok(format!("{}({})", name, values.join(",")))
            }
        }
    }

    /// Correlated subquery counting matching values of one stage data element.
    fn count_sql(&mut self, kind: FunctionKind, call: &FunctionCall) -> ExpressionResult<String> {
        let (item, program_stage, data_element) = stage_element_argument(call, 0)?;
        resolve_item(item, self.resolver)?;

        let column = quote_identifier(data_element);
        let condition = match kind {
            FunctionKind::CountIfValue => {
                format!(" = {}", self.visit(&call.args[1])?)
            }
            FunctionKind::CountIfCondition => {
                let sql = self.visit_condition(kind, string_argument(call, 1)?)?;
                sql.strip_prefix('0').unwrap_or(&sql).to_string()
            }
            _ => " is not null".to_string(),
        };

        let table = self.context.event_table();
        Ok(format!(
            "(select count({column}) from {table} where {table}.pi = {alias}.pi and {column} is not null and {column}{condition}{bounds} and ps = {stage})",
            column = column,
            table = table,
            alias = self.context.table_alias,
            condition = condition,
            bounds = self.context.boundary_clause(),
            stage = quote_string(program_stage),
        ))
    }

    fn min_max_sql(&mut self, aggregate: &str, call: &FunctionCall) -> ExpressionResult<String> {
        let item = call.args[0].value.as_item();
        let (program_stage, column) = match item {
            Some(
                item @ ItemKind::StageDataElement {
                    program_stage,
                    data_element,
                },
            ) => {
                resolve_item(item, self.resolver)?;
                (program_stage, quote_identifier(data_element))
            }
            Some(item @ ItemKind::StageEventDate(program_stage)) => {
                resolve_item(item, self.resolver)?;
                (program_stage, quote_identifier("executiondate"))
            }
            _ => {
                return Err(ExpressionError::InvalidArgument {
                    function: call.display_name(),
                    message: "argument must be a program stage data element or PS_EVENTDATE"
                        .to_string(),
                })
            }
        };

        match self.context.analytics_type {
            AnalyticsType::Event => Ok(column),
            AnalyticsType::Enrollment => {
                let table = self.context.event_table();
                Ok(format!(
                    "(select {aggregate}({column}) from {table} where {table}.pi = {alias}.pi{bounds} and ps = {stage})",
                    aggregate = aggregate,
                    column = column,
                    table = table,
                    alias = self.context.table_alias,
                    bounds = self.context.boundary_clause(),
                    stage = quote_string(program_stage),
                ))
            }
        }
    }

    fn relationship_count_sql(&mut self, call: &FunctionCall) -> ExpressionResult<String> {
        let type_join = match call.args.first() {
            None => String::new(),
            Some(_) => {
                let uid = string_argument(call, 0)?;
                self.resolver
                    .resolve_relationship_type(uid)
                    .ok_or_else(|| ExpressionError::UnknownRelationshipType(uid.to_string()))?;
                format!(
                    "join relationshiptype rt on r.relationshiptypeid = rt.relationshiptypeid and rt.uid = {} ",
                    quote_string(uid)
                )
            }
        };
        Ok(format!(
            "(select count(*) from relationship r {}join relationshipitem rifrom on rifrom.relationshipid = r.relationshipid join trackedentityinstance tei on rifrom.trackedentityinstanceid = tei.trackedentityinstanceid and tei.uid = {}.tei)",
            type_join, self.context.table_alias
        ))
    }
}

fn between_sql(unit: DateUnit, start: &str, end: &str) -> String {
    let age = format!("age(cast({} as date), cast({} as date))", end, start);
    match unit {
        DateUnit::Minutes => format!(
            "(extract(epoch from (cast({} as timestamp) - cast({} as timestamp))) / 60)",
            end, start
        ),
        DateUnit::Days => format!("(cast({} as date) - cast({} as date))", end, start),
        DateUnit::Weeks => format!("((cast({} as date) - cast({} as date))/7)", end, start),
        DateUnit::Months => format!(
            "((date_part('year',{age})) * 12 + date_part('month',{age}))",
            age = age
        ),
        DateUnit::Years => format!("(date_part('year',{}))", age),
    }
}

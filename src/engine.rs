//! The engine facade: parse, validate, describe and compile expressions
//! against one metadata source.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CompiledSqlCache, SqlCacheKey};
use crate::config::EngineSettings;
use crate::describe::{self, DefaultI18n, I18n};
use crate::dsl::{self, ExprNode};
use crate::error::ExpressionResult;
use crate::metadata::MetadataResolver;
use crate::sql::{quote_identifier, AnalyticsType, ProgramIndicatorContext, SqlGenerator};
use crate::validation::{ExpectedType, ValidationOutcome, ValidationReport, Validator};
use crate::visitor::ItemCollector;

/// Compiles program indicator expressions.
///
/// Cheap to share across threads; the only mutable state is the compiled
/// SQL cache, which is safe for concurrent use.
pub struct ProgramIndicatorEngine {
    resolver: Arc<dyn MetadataResolver>,
    i18n: Arc<dyn I18n>,
    cache: CompiledSqlCache,
    replace_nulls: bool,
}

impl ProgramIndicatorEngine {
    /// An engine with default settings and English variable names.
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self::from_settings(resolver, &EngineSettings::default())
    }

    pub fn from_settings(resolver: Arc<dyn MetadataResolver>, settings: &EngineSettings) -> Self {
        Self {
            resolver,
            i18n: Arc::new(DefaultI18n),
            cache: CompiledSqlCache::from_settings(&settings.cache),
            replace_nulls: settings.sql.replace_nulls,
        }
    }

    pub fn with_i18n(mut self, i18n: Arc<dyn I18n>) -> Self {
        self.i18n = i18n;
        self
    }

    pub fn with_cache(mut self, cache: CompiledSqlCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &CompiledSqlCache {
        &self.cache
    }

    /// Parse an expression into its tree.
    pub fn parse(&self, expression: &str) -> ExpressionResult<ExprNode> {
        dsl::parse_expression(expression)
    }

    /// Validate an expression against the type it must produce.
    ///
    /// The report's error names the expression it was raised in.
    pub fn validate(&self, expression: &str, expected: ExpectedType) -> ValidationReport {
        debug!(expression, %expected, "validating expression");
        let mut report = crate::validation::validate_expression(
            expression,
            self.resolver.as_ref(),
            self.i18n.as_ref(),
            expected,
        );
        if let Some(err) = report.error.take() {
            debug!(expression, error = %err, "expression is not valid");
            report.error = Some(err.in_expression(expression));
        }
        report
    }

    /// Validate a parsed tree.
    pub fn validate_tree(
        &self,
        expression: &str,
        tree: &ExprNode,
        expected: ExpectedType,
    ) -> ValidationReport {
        let mut report = Validator::new(self.resolver.as_ref(), self.i18n.as_ref())
            .validate(expression, tree, expected);
        report.error = report.error.map(|err| err.in_expression(expression));
        report
    }

    /// Check an indicator expression, which must be numeric.
    pub fn expression_is_valid(&self, expression: &str) -> ValidationOutcome {
        self.validate(expression, ExpectedType::Numeric).outcome
    }

    /// Check a filter, which must be true or false.
    pub fn filter_is_valid(&self, filter: &str) -> ValidationOutcome {
        self.validate(filter, ExpectedType::Boolean).outcome
    }

    /// Compile an expression to SQL for the given indicator context.
    ///
    /// Results, including failures, are cached per expression, indicator,
    /// reporting window and table alias.
    pub fn analytics_sql(
        &self,
        expression: &str,
        context: &ProgramIndicatorContext,
    ) -> ExpressionResult<String> {
        self.cached_sql(expression, context, ExpectedType::Numeric)
    }

    /// Compile a filter to a SQL condition. Boolean items coalesce to
    /// `false` rather than `0`.
    pub fn filter_sql(
        &self,
        filter: &str,
        context: &ProgramIndicatorContext,
    ) -> ExpressionResult<String> {
        self.cached_sql(filter, context, ExpectedType::Boolean)
    }

    /// Compile without consulting the cache.
    pub fn compile_sql(
        &self,
        expression: &str,
        context: &ProgramIndicatorContext,
    ) -> ExpressionResult<String> {
        self.compile(expression, context, ExpectedType::Numeric)
    }

    fn cached_sql(
        &self,
        expression: &str,
        context: &ProgramIndicatorContext,
        expected: ExpectedType,
    ) -> ExpressionResult<String> {
        let key = SqlCacheKey::new(
            expression,
            context.program_indicator_uid.as_str(),
            context.reporting_start_date,
            context.reporting_end_date,
        )
        .with_table_alias(context.table_alias.as_str())
        .expecting(expected);
        self.cache
            .get_or_compute(key, || self.compile(expression, context, expected))
    }

    fn compile(
        &self,
        expression: &str,
        context: &ProgramIndicatorContext,
        expected: ExpectedType,
    ) -> ExpressionResult<String> {
        debug!(
            expression,
            %expected,
            program_indicator = %context.program_indicator_uid,
            "compiling expression to SQL"
        );
        let tree = self
            .parse(expression)
            .map_err(|err| err.in_expression(expression))?;
        SqlGenerator::new(self.resolver.as_ref(), context)
            .replace_nulls(self.replace_nulls)
            .expecting(expected)
            .generate(&tree)
            .map_err(|err| err.in_expression(expression))
    }

    /// Render the expression with every item replaced by its display name.
    pub fn describe(
        &self,
        expression: &str,
        context: &ProgramIndicatorContext,
    ) -> ExpressionResult<String> {
        let tree = self
            .parse(expression)
            .map_err(|err| err.in_expression(expression))?;
        describe::describe(
            expression,
            &tree,
            context,
            self.resolver.as_ref(),
            self.i18n.as_ref(),
        )
        .map_err(|err| err.in_expression(expression))
    }

    /// Analytics column names of the data elements and attributes the
    /// expression references, in order of first appearance.
    ///
    /// Enrollment analytics store stage data elements as `<stage>_<element>`.
    pub fn data_element_and_attribute_identifiers(
        &self,
        expression: &str,
        analytics_type: AnalyticsType,
    ) -> ExpressionResult<Vec<String>> {
        let tree = self.parse(expression)?;
        let identifiers = ItemCollector::collect(&tree)?
            .iter()
            .filter_map(|item| analytics_type.value_column(item))
            .collect();
        Ok(identifiers)
    }

    /// `"a" is not null or "b" is not null ...` over the expression's data
    /// elements and attributes, or `None` when it references neither.
    pub fn any_value_exists_clause(
        &self,
        expression: &str,
        analytics_type: AnalyticsType,
    ) -> ExpressionResult<Option<String>> {
        let identifiers = self.data_element_and_attribute_identifiers(expression, analytics_type)?;
        if identifiers.is_empty() {
            return Ok(None);
        }
        let clause = identifiers
            .iter()
            .map(|id| format!("{} is not null", quote_identifier(id)))
            .collect::<Vec<_>>()
            .join(" or ");
        Ok(Some(clause))
    }
}

impl std::fmt::Debug for ProgramIndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramIndicatorEngine")
            .field("cache", &self.cache)
            .field("replace_nulls", &self.replace_nulls)
            .finish()
    }
}

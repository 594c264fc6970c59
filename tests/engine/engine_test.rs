use chrono::NaiveDate;
use pi_engine::config::EngineSettings;
use pi_engine::prelude::*;
use std::sync::Arc;

fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with_program_stage("WZbXY0S00lP", "Birth")
        .with_program_stage("ps", "Follow-up")
        .with_data_element("h0xKKjijTdI", "Weight", ValueType::Number)
        .with_data_element("de", "Visits", ValueType::Integer)
        .with_attribute("gAyeKSqlpdk", "Age in years", ValueType::Integer)
        .with_constant("Gfd3ppDfq8E", "Daily dose", 3.5)
}

fn engine() -> ProgramIndicatorEngine {
    ProgramIndicatorEngine::new(Arc::new(metadata()))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn event_context() -> ProgramIndicatorContext {
    ProgramIndicatorContext::event("ProgrmIndA1", "Program000A", date(2020, 1, 1), date(2020, 3, 31))
}

#[test]
fn test_scenario_stage_data_element() {
    let engine = engine();
    let expression = "#{WZbXY0S00lP.h0xKKjijTdI}";

    let report = engine.validate(expression, ExpectedType::Numeric);
    assert!(report.is_valid());
    assert_eq!(report.data_type, Some(DataType::Number));

    assert_eq!(
        engine.analytics_sql(expression, &event_context()).unwrap(),
        "coalesce(\"h0xKKjijTdI\"::numeric,0)"
    );
    assert_eq!(
        engine.describe(expression, &event_context()).unwrap(),
        "Birth.Weight"
    );
}

#[test]
fn test_scenario_unknown_attribute() {
    let report = engine().validate("A{unknownAttributeUid}", ExpectedType::Numeric);
    assert_eq!(report.outcome, ValidationOutcome::InvalidIdentifiersInExpression);
    assert!(report
        .error
        .map(|e| e.to_string().contains("unknownAttributeUid"))
        .unwrap_or(false));
}

#[test]
fn test_scenario_count_without_boundaries() {
    let sql = engine()
        .analytics_sql("d2:count(#{ps.de})", &event_context())
        .unwrap();
    assert!(!sql.contains("executiondate"));
    assert!(sql.ends_with("and ps = 'ps')"));
    assert_eq!(sql.matches(" and ").count(), 3);
}

#[test]
fn test_scenario_condition_branch_types() {
    let engine = engine();
    assert_eq!(
        engine.expression_is_valid("d2:condition('#{ps.de} > 10', 1, 0)"),
        ValidationOutcome::Valid
    );
    let report = engine.validate("d2:condition('#{ps.de} > 10', 1, 'no')", ExpectedType::Numeric);
    assert!(matches!(
        report.error.as_ref().map(ExpressionError::root),
        Some(ExpressionError::TypeMismatch { .. })
    ));
}

#[test]
fn test_boundaries_are_ordered_end_then_start() {
    let context = ProgramIndicatorContext::enrollment(
        "ProgrmIndA1",
        "Program000A",
        date(2020, 1, 1),
        date(2020, 3, 31),
    )
    .with_start_boundary(
        AnalyticsPeriodBoundary::new(BoundaryType::AfterStartOfReportingPeriod)
            .with_offset(-1, PeriodType::Years),
    )
    .with_end_boundary(AnalyticsPeriodBoundary::new(
        BoundaryType::BeforeEndOfReportingPeriod,
    ));

    let sql = engine().analytics_sql("d2:count(#{ps.de})", &context).unwrap();
    let end = sql.find("executiondate < cast( '2020-04-01' as date )").unwrap();
    let start = sql.find("executiondate >= cast( '2019-01-01' as date )").unwrap();
    assert!(end < start);
}

#[test]
fn test_analytics_sql_is_cached_and_deterministic() {
    let engine = engine();
    let expression = "d2:zing(A{gAyeKSqlpdk} - C{Gfd3ppDfq8E})";
    let first = engine.analytics_sql(expression, &event_context()).unwrap();
    let second = engine.analytics_sql(expression, &event_context()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "greatest(0,coalesce(\"gAyeKSqlpdk\"::numeric,0) - 3.5)");
    assert_eq!(engine.cache().entry_count(), 1);
}

#[test]
fn test_invalid_expressions_are_cached_as_failures() {
    let engine = engine();
    let first = engine.analytics_sql("C{NoSuchConst}", &event_context()).unwrap_err();
    assert_eq!(first.root(), &ExpressionError::UnknownConstant("NoSuchConst".into()));
    let second = engine.analytics_sql("C{NoSuchConst}", &event_context()).unwrap_err();
    assert!(matches!(second, ExpressionError::CacheComputeFailure(_)));
    assert!(second.to_string().contains("in expression: C{NoSuchConst}"));
}

#[test]
fn test_settings_control_null_replacement_and_cache() {
    let settings = EngineSettings::from_toml(
        r#"
[cache]
enabled = false

[sql]
replace_nulls = false
"#,
    )
    .unwrap();
    let engine = ProgramIndicatorEngine::from_settings(Arc::new(metadata()), &settings);
    assert!(!engine.cache().is_enabled());
    assert_eq!(
        engine
            .analytics_sql("#{WZbXY0S00lP.h0xKKjijTdI}", &event_context())
            .unwrap(),
        "\"h0xKKjijTdI\""
    );
}

#[test]
fn test_filters() {
    let engine = engine();
    assert_eq!(
        engine.filter_is_valid("A{gAyeKSqlpdk} >= 18 && d2:hasValue(#{ps.de})"),
        ValidationOutcome::Valid
    );
    assert_eq!(
        engine.filter_is_valid("A{gAyeKSqlpdk}"),
        ValidationOutcome::FilterNotEvaluatingToTrueOrFalse
    );
}

#[test]
fn test_any_value_exists_clause_for_enrollments() {
    let clause = engine()
        .any_value_exists_clause(
            "#{WZbXY0S00lP.h0xKKjijTdI} + A{gAyeKSqlpdk} + #{WZbXY0S00lP.h0xKKjijTdI}",
            AnalyticsType::Enrollment,
        )
        .unwrap();
    assert_eq!(
        clause.as_deref(),
        Some("\"WZbXY0S00lP_h0xKKjijTdI\" is not null or \"gAyeKSqlpdk\" is not null")
    );
}

#[test]
fn test_engine_is_shareable_across_threads() {
    let engine = Arc::new(engine());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                let sql = engine
                    .analytics_sql("d2:count(#{ps.de})", &event_context())
                    .unwrap();
                assert!(sql.starts_with("(select count(\"de\")"));
            });
        }
    });
}

#[test]
fn test_errors_name_the_expression() {
    let engine = engine();
    let expression = "#{WZbXY0S00lP.h0xKKjijTdI} + A{noSuchAttr}";

    let report = engine.validate(expression, ExpectedType::Numeric);
    assert_eq!(report.outcome, ValidationOutcome::InvalidIdentifiersInExpression);
    let message = report.error.map(|e| e.to_string()).unwrap_or_default();
    assert_eq!(
        message,
        "Tracked entity attribute not found: noSuchAttr in expression: #{WZbXY0S00lP.h0xKKjijTdI} + A{noSuchAttr}"
    );

    let err = engine.compile_sql("d2:nope(1)", &event_context()).unwrap_err();
    assert_eq!(err.root(), &ExpressionError::UnknownFunction("d2:nope".into()));
    assert!(err.to_string().ends_with("in expression: d2:nope(1)"));

    let err = engine.describe("C{NoSuchConst}", &event_context()).unwrap_err();
    assert!(err.to_string().contains("in expression: C{NoSuchConst}"));
}

#[test]
fn test_double_negation_does_not_open_a_comment() {
    let sql = engine()
        .analytics_sql("- -#{ps.de} + 5", &event_context())
        .unwrap();
    assert_eq!(sql, "- -coalesce(\"de\"::numeric,0) + 5");
    assert!(!sql.contains("--"));
}

#[test]
fn test_enrollment_value_count_uses_stage_columns() {
    let context = ProgramIndicatorContext::enrollment(
        "ProgrmIndA1",
        "Program000A",
        date(2020, 1, 1),
        date(2020, 3, 31),
    );
    let sql = engine()
        .analytics_sql("V{value_count} + A{gAyeKSqlpdk} * 0", &context)
        .unwrap();
    assert!(sql.starts_with(
        "nullif(cast((case when \"gAyeKSqlpdk\" is not null then 1 else 0 end) as double precision),0)"
    ), "{}", sql);

    let sql = engine()
        .analytics_sql("V{zero_pos_value_count} + #{ps.de}", &context)
        .unwrap();
    assert!(sql.starts_with(
        "nullif(cast((case when \"ps_de\" >= 0 then 1 else 0 end) as double precision),0)"
    ), "{}", sql);
}

#[test]
fn test_filter_sql_coalesces_booleans_to_false() {
    let metadata = metadata().with_data_element("bo", "Pregnant", ValueType::Boolean);
    let engine = ProgramIndicatorEngine::new(Arc::new(metadata));
    let context = event_context();

    assert_eq!(
        engine.filter_sql("#{ps.bo}", &context).unwrap(),
        "coalesce(\"bo\"::numeric!=0,false)"
    );
    assert_eq!(
        engine.analytics_sql("#{ps.bo}", &context).unwrap(),
        "coalesce(\"bo\"::numeric,0)"
    );
    assert_eq!(engine.cache().entry_count(), 2);
}

#[test]
fn test_table_alias_is_threaded_into_subqueries() {
    let context = ProgramIndicatorContext::enrollment(
        "ProgrmIndA1",
        "Program000A",
        date(2020, 1, 1),
        date(2020, 3, 31),
    )
    .with_table_alias("axx1");
    let engine = engine();

    let sql = engine.analytics_sql("#{ps.de}", &context).unwrap();
    assert_eq!(
        sql,
        "coalesce((select \"de\" from analytics_event_Program000A where analytics_event_Program000A.pi = axx1.pi and \"de\" is not null and ps = 'ps' order by executiondate desc limit 1 )::numeric,0)"
    );
    let count = engine.analytics_sql("d2:count(#{ps.de})", &context).unwrap();
    assert!(count.contains("analytics_event_Program000A.pi = axx1.pi"));
    assert!(!count.contains("ax.pi"));

    let default = engine
        .analytics_sql("#{ps.de}", &ProgramIndicatorContext::enrollment(
            "ProgrmIndA1",
            "Program000A",
            date(2020, 1, 1),
            date(2020, 3, 31),
        ))
        .unwrap();
    assert!(default.contains(".pi = ax.pi"));
}

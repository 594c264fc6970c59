use chrono::NaiveDate;
use insta::assert_snapshot;
use pi_engine::dsl::parse_expression;
use pi_engine::metadata::{InMemoryMetadata, ValueType};
use pi_engine::sql::{
    AnalyticsPeriodBoundary, BoundaryType, ProgramIndicatorContext, SqlGenerator,
};
use pi_engine::validation::ExpectedType;
use pi_engine::ExpressionError;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with_program_stage("ProgrmStagA", "StageA")
        .with_data_element("DataElmentA", "DataElementA", ValueType::Integer)
        .with_data_element("DataElmentB", "DataElementB", ValueType::Integer)
        .with_data_element("DataElmentC", "DataElementC", ValueType::Text)
        .with_data_element("DataElmentD", "DataElementD", ValueType::Date)
        .with_data_element("DataElmentG", "DataElementG", ValueType::Boolean)
        .with_attribute("Attribute1A", "AttributeA", ValueType::Number)
        .with_constant("ConstantA1A", "ConstantA", 7.0)
        .with_relationship_type("RelatioTypA", "Mother-child")
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 9).unwrap()
}

fn event_context() -> ProgramIndicatorContext {
    ProgramIndicatorContext::event("ProgrmIndA1", "Program000A", date(), date())
}

fn bounded(context: ProgramIndicatorContext) -> ProgramIndicatorContext {
    context
        .with_start_boundary(AnalyticsPeriodBoundary::new(
            BoundaryType::AfterStartOfReportingPeriod,
        ))
        .with_end_boundary(AnalyticsPeriodBoundary::new(
            BoundaryType::BeforeEndOfReportingPeriod,
        ))
}

fn enrollment_context() -> ProgramIndicatorContext {
    bounded(ProgramIndicatorContext::enrollment(
        "ProgrmIndA1",
        "Program000A",
        date(),
        date(),
    ))
}

fn generate(expression: &str, context: &ProgramIndicatorContext) -> Result<String, ExpressionError> {
    let tree = parse_expression(expression)?;
    let metadata = metadata();
    SqlGenerator::new(&metadata, context)
        .today(date())
        .generate(&tree)
}

fn filter_sql(filter: &str) -> String {
    let tree = parse_expression(filter).unwrap();
    let metadata = metadata();
    SqlGenerator::new(&metadata, &event_context())
        .expecting(ExpectedType::Boolean)
        .generate(&tree)
        .unwrap()
}

fn event_sql(expression: &str) -> String {
    generate(expression, &event_context()).unwrap()
}

fn enrollment_sql(expression: &str) -> String {
    generate(expression, &enrollment_context()).unwrap()
}

fn assert_valid_postgres(fragment: &str) {
    let sql = format!("select {} from analytics_enrollment_Program000A as ax", fragment);
    Parser::parse_sql(&PostgreSqlDialect {}, &sql)
        .unwrap_or_else(|e| panic!("invalid SQL: {}\n{}", e, sql));
}

// ============================================================================
// Items
// ============================================================================

#[test]
fn test_event_data_element() {
    assert_eq!(
        event_sql("#{ProgrmStagA.DataElmentA}"),
        "coalesce(\"DataElmentA\"::numeric,0)"
    );
}

#[test]
fn test_enrollment_data_element_reads_latest_event() {
    let sql = enrollment_sql("#{ProgrmStagA.DataElmentA}");
    assert_snapshot!(sql, @r#"coalesce((select "DataElmentA" from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and "DataElmentA" is not null and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date ) and ps = 'ProgrmStagA' order by executiondate desc limit 1 )::numeric,0)"#);
    assert_valid_postgres(&sql);
}

#[test]
fn test_text_and_date_elements_coalesce_to_empty_string() {
    assert_eq!(
        event_sql("#{ProgrmStagA.DataElmentC}"),
        "coalesce(\"DataElmentC\",'')"
    );
    assert_eq!(
        event_sql("#{ProgrmStagA.DataElmentD}"),
        "coalesce(\"DataElmentD\",'')"
    );
}

#[test]
fn test_constants_are_inlined() {
    assert_eq!(event_sql("C{ConstantA1A} * 2"), "7 * 2");
}

#[test]
fn test_stage_event_date() {
    assert_eq!(event_sql("PS_EVENTDATE:ProgrmStagA"), "executiondate");
    assert_snapshot!(enrollment_sql("PS_EVENTDATE:ProgrmStagA"), @"(select executiondate from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and executiondate is not null and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date ) and ps = 'ProgrmStagA' order by executiondate desc limit 1 )");
}

// ============================================================================
// Program variables
// ============================================================================

#[test]
fn test_variables() {
    assert_eq!(event_sql("V{enrollment_date}"), "enrollmentdate");
    assert_eq!(event_sql("V{enrollment_count}"), "distinct pi");
    assert_eq!(event_sql("V{analytics_period_start}"), "'2020-01-09'");
    assert_eq!(event_sql("V{current_date}"), "'2020-01-09'");
    assert_eq!(event_sql("V{execution_date}"), "executiondate");
}

#[test]
fn test_program_stage_name_depends_on_analytics_type() {
    assert_eq!(
        event_sql("V{program_stage_name}"),
        "(select name from programstage where uid = ps)"
    );
    assert_eq!(enrollment_sql("V{program_stage_name}"), "''");
}

#[test]
fn test_value_count_covers_expression_columns() {
    assert_snapshot!(
        event_sql("#{ProgrmStagA.DataElmentA} + A{Attribute1A} + V{value_count}"),
        @r#"coalesce("DataElmentA"::numeric,0) + coalesce("Attribute1A"::numeric,0) + nullif(cast((case when "DataElmentA" is not null then 1 else 0 end + case when "Attribute1A" is not null then 1 else 0 end) as double precision),0)"#
    );
}

#[test]
fn test_enrollment_value_count_uses_stage_prefixed_columns() {
    let sql = enrollment_sql("#{ProgrmStagA.DataElmentA} + A{Attribute1A} + V{value_count}");
    assert!(sql.ends_with(
        "nullif(cast((case when \"ProgrmStagA_DataElmentA\" is not null then 1 else 0 end + case when \"Attribute1A\" is not null then 1 else 0 end) as double precision),0)"
    ), "{}", sql);
    assert_valid_postgres(&sql);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_double_negation_keeps_operators_apart() {
    let sql = event_sql("- -#{ProgrmStagA.DataElmentA} + 5");
    assert_eq!(sql, "- -coalesce(\"DataElmentA\"::numeric,0) + 5");
    assert_valid_postgres(&sql);
    assert_eq!(event_sql("-(-1)"), "-(-1)");
}

// ============================================================================
// Boolean items
// ============================================================================

#[test]
fn test_boolean_item_as_number() {
    assert_eq!(
        event_sql("#{ProgrmStagA.DataElmentG}"),
        "coalesce(\"DataElmentG\"::numeric,0)"
    );
    assert_eq!(
        event_sql("if(#{ProgrmStagA.DataElmentG} > 1,4,5)"),
        "case when (coalesce(\"DataElmentG\"::numeric,0) > 1) then 4 else 5 end"
    );
}

#[test]
fn test_boolean_item_as_truth_value() {
    assert_eq!(
        filter_sql("#{ProgrmStagA.DataElmentG}"),
        "coalesce(\"DataElmentG\"::numeric!=0,false)"
    );
    let sql = event_sql("if(#{ProgrmStagA.DataElmentG},4,5)");
    assert_eq!(
        sql,
        "case when (coalesce(\"DataElmentG\"::numeric!=0,false)) then 4 else 5 end"
    );
    assert_valid_postgres(&sql);
    assert_snapshot!(
        event_sql("d2:condition('#{ProgrmStagA.DataElmentG} && #{ProgrmStagA.DataElmentA} > 2', 1, 0)"),
        @r#"case when (coalesce("DataElmentG"::numeric!=0,false) and coalesce("DataElmentA"::numeric,0) > 2) then 1 else 0 end"#
    );
}

// ============================================================================
// d2 functions
// ============================================================================

#[test]
fn test_condition() {
    let sql = event_sql("d2:condition('#{ProgrmStagA.DataElmentA} > 10', 1, 0)");
    assert_eq!(
        sql,
        "case when (coalesce(\"DataElmentA\"::numeric,0) > 10) then 1 else 0 end"
    );
    assert_valid_postgres(&sql);
}

#[test]
fn test_count_without_boundaries_has_only_stage_filter() {
    let sql = event_sql("d2:count(#{ProgrmStagA.DataElmentA})");
    assert_snapshot!(sql, @r#"(select count("DataElmentA") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and "DataElmentA" is not null and "DataElmentA" is not null and ps = 'ProgrmStagA')"#);
    assert!(!sql.contains("executiondate"));
    assert_valid_postgres(&sql);
}

#[test]
fn test_count_places_end_boundary_before_start_boundary() {
    let sql = enrollment_sql("d2:count(#{ProgrmStagA.DataElmentA})");
    let end = sql
        .find("executiondate < cast( '2020-01-10' as date )")
        .expect("end boundary present");
    let start = sql
        .find("executiondate >= cast( '2020-01-09' as date )")
        .expect("start boundary present");
    assert!(end < start);
    assert_valid_postgres(&sql);
}

#[test]
fn test_count_if_value() {
    assert_snapshot!(
        enrollment_sql("d2:countIfValue(#{ProgrmStagA.DataElmentA}, 10)"),
        @r#"(select count("DataElmentA") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and "DataElmentA" is not null and "DataElmentA" = 10 and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date ) and ps = 'ProgrmStagA')"#
    );
}

#[test]
fn test_count_if_condition() {
    let sql = event_sql("d2:countIfCondition(#{ProgrmStagA.DataElmentA}, '>= 5')");
    assert_snapshot!(sql, @r#"(select count("DataElmentA") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and "DataElmentA" is not null and "DataElmentA" >= 5 and ps = 'ProgrmStagA')"#);
    assert_valid_postgres(&sql);
}

#[test]
fn test_date_differences() {
    assert_eq!(
        event_sql("d2:daysBetween(#{ProgrmStagA.DataElmentD}, V{analytics_period_end})"),
        "(cast('2020-01-09' as date) - cast(\"DataElmentD\" as date))"
    );
    assert_eq!(
        event_sql("d2:weeksBetween(V{enrollment_date}, V{event_date})"),
        "((cast(executiondate as date) - cast(enrollmentdate as date))/7)"
    );
    assert_eq!(
        event_sql("d2:yearsBetween(V{incident_date}, V{enrollment_date})"),
        "(date_part('year',age(cast(enrollmentdate as date), cast(incidentdate as date))))"
    );
    let months = event_sql("d2:monthsBetween(V{incident_date}, V{enrollment_date})");
    assert_eq!(
        months,
        "((date_part('year',age(cast(enrollmentdate as date), cast(incidentdate as date)))) * 12 + date_part('month',age(cast(enrollmentdate as date), cast(incidentdate as date))))"
    );
    assert_valid_postgres(&months);
}

#[test]
fn test_value_functions_suspend_null_replacement() {
    assert_eq!(
        event_sql("d2:hasValue(#{ProgrmStagA.DataElmentA})"),
        "(\"DataElmentA\" is not null)"
    );
    assert_eq!(
        event_sql("d2:oizp(#{ProgrmStagA.DataElmentA})"),
        "coalesce(case when \"DataElmentA\" >= 0 then 1 else 0 end, 0)"
    );
    assert_eq!(
        event_sql("d2:zpvc(#{ProgrmStagA.DataElmentA}, #{ProgrmStagA.DataElmentB})"),
        "nullif(cast((case when \"DataElmentA\" >= 0 then 1 else 0 end + case when \"DataElmentB\" >= 0 then 1 else 0 end) as double precision),0)"
    );
}

#[test]
fn test_zing_keeps_null_replacement() {
    assert_eq!(
        event_sql("d2:zing(#{ProgrmStagA.DataElmentA})"),
        "greatest(0,coalesce(\"DataElmentA\"::numeric,0))"
    );
}

#[test]
fn test_max_and_min_value() {
    assert_eq!(event_sql("d2:maxValue(#{ProgrmStagA.DataElmentA})"), "\"DataElmentA\"");
    assert_eq!(event_sql("d2:minValue(PS_EVENTDATE:ProgrmStagA)"), "\"executiondate\"");
    assert_snapshot!(
        enrollment_sql("d2:maxValue(#{ProgrmStagA.DataElmentA})"),
        @r#"(select max("DataElmentA") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date ) and ps = 'ProgrmStagA')"#
    );
}

#[test]
fn test_relationship_count() {
    assert_snapshot!(
        event_sql("d2:relationshipCount()"),
        @"(select count(*) from relationship r join relationshipitem rifrom on rifrom.relationshipid = r.relationshipid join trackedentityinstance tei on rifrom.trackedentityinstanceid = tei.trackedentityinstanceid and tei.uid = ax.tei)"
    );
    let sql = event_sql("d2:relationshipCount('RelatioTypA')");
    assert_snapshot!(sql, @"(select count(*) from relationship r join relationshiptype rt on r.relationshiptypeid = rt.relationshiptypeid and rt.uid = 'RelatioTypA' join relationshipitem rifrom on rifrom.relationshipid = r.relationshipid join trackedentityinstance tei on rifrom.trackedentityinstanceid = tei.trackedentityinstanceid and tei.uid = ax.tei)");
    assert_valid_postgres(&sql);
}

// ============================================================================
// Aggregates and logical functions
// ============================================================================

#[test]
fn test_aggregates_wrap_their_argument() {
    assert_eq!(
        event_sql("sum(#{ProgrmStagA.DataElmentA})"),
        "sum(coalesce(\"DataElmentA\"::numeric,0))"
    );
    assert_eq!(
        event_sql("stddev(#{ProgrmStagA.DataElmentA})"),
        "stddev(coalesce(\"DataElmentA\"::numeric,0))"
    );
}

#[test]
fn test_logical_functions() {
    assert_eq!(
        event_sql("if(isNull(#{ProgrmStagA.DataElmentA}), 0, 1)"),
        "case when ((\"DataElmentA\" is null)) then 0 else 1 end"
    );
    assert_eq!(event_sql("greatest(1, 2, 3)"), "greatest(1,2,3)");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unknown_items_fail_generation() {
    let err = generate("#{ProgrmStagA.NoSuchDataE}", &event_context()).unwrap_err();
    assert_eq!(
        err,
        ExpressionError::UnknownDataElement {
            program_stage: "ProgrmStagA".into(),
            data_element: "NoSuchDataE".into(),
        }
    );
    let err = generate("d2:relationshipCount('NoSuchType1')", &event_context()).unwrap_err();
    assert_eq!(err, ExpressionError::UnknownRelationshipType("NoSuchType1".into()));
}

#[test]
fn test_subqueries_correlate_with_table_alias() {
    let context = enrollment_context().with_table_alias("axx1");
    let sql = generate("#{ProgrmStagA.DataElmentA} - d2:count(#{ProgrmStagA.DataElmentB})", &context).unwrap();
    assert_eq!(sql.matches("analytics_event_Program000A.pi = axx1.pi").count(), 2);
    assert!(!sql.contains("ax.pi"));

    let sql = generate("d2:relationshipCount() + d2:maxValue(#{ProgrmStagA.DataElmentA})", &context).unwrap();
    assert!(sql.contains("tei.uid = axx1.tei"));
    assert!(sql.contains("analytics_event_Program000A.pi = axx1.pi and executiondate"));
}

#[test]
fn test_generation_is_deterministic() {
    let expression = "d2:countIfCondition(#{ProgrmStagA.DataElmentA}, '> 1') + V{event_count}";
    assert_eq!(enrollment_sql(expression), enrollment_sql(expression));
}

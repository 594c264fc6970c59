use chrono::NaiveDate;
use insta::assert_snapshot;
use pi_engine::describe::{describe, DefaultI18n, DescriptionBuilder, MapI18n};
use pi_engine::dsl::parse_expression;
use pi_engine::metadata::{InMemoryMetadata, ValueType};
use pi_engine::sql::ProgramIndicatorContext;
use pi_engine::ExpressionError;

fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::from_json(
        r#"{
            "programStages": [{ "uid": "WZbXY0S00lP", "name": "Birth" }],
            "dataElements": [
                { "uid": "h0xKKjijTdI", "displayName": "Weight", "valueType": "NUMBER" },
                { "uid": "sWoqcoByYmD", "displayName": "Apgar score", "valueType": "INTEGER" },
                { "uid": "UXz7xuGCEhU", "displayName": "Delivery date", "valueType": "DATE" }
            ],
            "attributes": [
                { "uid": "gAyeKSqlpdk", "displayName": "First name", "valueType": "TEXT" }
            ],
            "constants": [{ "uid": "Gfd3ppDfq8E", "displayName": "Daily dose", "value": 3.5 }],
            "relationshipTypes": [{ "uid": "RelatioTypA", "name": "Mother-child" }]
        }"#,
    )
    .unwrap()
}

fn context() -> ProgramIndicatorContext {
    ProgramIndicatorContext::event(
        "ProgrmIndA1",
        "Program000A",
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2020, 3, 31).unwrap(),
    )
}

fn describe_str(expression: &str) -> Result<String, ExpressionError> {
    let tree = parse_expression(expression)?;
    describe(expression, &tree, &context(), &metadata(), &DefaultI18n)
}

#[test]
fn test_stage_data_element() {
    assert_eq!(describe_str("#{WZbXY0S00lP.h0xKKjijTdI}").unwrap(), "Birth.Weight");
}

#[test]
fn test_every_uid_is_replaced() {
    let expression = "d2:condition('#{WZbXY0S00lP.sWoqcoByYmD} >= 7', #{WZbXY0S00lP.h0xKKjijTdI}, 0) \
                      + d2:daysBetween(#{WZbXY0S00lP.UXz7xuGCEhU}, V{enrollment_date}) * C{Gfd3ppDfq8E}";
    let description = describe_str(expression).unwrap();
    for uid in ["WZbXY0S00lP", "h0xKKjijTdI", "sWoqcoByYmD", "UXz7xuGCEhU", "Gfd3ppDfq8E"] {
        assert!(!description.contains(uid), "{} left in {}", uid, description);
    }
    assert_snapshot!(description, @"d2:condition('Birth.Apgar score >= 7', Birth.Weight, 0) + d2:daysBetween(Birth.Delivery date, Enrollment date) * Daily dose");
}

#[test]
fn test_one_substitution_per_distinct_item() {
    let tree = parse_expression(
        "#{WZbXY0S00lP.h0xKKjijTdI} + #{WZbXY0S00lP.h0xKKjijTdI} / #{WZbXY0S00lP.sWoqcoByYmD}",
    )
    .unwrap();
    let metadata = metadata();
    let descriptions = DescriptionBuilder::new(&metadata, &DefaultI18n)
        .build(&tree)
        .unwrap();
    assert_eq!(descriptions.len(), 2);
    assert_eq!(
        descriptions.get("#{WZbXY0S00lP.sWoqcoByYmD}"),
        Some("Birth.Apgar score")
    );
}

#[test]
fn test_attributes_variables_and_event_dates() {
    assert_eq!(
        describe_str("d2:hasValue(A{gAyeKSqlpdk}) && PS_EVENTDATE:WZbXY0S00lP > V{analytics_period_start}")
            .unwrap(),
        "d2:hasValue(First name) && Birth.Event date > Analytics period start"
    );
}

#[test]
fn test_localized_variable_names() {
    let tree = parse_expression("V{event_count} + V{tei_count}").unwrap();
    let i18n = MapI18n::new().with("event_count", "Nombre d'evenements");
    let description = describe(
        "V{event_count} + V{tei_count}",
        &tree,
        &context(),
        &metadata(),
        &i18n,
    )
    .unwrap();
    assert_eq!(
        description,
        "Nombre d'evenements + Tracked entity instance count"
    );
}

#[test]
fn test_due_date_and_report_date_render_reporting_end() {
    assert_eq!(describe_str("V{due_date}").unwrap(), "2020-03-31");
    assert_eq!(describe_str("V{report_date}").unwrap(), "2020-03-31");
}

#[test]
fn test_relationship_type_name() {
    assert_eq!(
        describe_str("d2:relationshipCount('RelatioTypA')").unwrap(),
        "d2:relationshipCount('Mother-child')"
    );
    assert_eq!(
        describe_str("d2:relationshipCount('RelatioTypA') + d2:countIfValue(#{WZbXY0S00lP.sWoqcoByYmD}, 'RelatioTypAx')")
            .unwrap(),
        "d2:relationshipCount('Mother-child') + d2:countIfValue(Birth.Apgar score, 'RelatioTypAx')"
    );
}

#[test]
fn test_unresolvable_items_fail() {
    assert_eq!(
        describe_str("C{NoSuchConst}").unwrap_err(),
        ExpressionError::UnknownConstant("NoSuchConst".into())
    );
    assert!(matches!(
        describe_str("#{WZbXY0S00lP.NoSuchElem1}").unwrap_err(),
        ExpressionError::UnknownDataElement { .. }
    ));
}

//! End-to-end query execution tests
//!
//! Test Categories:
//! 1. Filtering, ordering and limits over user types
//! 2. Grouping with HAVING, group ordering and group limits
//! 3. EXECUTE ON clauses, save values and aggregates
//! 4. Sub-queries and bind variables
//! 5. Build-time rejection and execution-time failures
//! 6. Configuration from file

use std::io::Write;

use objql::expression::build::*;
use objql::{
    ExecutorErrorCode, GroupKey, Introspect, Limit, PlannerErrorCode, QueryBuilder, QueryConfig,
    SortDirection, SortItem, TypeBuilder, Value,
};
use serde_json::json;
use tempfile::NamedTempFile;

#[derive(Debug)]
struct Car {
    make: String,
    model: String,
    year: i64,
    price: i64,
    owners: Vec<String>,
}

impl Introspect for Car {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.field("make", |c| c.make.clone())
            .field("model", |c| c.model.clone())
            .field("year", |c| c.year)
            .method("getPrice", |c| c.price)
            .method("owners", |c| {
                Value::List(c.owners.iter().map(Value::from).collect())
            });
    }
}

fn car(make: &str, model: &str, year: i64, price: i64, owners: &[&str]) -> Value {
    Value::object(Car {
        make: make.to_string(),
        model: model.to_string(),
        year,
        price,
        owners: owners.iter().map(|o| o.to_string()).collect(),
    })
}

fn garage() -> Vec<Value> {
    vec![
        car("Volvo", "V70", 2004, 20, &["ann"]),
        car("Audi", "A4", 2010, 35, &["bob", "cid"]),
        car("Volvo", "XC90", 2012, 45, &["dan"]),
        car("Saab", "900", 1994, 8, &[]),
        car("Audi", "A6", 2008, 30, &["eve"]),
        car("Volvo", "V70", 2001, 12, &["ann", "fay"]),
    ]
}

fn numbers(count: i64) -> Vec<Value> {
    (1..=count).map(|n| Value::from(json!({ "n": n }))).collect()
}

fn texts(rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter().map(|r| r[0].to_text()).collect()
}

// =============================================================================
// FILTERING, ORDERING, LIMITS
// =============================================================================

#[test]
fn test_filter_order_limit_over_objects() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("model"), prop("price")])
        .from_type("Car")
        .filter(gte(prop("year"), lit(2004)))
        .order_by(vec![SortItem::desc(prop("price"))])
        .limit(Limit::count(lit(3)))
        .build()
        .unwrap();

    let results = query.execute(garage()).unwrap();
    let rows = results.columns().unwrap();
    assert_eq!(texts(rows), vec!["XC90", "A4", "A6"]);
    assert_eq!(rows[0][1], Value::Integer(45));
    assert_eq!(results.stats().objects_scanned, 6);
    assert_eq!(results.stats().objects_matched, 4);
}

#[test]
fn test_limit_windows() {
    let cases: [(i64, i64, Vec<i64>); 3] = [
        (6, 3, vec![6, 7, 8]),
        (9, 10, vec![9, 10]),
        (11, 1, vec![]),
    ];
    for (start, count, expected) in cases {
        let mut query = QueryBuilder::new()
            .select(vec![prop("n")])
            .limit(Limit::range(lit(start), lit(count)))
            .build()
            .unwrap();
        let results = query.execute(numbers(10)).unwrap();
        let got: Vec<i64> = results
            .columns()
            .unwrap()
            .iter()
            .filter_map(|r| r[0].as_i64())
            .collect();
        assert_eq!(got, expected, "LIMIT {}, {}", start, count);
    }
}

#[test]
fn test_broadcast_filter_on_list_property() {
    // every owner must sort after "b"; no owners at all passes vacuously
    let mut query = QueryBuilder::new()
        .select(vec![prop("model")])
        .filter(gt(prop("owners"), lit("b")))
        .build()
        .unwrap();
    let results = query.execute(garage()).unwrap();
    assert_eq!(texts(results.columns().unwrap()), vec!["A4", "XC90", "900", "A6"]);
}

#[test]
fn test_select_star_and_distinct() {
    let mut objects = QueryBuilder::new()
        .filter(eq(prop("make"), lit("Saab")))
        .build()
        .unwrap();
    let results = objects.execute(garage()).unwrap();
    let found = results.objects().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].downcast_ref::<Car>().map(|c| c.year), Some(1994));
    assert!(results.columns().is_err());

    let mut makes = QueryBuilder::new()
        .select(vec![prop("make")])
        .distinct()
        .order_by(vec![SortItem::column(1, SortDirection::Asc)])
        .build()
        .unwrap();
    let results = makes.execute(garage()).unwrap();
    assert_eq!(texts(results.columns().unwrap()), vec!["Audi", "Saab", "Volvo"]);
}

// =============================================================================
// GROUPING
// =============================================================================

#[test]
fn test_group_by_with_having_and_group_order() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("model"), prop("year")])
        .group_by(vec![prop("make")])
        .having(gt(count_all(), lit(1)))
        .group_order(vec![SortItem::column(1, SortDirection::Asc)])
        .order_by(vec![SortItem::asc(prop("year"))])
        .build()
        .unwrap();

    let results = query.execute(garage()).unwrap();
    assert!(results.is_grouped());
    assert_eq!(texts(results.columns().unwrap()), vec!["Audi", "Volvo"]);

    let volvo = results
        .group(&GroupKey::new(vec![Value::from("Volvo")]))
        .unwrap();
    let years: Vec<i64> = match &volvo.rows {
        objql::ResultSet::Columns(rows) => rows.iter().filter_map(|r| r[1].as_i64()).collect(),
        objql::ResultSet::Objects(_) => Vec::new(),
    };
    assert_eq!(years, vec![2001, 2004, 2012]);
    assert_eq!(results.stats().groups, 2);
}

#[test]
fn test_group_limit_and_group_save_values() {
    let mut query = QueryBuilder::new()
        .group_by(vec![prop("make")])
        .execute_on_group_results(vec![
            set_save("count", count_all()),
            set_save("avg", avg(prop("getPrice"))),
        ])
        .group_order(vec![SortItem::desc(save("count"))])
        .group_limit(Limit::count(lit(2)))
        .build()
        .unwrap();

    let results = query.execute(garage()).unwrap();
    assert_eq!(texts(results.columns().unwrap()), vec!["Volvo", "Audi"]);

    let audi = results
        .group_save_values(&GroupKey::new(vec![Value::from("Audi")]))
        .unwrap();
    assert_eq!(audi["count"], Value::Integer(2));
    assert_eq!(audi["avg"], Value::Float(32.5));
    assert!(results
        .group_save_values(&GroupKey::new(vec![Value::from("Saab")]))
        .is_none());
}

// =============================================================================
// EXECUTE ON, SAVE VALUES, AGGREGATES
// =============================================================================

#[test]
fn test_execute_on_all_and_results() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("model"), div(prop("getPrice"), save("total"))])
        .execute_on_all(vec![set_save("fleet", count_all())])
        .filter(eq(prop("make"), lit("Volvo")))
        .execute_on_results(vec![
            set_save("total", sum(prop("getPrice"))),
            set_save("newest", max(prop("year"))),
        ])
        .build()
        .unwrap();

    let results = query.execute(garage()).unwrap();
    assert_eq!(results.save_value("fleet"), Some(&Value::Integer(6)));
    assert_eq!(results.save_value("total"), Some(&Value::Integer(77)));
    assert_eq!(results.save_value("newest"), Some(&Value::Integer(2012)));

    let shares: Vec<f64> = results
        .columns()
        .unwrap()
        .iter()
        .filter_map(|r| r[1].as_f64())
        .collect();
    let sum: f64 = shares.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn test_functions_in_projection() {
    let mut query = QueryBuilder::new()
        .select(vec![
            call(objql::expression::Builtin::Upper, vec![prop("model")]),
            call(objql::expression::Builtin::Length, vec![prop("owners")]),
        ])
        .filter(eq(prop("year"), lit(2001)))
        .build()
        .unwrap();
    let results = query.execute(garage()).unwrap();
    assert_eq!(
        results.columns().unwrap(),
        &[vec![Value::from("V70"), Value::Integer(2)]]
    );
}

// =============================================================================
// SUB-QUERIES AND BIND VARIABLES
// =============================================================================

#[test]
fn test_subquery_over_parent_property() {
    let owners_after_b = QueryBuilder::new()
        .filter(gt(current(), lit("b")))
        .build_plan()
        .unwrap();

    let mut query = QueryBuilder::new()
        .select(vec![
            prop("model"),
            subquery(std::sync::Arc::new(owners_after_b), prop("owners")),
        ])
        .filter(eq(prop("make"), lit("Audi")))
        .build()
        .unwrap();

    let results = query.execute(garage()).unwrap();
    let rows = results.columns().unwrap();
    assert_eq!(
        rows[0][1],
        Value::List(vec![Value::from("bob"), Value::from("cid")])
    );
    assert_eq!(rows[1][1], Value::List(vec![Value::from("eve")]));
}

#[test]
fn test_bind_variables_rebind() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("model")])
        .filter(in_list(prop("make"), vec![bind("first"), bind("second")]))
        .order_by(vec![SortItem::asc(prop("year"))])
        .bind("first", "Saab")
        .bind("second", "Audi")
        .build()
        .unwrap();
    assert_eq!(
        texts(query.execute(garage()).unwrap().columns().unwrap()),
        vec!["900", "A6", "A4"]
    );

    query.set_bind_variable("second", "Volvo");
    assert_eq!(
        texts(query.execute(garage()).unwrap().columns().unwrap()),
        vec!["900", "V70", "V70", "XC90"]
    );
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_build_time_rejections() {
    let err = QueryBuilder::new()
        .limit(Limit::count(lit("many")))
        .build()
        .unwrap_err();
    assert_eq!(err.code(), PlannerErrorCode::ObjqlLimitNotNumeric);

    let err = QueryBuilder::new()
        .having(gt(count_all(), lit(1)))
        .build()
        .unwrap_err();
    assert_eq!(err.code(), PlannerErrorCode::ObjqlHavingWithoutGroupBy);

    let err = QueryBuilder::new()
        .filter(eq(prop("owners["), lit(1)))
        .build()
        .unwrap_err();
    assert_eq!(err.code(), PlannerErrorCode::ObjqlQueryInvalid);
}

#[test]
fn test_missing_property_fails_query() {
    let mut query = QueryBuilder::new()
        .filter(eq(prop("colour"), lit("red")))
        .build()
        .unwrap();
    let err = query.execute(garage()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::ObjqlPropertyResolution);
    assert!(err.to_string().contains("colour"));
    assert_eq!(query.metrics().queries_failed, 1);
}

#[test]
fn test_sort_failure_is_reported_after_sort() {
    let mut query = QueryBuilder::new()
        .order_by(vec![SortItem::asc(div(lit(1), sub(prop("year"), lit(2004))))])
        .build()
        .unwrap();
    let err = query.execute(garage()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::ObjqlSortUnreliable);
    assert!(err.is_fatal());
}

#[test]
fn test_group_sort_failure_is_reported_after_sort() {
    // the Volvo group's newest car is from 2012
    let mut query = QueryBuilder::new()
        .group_by(vec![prop("make")])
        .group_order(vec![SortItem::asc(div(
            lit(100),
            sub(max(prop("year")), lit(2012)),
        ))])
        .build()
        .unwrap();
    let err = query.execute(garage()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::ObjqlSortUnreliable);
    assert!(err.is_fatal());
    assert!(err.message().starts_with("GROUP BY ORDER"));
    assert_eq!(query.metrics().queries_failed, 1);
}

#[test]
fn test_from_type_mismatch() {
    let mut candidates = garage();
    candidates.push(Value::from(json!({"make": "Volvo"})));

    let mut strict = QueryBuilder::new().from_type("Car").build().unwrap();
    let err = strict.execute(candidates.clone()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::ObjqlTypeMismatch);

    let lenient = QueryConfig {
        strict_from_type: false,
        ..Default::default()
    };
    let mut query = QueryBuilder::new()
        .from_type("Car")
        .config(lenient)
        .build()
        .unwrap();
    assert_eq!(query.execute(candidates).unwrap().row_count(), 7);
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"like_wildcard": "*", "ordering_cache": false}}"#).unwrap();
    let config = QueryConfig::from_file(file.path()).unwrap();
    assert_eq!(config.like_wildcard, "*");
    assert!(!config.ordering_cache);
    assert!(config.group_ordering_cache);

    let mut query = QueryBuilder::new()
        .select(vec![prop("model")])
        .filter(like(prop("model"), lit("V*")))
        .config(config)
        .build()
        .unwrap();
    assert_eq!(
        texts(query.execute(garage()).unwrap().columns().unwrap()),
        vec!["V70", "V70"]
    );
}

#[test]
fn test_invalid_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"like_wildcard": ""}}"#).unwrap();
    assert!(QueryConfig::from_file(file.path()).is_err());
    assert!(QueryConfig::from_file("/nonexistent/objql.json").is_err());
}

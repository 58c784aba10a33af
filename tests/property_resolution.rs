//! Property resolution tests
//!
//! Test Categories:
//! 1. Resolution order over user types
//! 2. Nested paths, indexes and maps inside queries
//! 3. Memoisation across instances and executions
//! 4. Setters with overload selection

use std::sync::{Arc, Mutex};

use objql::expression::build::*;
use objql::resolver::PropertyPath;
use objql::value::ParamType;
use objql::{
    ExecutorErrorCode, Introspect, PropertyResolutionError, PropertyResolver, QueryBuilder,
    TypeBuilder, Value,
};
use serde_json::json;

#[derive(Debug)]
struct Engine {
    cylinders: i64,
}

impl Introspect for Engine {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.field("cylinders", |e| e.cylinders);
    }
}

#[derive(Debug)]
struct Truck {
    name: String,
    engine: Value,
    axles: Vec<i64>,
    specs: Value,
    load: Mutex<f64>,
}

impl Introspect for Truck {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.field("name", |t| t.name.clone())
            // shadowed by the field when resolving "name"
            .method("getName", |t| format!("accessor:{}", t.name))
            .method("getEngine", |t| t.engine.clone())
            .method("axles", |t| {
                Value::List(t.axles.iter().copied().map(Value::from).collect())
            })
            .method("specs", |t| t.specs.clone())
            .method("getLoad", |t| t.load.lock().map(|l| *l).unwrap_or(0.0))
            .setter("setLoad", ParamType::Float, |t, v| {
                *t.load.lock().map_err(|e| e.to_string())? = v.as_f64().unwrap_or(0.0);
                Ok(())
            })
            .setter("setLoad", ParamType::Text, |t, v| {
                let tons = v
                    .as_str()
                    .and_then(|s| s.strip_suffix('t'))
                    .ok_or("expected a value like '12t'")?
                    .parse::<f64>()
                    .map_err(|e| e.to_string())?;
                *t.load.lock().map_err(|e| e.to_string())? = tons;
                Ok(())
            });
    }
}

fn truck(name: &str, cylinders: i64, axles: &[i64]) -> Value {
    Value::object(Truck {
        name: name.to_string(),
        engine: Value::object(Engine { cylinders }),
        axles: axles.to_vec(),
        specs: Value::from(json!({"colour": "red", "weights": [7, 9]})),
        load: Mutex::new(0.0),
    })
}

fn fleet() -> Vec<Value> {
    vec![
        truck("hauler", 8, &[2, 4]),
        truck("dray", 6, &[2]),
        truck("titan", 12, &[2, 4, 4]),
    ]
}

// =============================================================================
// RESOLUTION ORDER
// =============================================================================

#[test]
fn test_field_wins_over_accessor() {
    let resolver = PropertyResolver::new();
    let target = truck("dray", 6, &[2]);
    assert_eq!(resolver.resolve_str(&target, "name").unwrap(), Value::from("dray"));
    assert_eq!(
        resolver.resolve_str(&target, "getName").unwrap(),
        Value::from("accessor:dray")
    );
    // "engine" has no field, so the getter convention applies
    assert_eq!(
        resolver.resolve_str(&target, "engine.cylinders").unwrap(),
        Value::Integer(6)
    );
}

// =============================================================================
// PATHS INSIDE QUERIES
// =============================================================================

#[test]
fn test_nested_paths_in_query() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("name"), prop("axles[1]"), prop("specs[weights][0]")])
        .filter(gte(prop("engine.cylinders"), lit(8)))
        .build()
        .unwrap();

    let results = query.execute(fleet()).unwrap();
    assert_eq!(
        results.columns().unwrap(),
        &[
            vec![Value::from("hauler"), Value::Integer(4), Value::Integer(7)],
            vec![Value::from("titan"), Value::Integer(4), Value::Integer(7)],
        ]
    );
}

#[test]
fn test_index_out_of_bounds_fails_query() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("axles[1]")])
        .build()
        .unwrap();
    let err = query.execute(fleet()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::ObjqlPropertyResolution);
    assert_eq!(err.path(), Some("axles[1]"));
}

#[test]
fn test_missing_map_key_is_null() {
    let mut query = QueryBuilder::new()
        .select(vec![prop("name")])
        .filter(is_null(prop("specs.trim")))
        .build()
        .unwrap();
    assert_eq!(query.execute(fleet()).unwrap().row_count(), 3);
}

// =============================================================================
// MEMOISATION
// =============================================================================

#[test]
fn test_getters_compiled_once_per_type() {
    let resolver = Arc::new(PropertyResolver::new());
    let mut query = QueryBuilder::new()
        .select(vec![prop("name")])
        .filter(gt(prop("engine.cylinders"), lit(0)))
        .resolver(Arc::clone(&resolver))
        .build()
        .unwrap();

    query.execute(fleet()).unwrap();
    assert_eq!(resolver.compilations(), 2);
    assert_eq!(query.metrics().getter_compilations, 2);

    query.execute(fleet()).unwrap();
    assert_eq!(resolver.compilations(), 2);
    assert_eq!(query.metrics().getter_compilations, 2);
}

// =============================================================================
// SETTERS
// =============================================================================

#[test]
fn test_setter_overloads() {
    let resolver = PropertyResolver::new();
    let target = truck("titan", 12, &[2, 4, 4]);
    let load = PropertyPath::parse("load").unwrap();

    resolver.set(&target, &load, Value::Integer(18)).unwrap();
    assert_eq!(resolver.resolve(&target, &load).unwrap(), Value::Float(18.0));

    resolver.set(&target, &load, Value::from("21.5t")).unwrap();
    assert_eq!(resolver.resolve(&target, &load).unwrap(), Value::Float(21.5));

    let err = resolver.set(&target, &load, Value::from("heavy")).unwrap_err();
    assert!(matches!(err, PropertyResolutionError::SetterFailed { .. }));

    let err = resolver
        .set(&target, &load, Value::List(vec![Value::Integer(1)]))
        .unwrap_err();
    assert!(matches!(err, PropertyResolutionError::NoSetter { .. }));
}

#[test]
fn test_setter_through_nested_path() {
    let resolver = PropertyResolver::new();
    let depot = Value::from(json!({"bay": null}));
    let path = PropertyPath::parse("bay.load").unwrap();
    let err = resolver.set(&depot, &path, Value::Integer(1)).unwrap_err();
    assert!(matches!(err, PropertyResolutionError::NoSetter { .. }));
    assert_eq!(err.path(), "bay.load");
}

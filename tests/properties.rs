//! End-to-end behavior of compiled validators.
use serde_json::json;
use shape_guard::error::{CheckError, CompileError, DuplicateConversion, Error};
use shape_guard::ir::{Fallback, Stmt};
use shape_guard::{Evaluator, Program, SchemaDocument, Transforms, Value};

fn build(doc: serde_json::Value) -> (Program, Transforms) {
    let doc = SchemaDocument::from_value(doc).unwrap();
    (doc.compile().unwrap(), doc.transforms())
}

fn validate(p: &Program, t: &Transforms, name: &str, v: serde_json::Value) -> Result<serde_json::Value, CheckError> {
    Evaluator::new(p, t).validate(name, Value::from(v)).map(|v| v.to_json())
}

#[test]
fn accepted_values_come_back_unchanged_and_revalidate() {
    let (p, t) = build(json!({
        "types": {
            "Point": { "record": { "x": "number", "y": "number", "label": { "union": ["string", "undefined"] } } },
            "Shape": { "record": { "points": { "array": "Point" }, "kind": { "union": [{ "literal": "poly" }, { "literal": "line" }] } } }
        },
        "generate": [{ "name": "parseShape", "type": "Shape" }]
    }));
    let input = json!({ "points": [{ "x": 1, "y": 2 }, { "x": 3, "y": 4, "label": "b" }], "kind": "poly" });
    let once = validate(&p, &t, "parseShape", input.clone()).unwrap();
    assert_eq!(once, input);
    let twice = validate(&p, &t, "parseShape", once.clone()).unwrap();
    assert_eq!(twice, once);

    let err = validate(&p, &t, "parseShape", json!({ "points": [], "kind": "circle" })).unwrap_err();
    assert_eq!(err.to_string(), "value.kind is not 'poly' | 'line'.");
}

#[test]
fn shared_record_is_checked_by_one_routine() {
    let (p, _) = build(json!({
        "types": { "P": { "record": { "x": "number" } } },
        "generate": [
            { "name": "parseP", "type": "P" },
            { "name": "parseMaybeP", "type": { "union": ["P", "null"] } }
        ]
    }));
    assert_eq!(p.validators.len(), 2);
    assert_eq!(p.record_checks.len(), 1);
}

#[test]
fn self_reference_through_union_and_array() {
    let (p, t) = build(json!({
        "types": {
            "X": { "record": {
                "n": "number",
                "xd": { "union": ["undefined", "X"] },
                "xa": { "array": "X" }
            } }
        },
        "generate": [{ "name": "parseX", "type": "X" }]
    }));
    assert_eq!(p.record_checks.len(), 1);
    let ok = json!({ "n": 1, "xa": [{ "n": 2, "xa": [] }], "xd": { "n": 3, "xa": [] } });
    assert_eq!(validate(&p, &t, "parseX", ok.clone()).unwrap(), ok);

    let bad = json!({ "n": 1, "xa": [{ "n": 2, "xa": [{ "n": "deep", "xa": [] }] }] });
    let err = validate(&p, &t, "parseX", bad).unwrap_err();
    assert_eq!(err.to_string(), "value.xa[0].xa[0].n is not Number.");
}

#[test]
fn arrays_are_tried_before_records() {
    let (p, t) = build(json!({
        "types": { "R": { "record": { "n": "number" } } },
        "generate": [{ "name": "parseU", "type": { "union": ["R", { "array": "number" }] } }]
    }));
    let [Stmt::Check(chain)] = p.validators[0].body.as_slice() else {
        panic!("expected a check chain");
    };
    assert_eq!(chain.alternatives[0].label, "Array");
    assert_eq!(chain.alternatives[1].label, "Object");

    assert_eq!(validate(&p, &t, "parseU", json!([1, 2])).unwrap(), json!([1, 2]));
    let err = validate(&p, &t, "parseU", json!([1, "x"])).unwrap_err();
    assert_eq!(err.to_string(), "value[1] is not Number.");
    assert!(validate(&p, &t, "parseU", json!({ "n": 1 })).is_ok());
}

#[test]
fn true_false_is_one_boolean_test() {
    let (p, t) = build(json!({
        "generate": [{ "name": "parseB", "type": { "union": [{ "literal": true }, { "literal": false }] } }]
    }));
    let [Stmt::Check(chain)] = p.validators[0].body.as_slice() else {
        panic!("expected a check chain");
    };
    assert_eq!(chain.alternatives.len(), 1);
    assert_eq!(chain.alternatives[0].label, "Boolean");
    assert!(validate(&p, &t, "parseB", json!(true)).is_ok());
    assert!(validate(&p, &t, "parseB", json!(false)).is_ok());
    assert_eq!(
        validate(&p, &t, "parseB", json!(0)).unwrap_err().to_string(),
        "value is not Boolean."
    );
}

#[test]
fn conversion_fallback() {
    let (p, t) = build(json!({
        "types": { "Date": { "record": { "getTime": "number" } } },
        "conversions": [{ "type": "Date", "builtin": "iso-date" }],
        "generate": [{ "name": "parseD", "type": { "union": ["Date", "undefined"] } }]
    }));
    let [Stmt::Check(chain)] = p.validators[0].body.as_slice() else {
        panic!("expected a check chain");
    };
    assert!(matches!(chain.otherwise, Fallback::Convert(_)));

    let out = Evaluator::new(&p, &t).validate("parseD", Value::Undefined).unwrap();
    assert_eq!(out, Value::Undefined);
    assert_eq!(
        validate(&p, &t, "parseD", json!("2021-03-04")).unwrap(),
        json!("2021-03-04T00:00:00+00:00")
    );
    let err = validate(&p, &t, "parseD", json!("not a date")).unwrap_err();
    assert!(matches!(err, CheckError::Conversion(_)));
    assert_eq!(err.to_string(), "__convert_1: Unable to convert to date. value: not a date");
}

#[test]
fn conversion_replaces_nested_field_in_place() {
    let (p, t) = build(json!({
        "types": { "Z": { "record": { "stringNumber": { "union": ["number"] } } } },
        "conversions": [{ "type": { "union": ["number"] }, "builtin": "int-string" }],
        "generate": [{ "name": "parseZ", "type": { "array": "Z" } }]
    }));
    let out = validate(&p, &t, "parseZ", json!([{ "stringNumber": "12" }, { "stringNumber": 5 }])).unwrap();
    assert_eq!(out, json!([{ "stringNumber": 12 }, { "stringNumber": 5 }]));
}

#[test]
fn nested_record_path() {
    let (p, t) = build(json!({
        "types": { "R": { "record": { "x": { "record": { "y": "number" } } } } },
        "generate": [{ "name": "parseR", "type": "R" }]
    }));
    let err = validate(&p, &t, "parseR", json!({ "x": { "y": "a" } })).unwrap_err();
    let CheckError::Mismatch(mismatch) = err else {
        panic!("expected a type mismatch");
    };
    assert_eq!(mismatch.path, "value.x.y");
    assert_eq!(mismatch.expected, ["Number"]);
}

#[test]
fn first_violation_wins_in_declaration_order() {
    let (p, t) = build(json!({
        "types": { "R": { "record": { "b": "string", "a": "number" } } },
        "generate": [{ "name": "parseR", "type": "R" }]
    }));
    let err = validate(&p, &t, "parseR", json!({ "a": "x", "b": 1 })).unwrap_err();
    assert_eq!(err.to_string(), "value.b is not String.");
}

#[test]
fn two_conversions_in_one_union_fail_to_compile() {
    let doc = SchemaDocument::from_value(json!({
        "types": {
            "Date": { "record": { "getTime": "number" } },
            "RegExp": { "record": { "source": "string" } }
        },
        "conversions": [
            { "type": "Date", "builtin": "iso-date" },
            { "type": "RegExp", "body": "return new RegExp(value)" }
        ],
        "generate": [
            { "name": "parseOk", "type": "number" },
            { "name": "parseDR", "type": { "union": ["Date", "RegExp"] } }
        ]
    }))
    .unwrap();
    let err = doc.compile().unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::DuplicateConversion(DuplicateConversion::InUnion { .. }))
    ));
}

#[test]
fn any_is_permissive_only_on_its_own() {
    let (p, t) = build(json!({
        "generate": [
            { "name": "parseAny", "type": "any" },
            { "name": "parseStrOrAny", "type": { "union": ["string", "any"] } }
        ]
    }));
    assert!(validate(&p, &t, "parseAny", json!({ "whatever": [1] })).is_ok());
    // documented quirk: `any` adds no alternative to a union
    let err = validate(&p, &t, "parseStrOrAny", json!(1)).unwrap_err();
    assert_eq!(err.to_string(), "value is not String.");
}

#[test]
fn literal_values_and_bigints() {
    let (p, t) = build(json!({
        "generate": [{ "name": "parseL", "type": { "union": [{ "literal": 1 }, { "literal": "abc" }, { "bigint": "123" }, "null"] } }]
    }));
    assert!(validate(&p, &t, "parseL", json!(1)).is_ok());
    assert!(validate(&p, &t, "parseL", json!(null)).is_ok());
    let err = validate(&p, &t, "parseL", json!(2)).unwrap_err();
    assert_eq!(err.to_string(), "value is not 1 | 'abc' | 123n | Null.");

    let big = Value::BigInt(shape_guard::oracle::BigIntLiteral::parse("123").unwrap());
    assert!(Evaluator::new(&p, &t).validate("parseL", big).is_ok());
}

#[test]
fn deep_array_nesting_has_no_limit() {
    let mut ty = json!("number");
    let mut value = json!("x");
    for _ in 0..8 {
        ty = json!({ "array": ty });
        value = json!([value]);
    }
    let (p, t) = build(json!({ "generate": [{ "name": "parseDeep", "type": ty }] }));
    let err = validate(&p, &t, "parseDeep", value).unwrap_err();
    assert_eq!(err.to_string(), "value[0][0][0][0][0][0][0][0] is not Number.");
}

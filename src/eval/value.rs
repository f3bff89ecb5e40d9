//! Runtime values with JavaScript-like type tags.
use indexmap::IndexMap;

use crate::ir::TypeTag;
use crate::oracle::{js_number, BigIntLiteral, Literal};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigIntLiteral),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

pub(crate) static UNDEFINED: Value = Value::Undefined;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Value {
    /// `typeof` of the value; null, arrays and objects all report `object`.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Undefined => TypeTag::Undefined,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(_) => TypeTag::Number,
            Value::BigInt(_) => TypeTag::BigInt,
            Value::String(_) => TypeTag::String,
            Value::Null | Value::Array(_) | Value::Object(_) => TypeTag::Object,
        }
    }

    /// `===` against a literal. NaN equals nothing.
    pub fn strict_eq(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (Value::Number(a), Literal::Number(b)) => *a == b.0,
            (Value::String(a), Literal::String(b)) => a == b,
            (Value::Bool(a), Literal::Boolean(b)) => a == b,
            (Value::BigInt(a), Literal::BigInt(b)) => a == b,
            _ => false,
        }
    }

    /// Property read; anything without the property yields `undefined`.
    pub fn get(&self, field: &str) -> &Value {
        match self {
            Value::Object(map) => map.get(field).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    pub fn at(&self, index: usize) -> &Value {
        match self {
            Value::Array(items) => items.get(index).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    /// Short rendering for transform error messages.
    pub fn display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => js_number(*n),
            Value::BigInt(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
        }
    }

    /// JSON view. `undefined` fields are dropped and `undefined` array items
    /// become `null`; integral numbers are written as integers and bigints as
    /// decimal strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
            Value::BigInt(b) => {
                let sign = if b.negative { "-" } else { "" };
                Json::String(format!("{sign}{}", b.digits))
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

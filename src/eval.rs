//! In-process executor for validator programs.
//!
//! Runs a [`Program`] the way the emitted source would run: first matching
//! alternative wins, the first failure aborts the call, and conversions write
//! their result back into the slot the value was read from.
pub mod value;

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

pub use value::Value;

use crate::error::{CheckError, ConversionFailure, TypeMismatch};
use crate::ir::{CheckChain, Convert, Fallback, PathExpr, PathPart, Program, Stmt, Test, TypeTag, ValueExpr};
use crate::model::ConversionId;

pub type Transform = Box<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Executable bodies for conversion routines, keyed by sequence number.
#[derive(Default)]
pub struct Transforms {
    by_id: HashMap<ConversionId, Transform>,
}

impl Transforms {
    pub fn insert<F>(&mut self, conversion: ConversionId, transform: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.by_id.insert(conversion, Box::new(transform));
        self
    }

    pub fn get(&self, conversion: ConversionId) -> Option<&Transform> {
        self.by_id.get(&conversion)
    }
}

impl fmt::Debug for Transforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.by_id.keys().map(|c| c.0).collect();
        ids.sort_unstable();
        f.debug_struct("Transforms").field("conversions", &ids).finish()
    }
}

pub struct Evaluator<'p> {
    program: &'p Program,
    transforms: &'p Transforms,
}

/// Per-call state of one routine.
struct Frame<'a> {
    /// Value of the `path` parameter; empty in public validators.
    prefix: &'a str,
    /// Current loop counters, by depth.
    indices: Vec<usize>,
}

impl<'p> Evaluator<'p> {
    pub fn new(program: &'p Program, transforms: &'p Transforms) -> Self {
        Self { program, transforms }
    }

    /// Run validator `name` on `value`, returning it (with conversions applied).
    pub fn validate(&self, name: &str, value: Value) -> Result<Value, CheckError> {
        let Some(validator) = self.program.validator(name) else {
            return Err(CheckError::UnknownValidator(name.to_string()));
        };
        let mut value = value;
        let mut frame = Frame {
            prefix: "",
            indices: Vec::new(),
        };
        self.run(&validator.body, &mut value, &mut frame)?;
        Ok(value)
    }

    fn run(&self, body: &[Stmt], param: &mut Value, frame: &mut Frame<'_>) -> Result<(), CheckError> {
        for stmt in body {
            match stmt {
                Stmt::Check(chain) => self.check(chain, param, frame)?,
                Stmt::Convert(convert) => self.convert(convert, param, frame)?,
                Stmt::ForEach { array, index, body } => {
                    let len = match read(array, param, frame) {
                        Value::Array(items) => items.len(),
                        _ => 0,
                    };
                    if frame.indices.len() <= index.depth {
                        frame.indices.resize(index.depth + 1, 0);
                    }
                    for i in 0..len {
                        frame.indices[index.depth] = i;
                        self.run(body, param, frame)?;
                    }
                }
                Stmt::CallRecordCheck { record, value, path } => {
                    let Some(check) = self.program.record_check(*record) else {
                        return Err(CheckError::InvalidProgram(format!("no record check __check_{}", record.0)));
                    };
                    let path = render_path(path, frame);
                    trace!(routine = %check.name(), path = %path, "call");
                    let Some(slot) = place(value, param, &frame.indices, false) else {
                        return Err(CheckError::InvalidProgram(format!("{path} has no slot to check")));
                    };
                    let mut inner = Frame {
                        prefix: &path,
                        indices: Vec::new(),
                    };
                    self.run(&check.body, slot, &mut inner)?;
                }
            }
        }
        Ok(())
    }

    fn check(&self, chain: &CheckChain, param: &mut Value, frame: &mut Frame<'_>) -> Result<(), CheckError> {
        for alt in &chain.alternatives {
            if test(&alt.test, param, frame) {
                return self.run(&alt.then, param, frame);
            }
        }
        match &chain.otherwise {
            Fallback::Convert(convert) => self.convert(convert, param, frame),
            Fallback::Fail(fail) => Err(TypeMismatch {
                path: render_path(&fail.path, frame),
                expected: fail.expected.clone(),
            }
            .into()),
        }
    }

    fn convert(&self, convert: &Convert, param: &mut Value, frame: &Frame<'_>) -> Result<(), CheckError> {
        let conversion = convert.conversion;
        let Some(transform) = self.transforms.get(conversion) else {
            return Err(ConversionFailure {
                conversion: conversion.0,
                message: "no executable transform registered".to_string(),
            }
            .into());
        };
        let input = read(&convert.target, param, frame).clone();
        let output = transform(input).map_err(|message| ConversionFailure {
            conversion: conversion.0,
            message,
        })?;
        if let Some(slot) = place(&convert.target, param, &frame.indices, true) {
            *slot = output;
        }
        Ok(())
    }
}

fn test(test: &Test, param: &Value, frame: &Frame<'_>) -> bool {
    match test {
        Test::TypeOf(v, tag) => read(v, param, frame).type_tag() == *tag,
        Test::NonNullObject(v) => {
            let v = read(v, param, frame);
            !matches!(v, Value::Null) && v.type_tag() == TypeTag::Object
        }
        Test::IsNull(v) => matches!(read(v, param, frame), Value::Null),
        Test::Equals(v, literal) => read(v, param, frame).strict_eq(literal),
        Test::IsArray(v) => matches!(read(v, param, frame), Value::Array(_)),
    }
}

fn read<'v>(expr: &ValueExpr, param: &'v Value, frame: &Frame<'_>) -> &'v Value {
    match expr {
        ValueExpr::Param => param,
        ValueExpr::Field(base, name) => read(base, param, frame).get(name),
        ValueExpr::Index(base, var) => {
            let i = frame.indices.get(var.depth).copied().unwrap_or(0);
            read(base, param, frame).at(i)
        }
    }
}

/// Mutable slot for `expr`. With `create`, an absent object field is added;
/// named fields of non-objects have no slot.
fn place<'v>(expr: &ValueExpr, param: &'v mut Value, indices: &[usize], create: bool) -> Option<&'v mut Value> {
    match expr {
        ValueExpr::Param => Some(param),
        ValueExpr::Field(base, name) => match place(base, param, indices, create)? {
            Value::Object(map) => {
                if create {
                    Some(map.entry(name.clone()).or_insert(Value::Undefined))
                } else {
                    map.get_mut(name)
                }
            }
            _ => None,
        },
        ValueExpr::Index(base, var) => match place(base, param, indices, create)? {
            Value::Array(items) => items.get_mut(*indices.get(var.depth)?),
            _ => None,
        },
    }
}

fn render_path(path: &PathExpr, frame: &Frame<'_>) -> String {
    let mut out = String::new();
    for part in path.parts() {
        match part {
            PathPart::Lit(s) => out.push_str(&s),
            PathPart::Prefix => out.push_str(frame.prefix),
            PathPart::Index(var) => {
                let i = frame.indices.get(var.depth).copied().unwrap_or(0);
                out.push_str(&i.to_string());
            }
        }
    }
    out
}

// Logical validator program. No target syntax here; codegen renders it and
// eval runs it.
use crate::model::{ConversionId, RecordId};
use crate::oracle::Literal;

/// Parameter of every public validator and every record check.
pub const VALUE_PARAM: &str = "value";
/// Second parameter of record checks: the path of the checked value.
pub const PATH_PARAM: &str = "path";

// ————————————————————————————————————————————————————————————————————————————
// PROGRAM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub validators: Vec<Validator>,
    /// Sorted by record id.
    pub record_checks: Vec<RecordCheck>,
    /// Sorted by conversion sequence number.
    pub conversions: Vec<ConversionRoutine>,
}

impl Program {
    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.iter().find(|v| v.name == name)
    }

    pub fn record_check(&self, record: RecordId) -> Option<&RecordCheck> {
        self.record_checks
            .binary_search_by_key(&record, |r| r.record)
            .ok()
            .map(|i| &self.record_checks[i])
    }
}

/// Public routine: `name(value) -> return_type`.
#[derive(Debug, Clone)]
pub struct Validator {
    pub name: String,
    pub return_type: String,
    pub body: Vec<Stmt>,
}

impl Validator {
    pub fn params(&self) -> &'static [&'static str] {
        &[VALUE_PARAM]
    }
}

/// Private routine `__check_<record>(value, path)`, shared by every caller.
#[derive(Debug, Clone)]
pub struct RecordCheck {
    pub record: RecordId,
    pub body: Vec<Stmt>,
}

impl RecordCheck {
    pub fn name(&self) -> String {
        format!("__check_{}", self.record.0)
    }
    pub fn params(&self) -> &'static [&'static str] {
        &[VALUE_PARAM, PATH_PARAM]
    }
}

/// Private routine `__convert_<n>(value) -> result_type` with an opaque body.
#[derive(Debug, Clone)]
pub struct ConversionRoutine {
    pub conversion: ConversionId,
    pub result_type: String,
    pub body: String,
}

impl ConversionRoutine {
    pub fn name(&self) -> String {
        conversion_name(self.conversion)
    }
    pub fn params(&self) -> &'static [&'static str] {
        &[VALUE_PARAM]
    }
}

pub fn conversion_name(conversion: ConversionId) -> String {
    format!("__convert_{}", conversion.0)
}

// ————————————————————————————————————————————————————————————————————————————
// STATEMENTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum Stmt {
    Check(CheckChain),
    /// Unconditional conversion of a value with no structural alternatives.
    Convert(Convert),
    ForEach {
        array: ValueExpr,
        index: IndexVar,
        body: Vec<Stmt>,
    },
    CallRecordCheck {
        record: RecordId,
        value: ValueExpr,
        path: PathExpr,
    },
}

/// `if (t1) {..} else if (t2) {..} else <otherwise>`
#[derive(Debug, Clone)]
pub struct CheckChain {
    pub alternatives: Vec<Alternative>,
    pub otherwise: Fallback,
}

#[derive(Debug, Clone)]
pub struct Alternative {
    /// Kind label reported when every alternative fails.
    pub label: String,
    pub test: Test,
    pub then: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Fallback {
    Convert(Convert),
    Fail(Fail),
}

/// `target = __convert_<conversion>(target)`
#[derive(Debug, Clone)]
pub struct Convert {
    pub conversion: ConversionId,
    pub target: ValueExpr,
}

/// Raise a type mismatch for `path`.
#[derive(Debug, Clone)]
pub struct Fail {
    pub path: PathExpr,
    /// Deduplicated, in alternative order.
    pub expected: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS / VALUES
// ————————————————————————————————————————————————————————————————————————————

/// Runtime type tags, as reported by `typeof`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Number,
    String,
    Boolean,
    Undefined,
    BigInt,
    Object,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Undefined => "undefined",
            TypeTag::BigInt => "bigint",
            TypeTag::Object => "object",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Test {
    TypeOf(ValueExpr, TypeTag),
    /// `v !== null && typeof v === "object"`
    NonNullObject(ValueExpr),
    IsNull(ValueExpr),
    Equals(ValueExpr, Literal),
    IsArray(ValueExpr),
}

/// Location of a checked value, relative to the routine's `value` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    Param,
    Field(Box<ValueExpr>, String),
    Index(Box<ValueExpr>, IndexVar),
}

impl ValueExpr {
    pub fn field(&self, name: &str) -> Self {
        ValueExpr::Field(Box::new(self.clone()), name.to_string())
    }
    pub fn index(&self, var: IndexVar) -> Self {
        ValueExpr::Index(Box::new(self.clone()), var)
    }
}

/// Loop variable of the array check at `depth` (0 = outermost in a routine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexVar {
    pub depth: usize,
}

impl IndexVar {
    pub fn name(self) -> String {
        const NAMES: [&str; 6] = ["i", "j", "k", "l", "m", "n"];
        match NAMES.get(self.depth) {
            Some(name) => name.to_string(),
            None => format!("i{}", self.depth),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATH EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// String-valued expression naming a location, built by concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    Lit(String),
    /// The record check's `path` parameter.
    Prefix,
    Index(IndexVar),
    Add(Box<PathExpr>, Box<PathExpr>),
}

/// Flattened operand of an addition chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Lit(String),
    Prefix,
    Index(IndexVar),
}

impl PathExpr {
    pub fn lit(s: impl Into<String>) -> Self {
        PathExpr::Lit(s.into())
    }

    pub fn add(self, rhs: PathExpr) -> Self {
        PathExpr::Add(Box::new(self), Box::new(rhs))
    }

    /// Operands in evaluation order.
    pub fn parts(&self) -> Vec<PathPart> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<PathPart>) {
        match self {
            PathExpr::Lit(s) => out.push(PathPart::Lit(s.clone())),
            PathExpr::Prefix => out.push(PathPart::Prefix),
            PathExpr::Index(var) => out.push(PathPart::Index(*var)),
            PathExpr::Add(lhs, rhs) => {
                lhs.collect(out);
                rhs.collect(out);
            }
        }
    }

    /// Merge adjacent string literals of the addition chain and rebuild it
    /// left-associated: `"value" + ".x" + "[" + i + "]"` becomes
    /// `"value.x[" + i + "]"`.
    pub fn folded(&self) -> Self {
        let mut merged: Vec<PathPart> = Vec::new();
        for part in self.parts() {
            match (merged.last_mut(), part) {
                (Some(PathPart::Lit(acc)), PathPart::Lit(s)) => acc.push_str(&s),
                (_, part) => merged.push(part),
            }
        }
        let mut parts = merged.into_iter().filter(|p| !matches!(p, PathPart::Lit(s) if s.is_empty()));
        let first = match parts.next() {
            Some(part) => PathExpr::from(part),
            None => return PathExpr::lit(""),
        };
        parts.fold(first, |acc, part| acc.add(PathExpr::from(part)))
    }
}

impl From<PathPart> for PathExpr {
    fn from(part: PathPart) -> Self {
        match part {
            PathPart::Lit(s) => PathExpr::Lit(s),
            PathPart::Prefix => PathExpr::Prefix,
            PathPart::Index(var) => PathExpr::Index(var),
        }
    }
}

//! Boundary to the type oracle.
//!
//! The oracle owns type descriptors and answers classification questions about
//! them. The model builder never inspects a descriptor any other way, so any
//! front end (a schema document, a compiler's checker, a test fixture) can feed
//! the pipeline by implementing [`TypeOracle`].
use std::fmt;
use std::hash::Hash;

use ordered_float::OrderedFloat;

// ————————————————————————————————————————————————————————————————————————————
// LITERALS
// ————————————————————————————————————————————————————————————————————————————

/// Signed arbitrary-precision integer, kept as normalized base-10 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigIntLiteral {
    pub negative: bool,
    pub digits: String,
}

impl BigIntLiteral {
    /// Parse `123`, `-456` or `789n`. Leading zeros are dropped and `-0` is `0`.
    pub fn parse(src: &str) -> Option<Self> {
        let src = src.trim();
        let src = src.strip_suffix('n').unwrap_or(src);
        let (negative, digits) = match src.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, src),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = match digits.trim_start_matches('0') {
            "" => "0",
            rest => rest,
        };
        Some(Self {
            negative: negative && digits != "0",
            digits: digits.to_string(),
        })
    }
}

impl fmt::Display for BigIntLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}n", self.digits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    BigInt(BigIntLiteral),
}

impl Literal {
    /// Form used in error messages: numbers and booleans bare, strings single
    /// quoted, bigints as `<digits>n`.
    pub fn source_form(&self) -> String {
        match self {
            Literal::Number(n) => js_number(n.0),
            Literal::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::Boolean(b) => b.to_string(),
            Literal::BigInt(b) => b.to_string(),
        }
    }
}

/// Render a number the way a JavaScript engine prints it.
pub(crate) fn js_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // `{:e}` is shortest round-trip like JS, minus the `+` on positive exponents
        let exp = format!("{n:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        n.to_string()
    }
}

/// Whether `name` can be written as a bare property name.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// ————————————————————————————————————————————————————————————————————————————
// ORACLE
// ————————————————————————————————————————————————————————————————————————————

/// Classification service over opaque, identity-comparable descriptors.
///
/// Two descriptors for the same schema type must compare equal; structural
/// look-alikes may or may not, at the oracle's discretion.
pub trait TypeOracle {
    type Descriptor: Copy + Eq + Hash + fmt::Debug;

    fn is_boolean(&self, d: Self::Descriptor) -> bool;
    fn is_boolean_literal(&self, d: Self::Descriptor) -> bool;
    fn is_number(&self, d: Self::Descriptor) -> bool;
    fn is_number_literal(&self, d: Self::Descriptor) -> bool;
    fn is_bigint(&self, d: Self::Descriptor) -> bool;
    fn is_bigint_literal(&self, d: Self::Descriptor) -> bool;
    fn is_string(&self, d: Self::Descriptor) -> bool;
    fn is_string_literal(&self, d: Self::Descriptor) -> bool;
    fn is_null(&self, d: Self::Descriptor) -> bool;
    fn is_undefined(&self, d: Self::Descriptor) -> bool;
    /// The non-primitive `object` type, not a record shape.
    fn is_bare_object(&self, d: Self::Descriptor) -> bool;
    fn is_any(&self, d: Self::Descriptor) -> bool;
    fn is_union(&self, d: Self::Descriptor) -> bool;
    fn is_record_shape(&self, d: Self::Descriptor) -> bool;
    fn is_array(&self, d: Self::Descriptor) -> bool;

    fn union_members(&self, d: Self::Descriptor) -> Vec<Self::Descriptor>;
    /// Fields in declaration order.
    fn record_fields(&self, d: Self::Descriptor) -> Vec<(String, Self::Descriptor)>;
    fn array_element(&self, d: Self::Descriptor) -> Option<Self::Descriptor>;
    fn literal_value(&self, d: Self::Descriptor) -> Option<Literal>;

    /// Human readable rendering, used for logs, diagnostics and return types.
    fn type_name(&self, d: Self::Descriptor) -> String;
}

//! Error taxonomy.
//!
//! Compile-time failures ([`CompileError`], [`SchemaError`]) abort a whole run
//! before anything is emitted. Runtime failures ([`CheckError`]) come from
//! executing a generated validator and stop at the first violation.
use thiserror::Error;

/// Failure while turning descriptors into a validator program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unsupported schema type `{type_name}`: {reason}")]
    UnsupportedSchema { type_name: String, reason: String },

    #[error(transparent)]
    DuplicateConversion(#[from] DuplicateConversion),
}

impl CompileError {
    pub(crate) fn unsupported(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSchema {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DuplicateConversion {
    #[error("cannot combine multiple conversions in one union: `{union}`")]
    InUnion { union: String },

    #[error("conversion #{second} targets `{type_name}`, already converted by conversion #{first}")]
    SameTarget {
        type_name: String,
        first: usize,
        second: usize,
    },
}

/// Problems with a schema document or its references.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown type name `{0}`")]
    UnknownType(String),

    #[error("type alias `{0}` circularly references itself")]
    AliasCycle(String),

    #[error("invalid bigint literal `{0}`")]
    InvalidBigInt(String),

    #[error("validator `{0}` is generated more than once")]
    DuplicateValidator(String),

    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Either stage of compiling a schema document.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

// ————————————————————————————————————————————————————————————————————————————
// RUNTIME
// ————————————————————————————————————————————————————————————————————————————

/// A value failed every alternative of a check chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path} is not {}.", .expected.join(" | "))]
pub struct TypeMismatch {
    pub path: String,
    pub expected: Vec<String>,
}

/// A conversion transform rejected its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("__convert_{conversion}: {message}")]
pub struct ConversionFailure {
    pub conversion: usize,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error(transparent)]
    Mismatch(#[from] TypeMismatch),

    #[error(transparent)]
    Conversion(#[from] ConversionFailure),

    #[error("no validator named `{0}`")]
    UnknownValidator(String),

    /// The program references a routine or location it does not have.
    #[error("invalid program: {0}")]
    InvalidProgram(String),
}

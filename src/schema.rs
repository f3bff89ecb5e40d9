//! Schema documents.
//!
//! A document declares named types and lists the conversion and generation
//! requests of one run. It is the input format of the CLI and the easiest way
//! to drive the compiler from tests:
//!
//! ```json
//! {
//!   "fileName": "generated.ts",
//!   "types": { "X": { "record": { "n": "number", "next": { "union": ["undefined", "X"] } } } },
//!   "conversions": [{ "type": "Date", "builtin": "iso-date" }],
//!   "generate": [{ "name": "parseX", "type": "X" }]
//! }
//! ```
pub mod table;

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

pub use table::{Keyword, SchemaTable, TypeId};

use crate::convert::Builtin;
use crate::error::{Error, SchemaError};
use crate::eval::Transforms;
use crate::ir::Program;
use crate::model::{ConversionHook, ConversionId, GenerationRequest};

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaDocument {
    /// Output file, relative to the document.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Lines copied verbatim to the top of the generated file.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub types: IndexMap<String, TypeExpr>,
    #[serde(default)]
    pub conversions: Vec<ConversionSpec>,
    #[serde(default)]
    pub generate: Vec<GenerateSpec>,
}

fn default_file_name() -> String {
    "generated.ts".to_string()
}

/// A keyword, a reference to a declared name, or a compound type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    Name(String),
    Compound(Compound),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Compound {
    Literal(LiteralExpr),
    Bigint(String),
    Array(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Record(IndexMap<String, TypeExpr>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LiteralExpr {
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionSpec {
    #[serde(rename = "type")]
    pub result_type: TypeExpr,
    /// Transform source emitted as the conversion routine body.
    #[serde(default)]
    pub body: String,
    /// Executable transform used when running validators in-process.
    #[serde(default)]
    pub builtin: Option<Builtin>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub root: TypeExpr,
}

/// Requests of a document, resolved against its [`SchemaTable`].
#[derive(Debug, Clone)]
pub struct Requests {
    pub generate: Vec<GenerationRequest<TypeId>>,
    pub conversions: Vec<ConversionHook<TypeId>>,
}

impl SchemaDocument {
    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        crate::path_de::from_value_with_path(value)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_json_str(&src)
    }

    /// Declarations only; request type expressions are not interned.
    pub fn table(&self) -> Result<SchemaTable, SchemaError> {
        SchemaTable::from_declarations(&self.types)
    }

    /// Build the oracle and resolve every request against it.
    pub fn resolve(&self) -> Result<(SchemaTable, Requests), SchemaError> {
        let mut table = self.table()?;

        let mut seen = HashSet::new();
        let mut generate = Vec::with_capacity(self.generate.len());
        for spec in &self.generate {
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateValidator(spec.name.clone()));
            }
            generate.push(GenerationRequest {
                name: spec.name.clone(),
                root: table.intern(&spec.root)?,
            });
        }

        let mut conversions = Vec::with_capacity(self.conversions.len());
        for (i, spec) in self.conversions.iter().enumerate() {
            let body = match (spec.body.trim().is_empty(), spec.builtin) {
                (true, Some(builtin)) => builtin.source().to_string(),
                _ => spec.body.clone(),
            };
            conversions.push(ConversionHook {
                result: table.intern(&spec.result_type)?,
                body,
                seq: i + 1,
            });
        }

        Ok((table, Requests { generate, conversions }))
    }

    /// Resolve and compile in one go.
    pub fn compile(&self) -> Result<Program, Error> {
        let (table, requests) = self.resolve()?;
        Ok(crate::compile(&table, &requests.generate, &requests.conversions)?)
    }

    /// Executable transforms for conversions that name a builtin.
    pub fn transforms(&self) -> Transforms {
        let mut transforms = Transforms::default();
        for (i, spec) in self.conversions.iter().enumerate() {
            if let Some(builtin) = spec.builtin {
                transforms.insert(ConversionId(i + 1), move |v| builtin.apply(v));
            }
        }
        transforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_compound_expressions() {
        let doc = SchemaDocument::from_value(json!({
            "types": {
                "T": { "record": {
                    "a": { "array": "number" },
                    "b": { "union": [{ "literal": "x" }, { "literal": 2 }, { "literal": true }] },
                    "c": { "bigint": "10" }
                } }
            }
        }))
        .unwrap();
        let TypeExpr::Compound(Compound::Record(fields)) = &doc.types["T"] else {
            panic!("expected record");
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert!(matches!(fields["b"], TypeExpr::Compound(Compound::Union(ref ms)) if ms.len() == 3));
        assert_eq!(doc.file_name, "generated.ts");
    }

    #[test]
    fn parse_errors_carry_a_path() {
        let err = SchemaDocument::from_value(json!({
            "generate": [{ "name": "parseX", "type": "X" }, { "name": 3, "type": "X" }]
        }))
        .unwrap_err();
        let SchemaError::Parse { path, .. } = err else {
            panic!("expected parse error");
        };
        assert_eq!(path, "generate[1].name");
    }

    #[test]
    fn load_reports_the_failing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{ "generate": [{ "name": 3, "type": "X" }] }"#).unwrap();
        let err = SchemaDocument::load(file.path()).unwrap_err();
        assert!(matches!(err, SchemaError::Parse { ref path, .. } if path == "generate[0].name"));
        let missing = SchemaDocument::load(&file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(missing, SchemaError::Io(_)));
    }

    #[test]
    fn duplicate_validator_names_are_rejected() {
        let doc = SchemaDocument::from_value(json!({
            "generate": [{ "name": "parseN", "type": "number" }, { "name": "parseN", "type": "string" }]
        }))
        .unwrap();
        assert!(matches!(doc.resolve(), Err(SchemaError::DuplicateValidator(ref n)) if n == "parseN"));
    }

    #[test]
    fn conversions_are_numbered_from_one() {
        let doc = SchemaDocument::from_value(json!({
            "types": { "Date": { "record": { "getTime": "number" } } },
            "conversions": [{ "type": "Date", "builtin": "iso-date" }, { "type": "bigint", "body": "return BigInt(v)" }]
        }))
        .unwrap();
        let (_, requests) = doc.resolve().unwrap();
        let seqs: Vec<usize> = requests.conversions.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, [1, 2]);
        assert_eq!(requests.conversions[0].body, Builtin::IsoDate.source());
        assert!(doc.transforms().get(ConversionId(1)).is_some());
        assert!(doc.transforms().get(ConversionId(2)).is_none());
    }
}

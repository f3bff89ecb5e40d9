//! In-memory type oracle over the declarations of a schema document.
//!
//! Identity rules:
//! - every named declaration is one descriptor, including `N = number`; a
//!   pure alias (`A = B`) shares B's descriptor;
//! - inline keywords and literals are interned;
//! - inline arrays and unions are interned by their member descriptors;
//! - every inline record is a fresh descriptor.
use std::collections::HashMap;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use super::{Compound, LiteralExpr, TypeExpr};
use crate::error::SchemaError;
use crate::oracle::{BigIntLiteral, Literal, TypeOracle, is_identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Number,
    String,
    Boolean,
    Bigint,
    Null,
    Undefined,
    Object,
    Any,
    // known to the oracle, rejected by the model builder
    Symbol,
    Never,
    Void,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "number" => Keyword::Number,
            "string" => Keyword::String,
            "boolean" => Keyword::Boolean,
            "bigint" => Keyword::Bigint,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            "object" => Keyword::Object,
            "any" => Keyword::Any,
            "symbol" => Keyword::Symbol,
            "never" => Keyword::Never,
            "void" => Keyword::Void,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Number => "number",
            Keyword::String => "string",
            Keyword::Boolean => "boolean",
            Keyword::Bigint => "bigint",
            Keyword::Null => "null",
            Keyword::Undefined => "undefined",
            Keyword::Object => "object",
            Keyword::Any => "any",
            Keyword::Symbol => "symbol",
            Keyword::Never => "never",
            Keyword::Void => "void",
        }
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Keyword(Keyword),
    Literal(Literal),
    Array(TypeId),
    Union(Vec<TypeId>),
    Record(Vec<(String, TypeId)>),
    /// Named slot whose body has not been lowered yet.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternKey {
    Keyword(Keyword),
    Literal(Literal),
    Array(TypeId),
    Union(Vec<TypeId>),
}

#[derive(Debug, Clone)]
struct Entry {
    name: Option<String>,
    shape: Shape,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    entries: Vec<Entry>,
    interned: HashMap<InternKey, TypeId>,
    names: HashMap<String, TypeId>,
}

impl SchemaTable {
    pub fn from_declarations(types: &IndexMap<String, TypeExpr>) -> Result<Self, SchemaError> {
        let mut table = Self::default();

        // 1) a slot for every declaration that is not a pure alias
        for (name, expr) in types {
            if !is_alias(expr) {
                let id = table.alloc(Some(name.clone()), Shape::Pending);
                table.names.insert(name.clone(), id);
            }
        }

        // 2) aliases point at their (eventual) target
        for (name, expr) in types {
            if is_alias(expr) {
                let mut chain = Vec::new();
                let id = table.resolve_alias(types, name, &mut chain)?;
                table.names.insert(name.clone(), id);
            }
        }

        // 3) lower the bodies into their slots
        for (name, expr) in types {
            if is_alias(expr) {
                continue;
            }
            let id = table.names[name];
            let shape = match expr {
                TypeExpr::Name(keyword) => match Keyword::from_name(keyword) {
                    Some(k) => Shape::Keyword(k),
                    None => return Err(SchemaError::UnknownType(keyword.clone())),
                },
                TypeExpr::Compound(compound) => table.lower_compound(compound)?,
            };
            table.entries[id.0 as usize].shape = shape;
        }

        Ok(table)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Descriptor for an inline type expression, interning as needed.
    pub fn intern(&mut self, expr: &TypeExpr) -> Result<TypeId, SchemaError> {
        match expr {
            TypeExpr::Name(name) => {
                if let Some(id) = self.names.get(name) {
                    return Ok(*id);
                }
                match Keyword::from_name(name) {
                    Some(k) => Ok(self.interned(InternKey::Keyword(k), Shape::Keyword(k))),
                    None => Err(SchemaError::UnknownType(name.clone())),
                }
            }
            TypeExpr::Compound(Compound::Record(fields)) => {
                let shape = self.lower_record(fields)?;
                Ok(self.alloc(None, shape))
            }
            TypeExpr::Compound(compound) => {
                let shape = self.lower_compound(compound)?;
                let key = match &shape {
                    Shape::Literal(lit) => Some(InternKey::Literal(lit.clone())),
                    Shape::Array(element) => Some(InternKey::Array(*element)),
                    Shape::Union(members) => Some(InternKey::Union(members.clone())),
                    _ => None,
                };
                Ok(match key {
                    Some(key) => self.interned(key, shape),
                    None => self.alloc(None, shape),
                })
            }
        }
    }

    fn lower_compound(&mut self, compound: &Compound) -> Result<Shape, SchemaError> {
        Ok(match compound {
            Compound::Literal(lit) => Shape::Literal(match lit {
                LiteralExpr::Boolean(b) => Literal::Boolean(*b),
                LiteralExpr::Number(n) => Literal::Number(OrderedFloat(*n)),
                LiteralExpr::String(s) => Literal::String(s.clone()),
            }),
            Compound::Bigint(src) => match BigIntLiteral::parse(src) {
                Some(b) => Shape::Literal(Literal::BigInt(b)),
                None => return Err(SchemaError::InvalidBigInt(src.clone())),
            },
            Compound::Array(element) => Shape::Array(self.intern(element)?),
            Compound::Union(members) => Shape::Union(
                members.iter().map(|m| self.intern(m)).collect::<Result<Vec<_>, _>>()?,
            ),
            Compound::Record(fields) => self.lower_record(fields)?,
        })
    }

    fn lower_record(&mut self, fields: &IndexMap<String, TypeExpr>) -> Result<Shape, SchemaError> {
        let mut out = Vec::with_capacity(fields.len());
        for (name, expr) in fields {
            out.push((name.clone(), self.intern(expr)?));
        }
        Ok(Shape::Record(out))
    }

    fn resolve_alias(
        &mut self,
        types: &IndexMap<String, TypeExpr>,
        name: &str,
        chain: &mut Vec<String>,
    ) -> Result<TypeId, SchemaError> {
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        if chain.iter().any(|n| n == name) {
            return Err(SchemaError::AliasCycle(name.to_string()));
        }
        chain.push(name.to_string());
        let target = match types.get(name) {
            Some(TypeExpr::Name(target)) => target,
            _ => return Err(SchemaError::UnknownType(name.to_string())),
        };
        self.resolve_alias(types, target, chain)
    }

    fn alloc(&mut self, name: Option<String>, shape: Shape) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(Entry { name, shape });
        id
    }

    fn interned(&mut self, key: InternKey, shape: Shape) -> TypeId {
        if let Some(id) = self.interned.get(&key) {
            return *id;
        }
        let id = self.alloc(None, shape);
        self.interned.insert(key, id);
        id
    }

    fn shape(&self, d: TypeId) -> &Shape {
        &self.entries[d.0 as usize].shape
    }

    fn keyword(&self, d: TypeId) -> Option<Keyword> {
        match self.shape(d) {
            Shape::Keyword(k) => Some(*k),
            _ => None,
        }
    }

    fn literal(&self, d: TypeId) -> Option<&Literal> {
        match self.shape(d) {
            Shape::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

fn is_alias(expr: &TypeExpr) -> bool {
    matches!(expr, TypeExpr::Name(name) if Keyword::from_name(name).is_none())
}

// ————————————————————————————————————————————————————————————————————————————
// ORACLE
// ————————————————————————————————————————————————————————————————————————————

impl TypeOracle for SchemaTable {
    type Descriptor = TypeId;

    fn is_boolean(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Boolean)
    }
    fn is_boolean_literal(&self, d: TypeId) -> bool {
        matches!(self.literal(d), Some(Literal::Boolean(_)))
    }
    fn is_number(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Number)
    }
    fn is_number_literal(&self, d: TypeId) -> bool {
        matches!(self.literal(d), Some(Literal::Number(_)))
    }
    fn is_bigint(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Bigint)
    }
    fn is_bigint_literal(&self, d: TypeId) -> bool {
        matches!(self.literal(d), Some(Literal::BigInt(_)))
    }
    fn is_string(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::String)
    }
    fn is_string_literal(&self, d: TypeId) -> bool {
        matches!(self.literal(d), Some(Literal::String(_)))
    }
    fn is_null(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Null)
    }
    fn is_undefined(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Undefined)
    }
    fn is_bare_object(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Object)
    }
    fn is_any(&self, d: TypeId) -> bool {
        self.keyword(d) == Some(Keyword::Any)
    }
    fn is_union(&self, d: TypeId) -> bool {
        matches!(self.shape(d), Shape::Union(_))
    }
    fn is_record_shape(&self, d: TypeId) -> bool {
        matches!(self.shape(d), Shape::Record(_))
    }
    fn is_array(&self, d: TypeId) -> bool {
        matches!(self.shape(d), Shape::Array(_))
    }

    fn union_members(&self, d: TypeId) -> Vec<TypeId> {
        match self.shape(d) {
            Shape::Union(members) => members.clone(),
            _ => Vec::new(),
        }
    }

    fn record_fields(&self, d: TypeId) -> Vec<(String, TypeId)> {
        match self.shape(d) {
            Shape::Record(fields) => fields.clone(),
            _ => Vec::new(),
        }
    }

    fn array_element(&self, d: TypeId) -> Option<TypeId> {
        match self.shape(d) {
            Shape::Array(element) => Some(*element),
            _ => None,
        }
    }

    fn literal_value(&self, d: TypeId) -> Option<Literal> {
        self.literal(d).cloned()
    }

    fn type_name(&self, d: TypeId) -> String {
        let entry = &self.entries[d.0 as usize];
        if let Some(name) = &entry.name {
            return name.clone();
        }
        match &entry.shape {
            Shape::Keyword(k) => k.as_str().to_string(),
            Shape::Literal(Literal::String(s)) => format!("{s:?}"),
            Shape::Literal(lit) => lit.source_form(),
            Shape::Array(element) => match self.shape(*element) {
                Shape::Union(_) if self.entries[element.0 as usize].name.is_none() => {
                    format!("({})[]", self.type_name(*element))
                }
                _ => format!("{}[]", self.type_name(*element)),
            },
            Shape::Union(members) => members
                .iter()
                .map(|m| self.type_name(*m))
                .collect::<Vec<_>>()
                .join(" | "),
            Shape::Record(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, ty)| {
                        let ty = self.type_name(*ty);
                        if is_identifier(name) {
                            format!("{name}: {ty};")
                        } else {
                            let quoted = serde_json::to_string(name).unwrap_or_else(|_| format!("{name:?}"));
                            format!("{quoted}: {ty};")
                        }
                    })
                    .collect::<Vec<_>>();
                if fields.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", fields.join(" "))
                }
            }
            Shape::Pending => "<pending>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDocument;
    use serde_json::json;

    fn table(types: serde_json::Value) -> Result<SchemaTable, SchemaError> {
        SchemaDocument::from_value(json!({ "types": types })).unwrap().table()
    }

    #[test]
    fn aliases_share_identity() {
        let t = table(json!({
            "A": "B",
            "B": { "record": { "n": "number" } },
            "N": "number"
        }))
        .unwrap();
        assert_eq!(t.lookup("A"), t.lookup("B"));
        assert!(t.is_number(t.lookup("N").unwrap()));
    }

    #[test]
    fn alias_cycles_and_unknown_names_fail() {
        assert!(matches!(table(json!({ "A": "B", "B": "A" })), Err(SchemaError::AliasCycle(_))));
        assert!(matches!(
            table(json!({ "A": { "array": "Missing" } })),
            Err(SchemaError::UnknownType(ref n)) if n == "Missing"
        ));
    }

    #[test]
    fn inline_shapes_intern_except_records() {
        let mut t = table(json!({})).unwrap();
        let arr = TypeExpr::Compound(Compound::Array(Box::new(TypeExpr::Name("number".into()))));
        assert_eq!(t.intern(&arr).unwrap(), t.intern(&arr).unwrap());
        let rec = TypeExpr::Compound(Compound::Record(IndexMap::new()));
        assert_ne!(t.intern(&rec).unwrap(), t.intern(&rec).unwrap());
    }

    #[test]
    fn type_names_render_like_source() {
        let mut t = table(json!({ "X": { "record": { "n": "number" } } })).unwrap();
        let expr: TypeExpr = serde_json::from_value(json!({
            "union": [{ "array": { "union": ["number", "X"] } }, { "literal": "abc" }, "undefined"]
        }))
        .unwrap();
        let id = t.intern(&expr).unwrap();
        assert_eq!(t.type_name(id), "(number | X)[] | \"abc\" | undefined");
        let anon: TypeExpr = serde_json::from_value(json!({ "record": { "x": "number" } })).unwrap();
        let id = t.intern(&anon).unwrap();
        assert_eq!(t.type_name(id), "{ x: number; }");
    }

    #[test]
    fn record_names_quote_non_identifier_keys() {
        let mut t = table(json!({})).unwrap();
        let expr: TypeExpr = serde_json::from_value(json!({
            "record": { "my-field": "string", "ok_1": "number", "2d": "boolean" }
        }))
        .unwrap();
        let id = t.intern(&expr).unwrap();
        assert_eq!(t.type_name(id), r#"{ "my-field": string; ok_1: number; "2d": boolean; }"#);
    }
}

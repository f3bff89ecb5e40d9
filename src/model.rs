//! Type model builder.
//!
//! Turns oracle descriptors into an arena of [`ParsedNode`]s. One node exists
//! per descriptor identity for the whole run; the cache entry is written before
//! children are visited, so self-referential schemas resolve to a fixed point.
pub mod union;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{CompileError, DuplicateConversion};
use crate::oracle::{Literal, TypeOracle};

// ------------------------------- Requests --------------------------------- //

/// One public validator to emit.
#[derive(Debug, Clone)]
pub struct GenerationRequest<D> {
    pub name: String,
    pub root: D,
}

/// Values that fail every structural test for `result` go through `body`.
#[derive(Debug, Clone)]
pub struct ConversionHook<D> {
    pub result: D,
    pub body: String,
    pub seq: usize,
}

// --------------------------------- Nodes ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Dense, first-encounter numbering shared by every request in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub usize);

/// Sequence number of a conversion hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Number,
    String,
    Boolean,
    Null,
    Undefined,
    Any,
    Object,
    BigInt,
    NumberLiteral,
    StringLiteral,
    BooleanLiteral,
    BigIntLiteral,
    Array,
    Union,
    Record,
    Conversion,
}

impl NodeKind {
    fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Number(_) => NodeKind::NumberLiteral,
            Literal::String(_) => NodeKind::StringLiteral,
            Literal::Boolean(_) => NodeKind::BooleanLiteral,
            Literal::BigInt(_) => NodeKind::BigIntLiteral,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub node: NodeId,
}

/// Compiled form of one descriptor. Payload fields are populated according
/// to `kind`; the rest stay empty.
#[derive(Debug, Clone)]
pub struct ParsedNode {
    pub name: String,
    pub kind: NodeKind,
    pub element: Option<NodeId>,     // Array
    pub members: Vec<Member>,        // Record, declaration order
    pub union_members: Vec<NodeId>,  // Union
    pub literal: Option<Literal>,    // *Literal
    pub record_id: Option<RecordId>, // Record
    pub conversion: Option<ConversionId>,
}

impl ParsedNode {
    fn placeholder(name: String) -> Self {
        Self {
            name,
            kind: NodeKind::Any,
            element: None,
            members: Vec::new(),
            union_members: Vec::new(),
            literal: None,
            record_id: None,
            conversion: None,
        }
    }
}

/// The finished node arena.
#[derive(Debug, Clone, Default)]
pub struct Model {
    nodes: Vec<ParsedNode>,
    record_count: usize,
}

impl Model {
    pub fn node(&self, id: NodeId) -> &ParsedNode {
        &self.nodes[id.0]
    }
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

// -------------------------------- Builder --------------------------------- //

pub struct ModelBuilder<'o, O: TypeOracle> {
    oracle: &'o O,
    nodes: Vec<ParsedNode>,
    cache: HashMap<O::Descriptor, NodeId>,
    conversions: HashMap<O::Descriptor, ConversionId>,
    record_count: usize,
    canonical_boolean: Option<NodeId>,
    /// Unions whose members are still being folded.
    folding: HashSet<NodeId>,
}

impl<'o, O: TypeOracle> ModelBuilder<'o, O> {
    /// Registers the conversion hooks up front; two hooks on one descriptor
    /// are rejected here rather than when the descriptor is first reached.
    pub fn new(oracle: &'o O, hooks: &[ConversionHook<O::Descriptor>]) -> Result<Self, CompileError> {
        let mut conversions = HashMap::with_capacity(hooks.len());
        for hook in hooks {
            if let Some(first) = conversions.insert(hook.result, ConversionId(hook.seq)) {
                return Err(DuplicateConversion::SameTarget {
                    type_name: oracle.type_name(hook.result),
                    first: first.0,
                    second: hook.seq,
                }
                .into());
            }
        }
        Ok(Self {
            oracle,
            nodes: Vec::new(),
            cache: HashMap::new(),
            conversions,
            record_count: 0,
            canonical_boolean: None,
            folding: HashSet::new(),
        })
    }

    pub fn node(&self, id: NodeId) -> &ParsedNode {
        &self.nodes[id.0]
    }

    pub fn finish(self) -> Model {
        Model {
            nodes: self.nodes,
            record_count: self.record_count,
        }
    }

    /// Resolve a descriptor, returning the cached node on every later call.
    pub fn resolve(&mut self, d: O::Descriptor) -> Result<NodeId, CompileError> {
        if let Some(&id) = self.cache.get(&d) {
            return Ok(id);
        }

        let name = self.oracle.type_name(d);
        let id = NodeId(self.nodes.len());
        self.nodes.push(ParsedNode::placeholder(name.clone()));
        self.cache.insert(d, id);
        debug!(type_name = %name, node = id.0, "parse");

        // a registered transform replaces structural validation entirely
        if let Some(&conversion) = self.conversions.get(&d) {
            let node = &mut self.nodes[id.0];
            node.kind = NodeKind::Conversion;
            node.conversion = Some(conversion);
            return Ok(id);
        }

        let o = self.oracle;
        if o.is_boolean(d) {
            self.nodes[id.0].kind = NodeKind::Boolean;
        } else if o.is_boolean_literal(d) {
            self.resolve_literal(id, d)?;
        } else if o.is_number(d) {
            self.nodes[id.0].kind = NodeKind::Number;
        } else if o.is_number_literal(d) {
            self.resolve_literal(id, d)?;
        } else if o.is_bigint(d) {
            self.nodes[id.0].kind = NodeKind::BigInt;
        } else if o.is_bigint_literal(d) {
            self.resolve_literal(id, d)?;
        } else if o.is_string(d) {
            self.nodes[id.0].kind = NodeKind::String;
        } else if o.is_string_literal(d) {
            self.resolve_literal(id, d)?;
        } else if o.is_null(d) {
            self.nodes[id.0].kind = NodeKind::Null;
        } else if o.is_undefined(d) {
            self.nodes[id.0].kind = NodeKind::Undefined;
        } else if o.is_bare_object(d) {
            self.nodes[id.0].kind = NodeKind::Object;
        } else if o.is_any(d) {
            self.nodes[id.0].kind = NodeKind::Any;
        } else if o.is_union(d) {
            self.resolve_union(id, d)?;
        } else if o.is_record_shape(d) {
            self.resolve_record(id, d)?;
        } else if o.is_array(d) {
            self.resolve_array(id, d)?;
        } else {
            return Err(CompileError::unsupported(name, "no supported classification"));
        }
        Ok(id)
    }

    fn resolve_literal(&mut self, id: NodeId, d: O::Descriptor) -> Result<(), CompileError> {
        let Some(literal) = self.oracle.literal_value(d) else {
            return Err(CompileError::unsupported(&self.nodes[id.0].name, "literal type without a value"));
        };
        let node = &mut self.nodes[id.0];
        node.kind = NodeKind::of_literal(&literal);
        node.literal = Some(literal);
        Ok(())
    }

    fn resolve_record(&mut self, id: NodeId, d: O::Descriptor) -> Result<(), CompileError> {
        let record_id = RecordId(self.record_count);
        self.record_count += 1;
        {
            let node = &mut self.nodes[id.0];
            node.kind = NodeKind::Record;
            node.record_id = Some(record_id);
            debug!(type_name = %node.name, record = record_id.0, "record");
        }
        for (field, field_type) in self.oracle.record_fields(d) {
            let member = self.resolve(field_type)?;
            self.nodes[id.0].members.push(Member { name: field, node: member });
        }
        Ok(())
    }

    fn resolve_array(&mut self, id: NodeId, d: O::Descriptor) -> Result<(), CompileError> {
        self.nodes[id.0].kind = NodeKind::Array;
        let Some(element) = self.oracle.array_element(d) else {
            return Err(CompileError::unsupported(&self.nodes[id.0].name, "array type without an element type"));
        };
        debug!(type_name = %self.oracle.type_name(element), "array of");
        let element = self.resolve(element)?;
        self.nodes[id.0].element = Some(element);
        Ok(())
    }

    fn resolve_union(&mut self, id: NodeId, d: O::Descriptor) -> Result<(), CompileError> {
        self.nodes[id.0].kind = NodeKind::Union;
        self.folding.insert(id);
        let mut folded = Vec::new();
        for member in self.oracle.union_members(d) {
            let member = self.resolve(member)?;
            self.fold_member(id, &mut folded, member)?;
        }
        self.folding.remove(&id);
        self.nodes[id.0].union_members = folded;
        Ok(())
    }

    /// Shared `boolean` node that replaces a `true | false` pair.
    fn canonical_boolean(&mut self) -> NodeId {
        if let Some(id) = self.canonical_boolean {
            return id;
        }
        let id = NodeId(self.nodes.len());
        let mut node = ParsedNode::placeholder("boolean".to_string());
        node.kind = NodeKind::Boolean;
        self.nodes.push(node);
        self.canonical_boolean = Some(id);
        id
    }
}

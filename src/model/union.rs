//! Union folding policies.
//!
//! Members are folded in declaration order into the union's member list:
//! - `true` and `false` merge into the canonical `boolean` node;
//! - a second `boolean` (or a literal it subsumes) is dropped;
//! - arrays go in front of the first record, because both pass a bare
//!   "non-null object" probe and the element-wise array check has to run first;
//! - at most one conversion per union;
//! - nested unions are flattened into the outer one.
use super::{ModelBuilder, NodeId, NodeKind};
use crate::error::{CompileError, DuplicateConversion};
use crate::oracle::{Literal, TypeOracle};

impl<O: TypeOracle> ModelBuilder<'_, O> {
    pub(super) fn fold_member(
        &mut self,
        union: NodeId,
        folded: &mut Vec<NodeId>,
        member: NodeId,
    ) -> Result<(), CompileError> {
        if folded.contains(&member) {
            return Ok(());
        }
        match self.nodes[member.0].kind {
            NodeKind::Union => {
                if self.folding.contains(&member) {
                    return Err(CompileError::unsupported(
                        &self.nodes[member.0].name,
                        "union type circularly references itself",
                    ));
                }
                for nested in self.nodes[member.0].union_members.clone() {
                    self.fold_member(union, folded, nested)?;
                }
            }
            NodeKind::Boolean => {
                if self.position_of(folded, NodeKind::Boolean).is_some() {
                    return Ok(());
                }
                // a plain boolean absorbs any literal already present
                let mut literals = folded
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| self.nodes[m.0].kind == NodeKind::BooleanLiteral)
                    .map(|(i, _)| i)
                    .collect::<Vec<_>>();
                match literals.first().copied() {
                    Some(first) => {
                        folded[first] = member;
                        literals.remove(0);
                        for i in literals.into_iter().rev() {
                            folded.remove(i);
                        }
                    }
                    None => folded.push(member),
                }
            }
            NodeKind::BooleanLiteral => {
                if self.position_of(folded, NodeKind::Boolean).is_some() {
                    return Ok(());
                }
                let value = self.boolean_value(member);
                let opposite = folded.iter().position(|m| {
                    self.nodes[m.0].kind == NodeKind::BooleanLiteral && self.boolean_value(*m) != value
                });
                match opposite {
                    Some(pos) => folded[pos] = self.canonical_boolean(),
                    None => folded.push(member),
                }
            }
            NodeKind::Array => match self.position_of(folded, NodeKind::Record) {
                Some(pos) => folded.insert(pos, member),
                None => folded.push(member),
            },
            NodeKind::Conversion => {
                if self.position_of(folded, NodeKind::Conversion).is_some() {
                    return Err(DuplicateConversion::InUnion {
                        union: self.nodes[union.0].name.clone(),
                    }
                    .into());
                }
                folded.push(member);
            }
            _ => folded.push(member),
        }
        Ok(())
    }

    fn position_of(&self, folded: &[NodeId], kind: NodeKind) -> Option<usize> {
        folded.iter().position(|m| self.nodes[m.0].kind == kind)
    }

    fn boolean_value(&self, id: NodeId) -> Option<bool> {
        match self.nodes[id.0].literal {
            Some(Literal::Boolean(b)) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{CompileError, DuplicateConversion};
    use crate::model::{ConversionHook, ModelBuilder, NodeKind};
    use crate::schema::{SchemaDocument, SchemaTable};
    use serde_json::json;

    fn table(types: serde_json::Value) -> SchemaTable {
        SchemaDocument::from_value(json!({ "types": types })).unwrap().table().unwrap()
    }

    fn member_kinds(t: &SchemaTable, name: &str) -> Vec<NodeKind> {
        let mut b = ModelBuilder::new(t, &[]).unwrap();
        let id = b.resolve(t.lookup(name).unwrap()).unwrap();
        b.node(id).union_members.iter().map(|m| b.node(*m).kind).collect()
    }

    #[test]
    fn true_false_merge_into_boolean() {
        let t = table(json!({ "B": { "union": [{ "literal": true }, { "literal": false }] } }));
        assert_eq!(member_kinds(&t, "B"), [NodeKind::Boolean]);
    }

    #[test]
    fn single_boolean_literal_stays_literal() {
        let t = table(json!({ "B": { "union": [{ "literal": true }, "string"] } }));
        assert_eq!(member_kinds(&t, "B"), [NodeKind::BooleanLiteral, NodeKind::String]);
    }

    #[test]
    fn boolean_subsumes_literals() {
        let t = table(json!({ "B": { "union": [{ "literal": true }, "number", "boolean", { "literal": false }] } }));
        assert_eq!(member_kinds(&t, "B"), [NodeKind::Boolean, NodeKind::Number]);
    }

    #[test]
    fn array_goes_before_records() {
        let t = table(json!({
            "R": { "record": { "n": "number" } },
            "U": { "union": ["null", "R", { "array": "number" }, "undefined"] }
        }));
        assert_eq!(
            member_kinds(&t, "U"),
            [NodeKind::Null, NodeKind::Array, NodeKind::Record, NodeKind::Undefined]
        );
    }

    #[test]
    fn nested_unions_flatten() {
        let t = table(json!({
            "Inner": { "union": ["string", "null"] },
            "U": { "union": ["number", "Inner"] }
        }));
        assert_eq!(member_kinds(&t, "U"), [NodeKind::Number, NodeKind::String, NodeKind::Null]);
    }

    #[test]
    fn two_conversions_in_one_union_fail() {
        let t = table(json!({
            "Date": "object",
            "RegExp": { "record": { "source": "string" } },
            "U": { "union": ["Date", "RegExp"] }
        }));
        let hooks = [
            ConversionHook { result: t.lookup("Date").unwrap(), body: String::new(), seq: 1 },
            ConversionHook { result: t.lookup("RegExp").unwrap(), body: String::new(), seq: 2 },
        ];
        let mut b = ModelBuilder::new(&t, &hooks).unwrap();
        let err = b.resolve(t.lookup("U").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateConversion(DuplicateConversion::InUnion { .. })
        ));
    }
}

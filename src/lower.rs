//! Validator synthesizer: parsed nodes → logical program.
use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::error::{CompileError, DuplicateConversion};
use crate::ir::{
    Alternative, CheckChain, Convert, ConversionRoutine, Fail, Fallback, IndexVar, PathExpr, Program, RecordCheck,
    Stmt, Test, TypeTag, Validator, ValueExpr, VALUE_PARAM,
};
use crate::model::{ConversionId, Model, NodeId, NodeKind, RecordId};

/// A resolved generation request.
#[derive(Debug, Clone)]
pub struct Root {
    pub name: String,
    pub node: NodeId,
    pub return_type: String,
}

/// Emit one public validator per root (in order), one record check per record
/// shape they reach, and every conversion routine.
pub fn synthesize(
    model: &Model,
    roots: &[Root],
    mut conversions: Vec<ConversionRoutine>,
) -> Result<Program, CompileError> {
    let mut lowering = Lowering::new(model);

    let mut validators = Vec::with_capacity(roots.len());
    for root in roots {
        let body = lowering.build(root.node, &ValueExpr::Param, &PathExpr::lit(VALUE_PARAM), 0)?;
        info!(validator = %root.name, return_type = %root.return_type, "generate");
        validators.push(Validator {
            name: root.name.clone(),
            return_type: root.return_type.clone(),
            body,
        });
    }

    let mut record_checks = BTreeMap::new();
    while let Some(node) = lowering.pending.pop_front() {
        let parsed = model.node(node);
        let Some(record) = parsed.record_id else {
            continue;
        };
        let mut body = Vec::new();
        for member in &parsed.members {
            let value = ValueExpr::Param.field(&member.name);
            let path = PathExpr::Prefix.add(PathExpr::lit(format!(".{}", member.name)));
            body.extend(lowering.build(member.node, &value, &path, 0)?);
        }
        debug!(record = record.0, type_name = %parsed.name, fields = parsed.members.len(), "record check");
        record_checks.insert(
            record,
            RecordCheck { record, body },
        );
    }

    conversions.sort_by_key(|c| c.conversion);
    Ok(Program {
        validators,
        record_checks: record_checks.into_values().collect(),
        conversions,
    })
}

struct Lowering<'m> {
    model: &'m Model,
    discovered: HashSet<RecordId>,
    pending: VecDeque<NodeId>,
    /// Arrays and unions being expanded into the current chain.
    active: Vec<NodeId>,
}

#[derive(Default)]
struct Chain {
    alternatives: Vec<Alternative>,
    conversion: Option<ConversionId>,
}

impl<'m> Lowering<'m> {
    fn new(model: &'m Model) -> Self {
        Self {
            model,
            discovered: HashSet::new(),
            pending: VecDeque::new(),
            active: Vec::new(),
        }
    }

    /// Statements validating `value` against `node`.
    fn build(&mut self, node: NodeId, value: &ValueExpr, path: &PathExpr, depth: usize) -> Result<Vec<Stmt>, CompileError> {
        let mut chain = Chain::default();
        self.checks(node, value, path, depth, &mut chain)?;

        let Chain { alternatives, conversion } = chain;
        if alternatives.is_empty() {
            return Ok(match conversion {
                Some(conversion) => vec![Stmt::Convert(Convert {
                    conversion,
                    target: value.clone(),
                })],
                None => Vec::new(),
            });
        }

        let otherwise = match conversion {
            Some(conversion) => Fallback::Convert(Convert {
                conversion,
                target: value.clone(),
            }),
            None => {
                let mut expected: Vec<String> = Vec::new();
                for alt in &alternatives {
                    if !expected.contains(&alt.label) {
                        expected.push(alt.label.clone());
                    }
                }
                Fallback::Fail(Fail {
                    path: path.folded(),
                    expected,
                })
            }
        };
        Ok(vec![Stmt::Check(CheckChain { alternatives, otherwise })])
    }

    fn checks(
        &mut self,
        node: NodeId,
        value: &ValueExpr,
        path: &PathExpr,
        depth: usize,
        chain: &mut Chain,
    ) -> Result<(), CompileError> {
        let model = self.model;
        let parsed = model.node(node);
        let mut push = |label: &str, test: Test, then: Vec<Stmt>| {
            chain.alternatives.push(Alternative {
                label: label.to_string(),
                test,
                then,
            })
        };

        match parsed.kind {
            NodeKind::Number => push("Number", Test::TypeOf(value.clone(), TypeTag::Number), Vec::new()),
            NodeKind::String => push("String", Test::TypeOf(value.clone(), TypeTag::String), Vec::new()),
            NodeKind::Boolean => push("Boolean", Test::TypeOf(value.clone(), TypeTag::Boolean), Vec::new()),
            NodeKind::Undefined => push("Undefined", Test::TypeOf(value.clone(), TypeTag::Undefined), Vec::new()),
            NodeKind::BigInt => push("BigInt", Test::TypeOf(value.clone(), TypeTag::BigInt), Vec::new()),
            NodeKind::Object => push("Object", Test::NonNullObject(value.clone()), Vec::new()),
            NodeKind::Null => push("Null", Test::IsNull(value.clone()), Vec::new()),
            NodeKind::NumberLiteral
            | NodeKind::StringLiteral
            | NodeKind::BooleanLiteral
            | NodeKind::BigIntLiteral => {
                let Some(literal) = parsed.literal.clone() else {
                    return Err(CompileError::unsupported(&parsed.name, "literal type without a value"));
                };
                push(&literal.source_form(), Test::Equals(value.clone(), literal), Vec::new());
            }
            // accepted as is, and contributes nothing inside a union either
            NodeKind::Any => {}
            NodeKind::Array => {
                let Some(element) = parsed.element else {
                    return Err(CompileError::unsupported(&parsed.name, "array type without an element type"));
                };
                self.enter(node)?;
                let index = IndexVar { depth };
                let element_path = path
                    .clone()
                    .add(PathExpr::lit("["))
                    .add(PathExpr::Index(index))
                    .add(PathExpr::lit("]"));
                let body = self.build(element, &value.index(index), &element_path, depth + 1)?;
                self.active.pop();
                let then = if body.is_empty() {
                    Vec::new()
                } else {
                    vec![Stmt::ForEach {
                        array: value.clone(),
                        index,
                        body,
                    }]
                };
                chain.alternatives.push(Alternative {
                    label: "Array".to_string(),
                    test: Test::IsArray(value.clone()),
                    then,
                });
            }
            NodeKind::Record => {
                let Some(record) = parsed.record_id else {
                    return Err(CompileError::unsupported(&parsed.name, "record without an id"));
                };
                if self.discovered.insert(record) {
                    self.pending.push_back(node);
                }
                push(
                    "Object",
                    Test::NonNullObject(value.clone()),
                    vec![Stmt::CallRecordCheck {
                        record,
                        value: value.clone(),
                        path: path.folded(),
                    }],
                );
            }
            NodeKind::Union => {
                self.enter(node)?;
                for &member in &parsed.union_members {
                    self.checks(member, value, path, depth, chain)?;
                }
                self.active.pop();
            }
            NodeKind::Conversion => {
                let Some(conversion) = parsed.conversion else {
                    return Err(CompileError::unsupported(&parsed.name, "conversion without a hook"));
                };
                if chain.conversion.is_some_and(|c| c != conversion) {
                    return Err(DuplicateConversion::InUnion {
                        union: parsed.name.clone(),
                    }
                    .into());
                }
                chain.conversion = Some(conversion);
            }
        }
        Ok(())
    }

    /// Arrays and unions expand inline; meeting one again before a record
    /// boundary would never terminate.
    fn enter(&mut self, node: NodeId) -> Result<(), CompileError> {
        if self.active.contains(&node) {
            return Err(CompileError::unsupported(
                &self.model.node(node).name,
                "recursive type without a record boundary",
            ));
        }
        self.active.push(node);
        Ok(())
    }
}

//! Compile structural schemas into validator programs.
//!
//! Pipeline: a [`TypeOracle`] classifies descriptors, the [`ModelBuilder`]
//! turns every requested descriptor into a memoized node graph, and the
//! synthesizer in [`lower`] emits the logical [`Program`]. The program can be
//! rendered as source text ([`codegen`]) or executed in-process ([`eval`]).
pub mod codegen;
pub mod convert;
pub mod error;
pub mod eval;
pub mod ir;
pub mod lower;
pub mod model;
pub mod oracle;
pub mod path_de;
pub mod schema;

pub use error::{CheckError, CompileError, ConversionFailure, DuplicateConversion, Error, SchemaError, TypeMismatch};
pub use eval::{Evaluator, Transforms, Value};
pub use ir::Program;
pub use model::{ConversionHook, GenerationRequest, Model, ModelBuilder};
pub use oracle::TypeOracle;
pub use schema::{SchemaDocument, SchemaTable};

use ir::ConversionRoutine;
use lower::Root;
use model::ConversionId;

/// Resolve every request against `oracle` and synthesize the program.
///
/// All roots are resolved before any routine is synthesized, so record ids
/// follow first-encounter order across the whole batch. Nothing is returned
/// unless every request compiles.
pub fn compile<O: TypeOracle>(
    oracle: &O,
    requests: &[GenerationRequest<O::Descriptor>],
    conversions: &[ConversionHook<O::Descriptor>],
) -> Result<Program, CompileError> {
    let mut builder = ModelBuilder::new(oracle, conversions)?;
    let mut roots = Vec::with_capacity(requests.len());
    for request in requests {
        let node = builder.resolve(request.root)?;
        roots.push(Root {
            name: request.name.clone(),
            node,
            return_type: oracle.type_name(request.root),
        });
    }
    let model = builder.finish();

    let routines = conversions
        .iter()
        .map(|hook| ConversionRoutine {
            conversion: ConversionId(hook.seq),
            result_type: oracle.type_name(hook.result),
            body: hook.body.clone(),
        })
        .collect();

    lower::synthesize(&model, &roots, routines)
}

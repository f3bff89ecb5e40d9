//! TypeScript output for validator programs.
use std::fmt::Write as _;

use crate::ir::{
    conversion_name, CheckChain, Convert, Fail, Fallback, PathExpr, PathPart, Program, Stmt, Test, ValueExpr,
    PATH_PARAM, VALUE_PARAM,
};
use crate::oracle::{is_identifier, js_number, Literal};

const INDENT: &str = "    ";

const TYPE_ERROR_CLASS: &str = "export class TypeError implements Error {
    public name = \"TypeError\";
    constructor(public message: string) { }
    toString() {
        return this.name + \": \" + this.message;
    }
}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

/// Collects rendered top-level items; [`Codegen::into_string`] joins them
/// with blank lines in the chosen line ending.
#[derive(Debug, Default)]
pub struct Codegen {
    items: Vec<String>,
    eol: LineEnding,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_ending(mut self, eol: LineEnding) -> Self {
        self.eol = eol;
        self
    }

    /// Imports first, then the error class, validators, record checks and
    /// conversion routines.
    pub fn emit(&mut self, program: &Program, imports: &[String]) {
        if !imports.is_empty() {
            self.items.push(imports.join("\n"));
        }
        self.items.push(TYPE_ERROR_CLASS.to_string());

        for validator in &program.validators {
            let mut out = format!(
                "export function {}({}): {} {{\n",
                validator.name,
                typed_params(validator.params()),
                validator.return_type
            );
            write_block(&mut out, &validator.body, 1);
            let _ = writeln!(out, "{INDENT}return <{}>{VALUE_PARAM};", validator.return_type);
            out.push('}');
            self.items.push(out);
        }

        for check in &program.record_checks {
            let mut out = format!("function {}({}) {{\n", check.name(), typed_params(check.params()));
            write_block(&mut out, &check.body, 1);
            out.push('}');
            self.items.push(out);
        }

        for conversion in &program.conversions {
            let mut out = format!(
                "function {}({}): {} {{\n",
                conversion.name(),
                typed_params(conversion.params()),
                conversion.result_type
            );
            for line in conversion.body.lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "{INDENT}{line}");
                }
            }
            out.push('}');
            self.items.push(out);
        }
    }

    pub fn into_string(self) -> String {
        let eol = self.eol.as_str();
        let mut out = self.items.join("\n\n");
        out.push('\n');
        if eol == "\n" {
            out
        } else {
            out = out.replace("\r\n", "\n");
            out.replace('\n', eol)
        }
    }
}

fn typed_params(params: &[&str]) -> String {
    params
        .iter()
        .map(|p| match *p {
            PATH_PARAM => format!("{p}: string"),
            _ => format!("{p}: any"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ————————————————————————————————————————————————————————————————————————————
// STATEMENTS
// ————————————————————————————————————————————————————————————————————————————

fn write_block(out: &mut String, body: &[Stmt], depth: usize) {
    for stmt in body {
        write_stmt(out, stmt, depth);
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Check(chain) => write_chain(out, chain, depth),
        Stmt::Convert(convert) => {
            let _ = writeln!(out, "{pad}{}", render_convert(convert));
        }
        Stmt::ForEach { array, index, body } => {
            let array = render_value(array);
            let i = index.name();
            let _ = writeln!(out, "{pad}for (let {i} = 0; {i} < {array}.length; {i}++) {{");
            write_block(out, body, depth + 1);
            let _ = writeln!(out, "{pad}}}");
        }
        Stmt::CallRecordCheck { record, value, path } => {
            let _ = writeln!(
                out,
                "{pad}__check_{}({}, {});",
                record.0,
                render_value(value),
                render_path(path)
            );
        }
    }
}

fn write_chain(out: &mut String, chain: &CheckChain, depth: usize) {
    let pad = INDENT.repeat(depth);
    for (n, alt) in chain.alternatives.iter().enumerate() {
        let keyword = if n == 0 { "if" } else { "else if" };
        let test = render_test(&alt.test);
        if alt.then.is_empty() {
            let _ = writeln!(out, "{pad}{keyword} ({test}) {{ }}");
        } else {
            let _ = writeln!(out, "{pad}{keyword} ({test}) {{");
            write_block(out, &alt.then, depth + 1);
            let _ = writeln!(out, "{pad}}}");
        }
    }
    let _ = writeln!(out, "{pad}else");
    let fallback = match &chain.otherwise {
        Fallback::Convert(convert) => render_convert(convert),
        Fallback::Fail(fail) => render_fail(fail),
    };
    let _ = writeln!(out, "{pad}{INDENT}{fallback}");
}

fn render_convert(convert: &Convert) -> String {
    let target = render_value(&convert.target);
    format!("{target} = {}({target});", conversion_name(convert.conversion))
}

fn render_fail(fail: &Fail) -> String {
    let message = fail
        .path
        .clone()
        .add(PathExpr::lit(format!(" is not {}.", fail.expected.join(" | "))))
        .folded();
    format!("throw new TypeError({});", render_path(&message))
}

// ————————————————————————————————————————————————————————————————————————————
// EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

fn render_test(test: &Test) -> String {
    match test {
        Test::TypeOf(v, tag) => format!("typeof {} === \"{}\"", render_value(v), tag.as_str()),
        Test::NonNullObject(v) => {
            let v = render_value(v);
            format!("{v} !== null && typeof {v} === \"object\"")
        }
        Test::IsNull(v) => format!("{} === null", render_value(v)),
        Test::Equals(v, literal) => format!("{} === {}", render_value(v), render_literal(literal)),
        Test::IsArray(v) => format!("Array.isArray({})", render_value(v)),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => js_number(n.0),
        Literal::String(s) => quote(s),
        Literal::Boolean(b) => b.to_string(),
        Literal::BigInt(b) => b.to_string(),
    }
}

fn render_value(expr: &ValueExpr) -> String {
    match expr {
        ValueExpr::Param => VALUE_PARAM.to_string(),
        ValueExpr::Field(base, name) if is_identifier(name) => format!("{}.{name}", render_value(base)),
        ValueExpr::Field(base, name) => format!("{}[{}]", render_value(base), quote(name)),
        ValueExpr::Index(base, var) => format!("{}[{}]", render_value(base), var.name()),
    }
}

fn render_path(path: &PathExpr) -> String {
    path.parts()
        .into_iter()
        .map(|part| match part {
            PathPart::Lit(s) => quote(&s),
            PathPart::Prefix => PATH_PARAM.to_string(),
            PathPart::Index(var) => var.name(),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDocument;
    use serde_json::json;

    fn render(doc: serde_json::Value) -> String {
        let doc = SchemaDocument::from_value(doc).unwrap();
        let program = doc.compile().unwrap();
        let mut cg = Codegen::new().with_line_ending(LineEnding::Lf);
        cg.emit(&program, &doc.imports);
        cg.into_string()
    }

    #[test]
    fn primitive_validator() {
        let src = render(json!({ "generate": [{ "name": "parseN", "type": "number" }] }));
        assert!(src.contains(
            "export function parseN(value: any): number {\n    if (typeof value === \"number\") { }\n    else\n        throw new TypeError(\"value is not Number.\");\n    return <number>value;\n}"
        ));
        assert!(src.starts_with("export class TypeError implements Error {"));
    }

    #[test]
    fn record_check_concatenates_paths() {
        let src = render(json!({
            "imports": ["import { X } from './types'"],
            "types": { "X": { "record": { "xa": { "array": "X" }, "my-field": "string" } } },
            "generate": [{ "name": "parseX", "type": "X" }]
        }));
        assert!(src.starts_with("import { X } from './types'\n\n"));
        assert!(src.contains("function __check_0(value: any, path: string) {"));
        assert!(src.contains("for (let i = 0; i < value.xa.length; i++) {"));
        assert!(src.contains("__check_0(value.xa[i], path + \".xa[\" + i + \"]\");"));
        assert!(src.contains("throw new TypeError(path + \".xa[\" + i + \"] is not Object.\");"));
        assert!(src.contains("if (typeof value[\"my-field\"] === \"string\") { }"));
    }

    #[test]
    fn conversions_and_literals() {
        let src = render(json!({
            "types": { "Date": { "record": { "getTime": "number" } } },
            "conversions": [{ "type": "Date", "builtin": "iso-date" }],
            "generate": [
                { "name": "parseDate", "type": "Date" },
                { "name": "parseL", "type": { "union": [{ "literal": "a" }, { "bigint": "-5" }] } }
            ]
        }));
        assert!(src.contains("    value = __convert_1(value);\n"));
        assert!(src.contains("function __convert_1(value: any): Date {\n    if (value instanceof Date)\n"));
        assert!(src.contains("if (value === \"a\") { }\n    else if (value === -5n) { }"));
        assert!(src.contains("throw new TypeError(\"value is not 'a' | -5n.\");"));
    }

    #[test]
    fn crlf_by_default() {
        let program = Program::default();
        let mut cg = Codegen::new();
        cg.emit(&program, &[]);
        let src = cg.into_string();
        assert!(src.contains("\r\n"));
        assert!(!src.replace("\r\n", "").contains('\n'));
    }
}

//! CLI: schema document → (TypeScript validators | checked JSON)
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::info;

use shape_guard::codegen::{Codegen, LineEnding};
use shape_guard::{Evaluator, SchemaDocument, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a schema document into validators, or run them over JSON inputs
#[derive(Parser, Debug)]
#[command(name = "shape-guard", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit TypeScript validators for every `generate` entry
    Generate(GenerateOut),
    /// run one validator over JSON/NDJSON files
    Check(CheckIn),
}

#[derive(Args, Debug, Clone)]
struct ConfigSettings {
    /// schema document (JSON)
    #[arg(long, short)]
    config: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    config_settings: ConfigSettings,

    /// output .ts file; defaults to the document's `fileName`, `-` for stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// use LF line endings instead of CRLF
    #[arg(long)]
    lf: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckIn {
    #[command(flatten)]
    config_settings: ConfigSettings,

    /// name of the generated validator to run
    #[arg(long)]
    validator: String,

    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConfigSettings {
    fn load(&self) -> anyhow::Result<SchemaDocument> {
        SchemaDocument::load(&self.config)
            .with_context(|| format!("failed to load schema document {}", self.config.display()))
    }
}

impl InputSettings {
    /// Every document of one file, after JSON pointer selection.
    fn load_file(&self, source_path: &Path) -> anyhow::Result<Vec<serde_json::Value>> {
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {}", source_path.display()))?;
        let documents = if self.ndjson {
            source
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str::<serde_json::Value>)
                .collect::<Result<Vec<_>, _>>()
        } else {
            serde_json::from_str::<serde_json::Value>(&source).map(|v| vec![v])
        };
        let documents = documents.with_context(|| format!("failed to parse JSON source file {}", source_path.display()))?;
        match self.json_pointer.as_deref() {
            None => Ok(documents),
            Some(pointer) => documents
                .into_iter()
                .map(|doc| match doc.pointer(pointer) {
                    Some(node) => Ok(node.clone()),
                    None => bail!("JSON pointer {pointer} not found in {}", source_path.display()),
                })
                .collect(),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<ExitCode> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(ExitCode::SUCCESS);
                }

                let doc = target.config_settings.load()?;
                let program = doc.compile()?;
                let eol = if target.lf { LineEnding::Lf } else { LineEnding::CrLf };
                let mut cg = Codegen::new().with_line_ending(eol);
                cg.emit(&program, &doc.imports);
                let ts_src = cg.into_string();

                let out = match target.out.as_ref() {
                    Some(out) => out.clone(),
                    None => {
                        let base = target.config_settings.config.parent().unwrap_or(Path::new(""));
                        base.join(&doc.file_name)
                    }
                };
                if out.as_os_str() == "-" {
                    print!("{ts_src}");
                    return Ok(ExitCode::SUCCESS);
                }
                if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                std::fs::write(&out, &ts_src).with_context(|| format!("failed to write {}", out.display()))?;
                info!(path = %out.display(), validators = program.validators.len(), "wrote");
                eprintln!(
                    "{} {} ({} validators, {} record checks, {} conversions)",
                    "wrote".green().bold(),
                    out.display(),
                    program.validators.len(),
                    program.record_checks.len(),
                    program.conversions.len()
                );
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => {
                let doc = target.config_settings.load()?;
                let program = doc.compile()?;
                if program.validator(&target.validator).is_none() {
                    bail!("no validator named `{}` in {}", target.validator, target.config_settings.config.display());
                }
                let transforms = doc.transforms();
                let evaluator = Evaluator::new(&program, &transforms);

                let source_paths = resolve_file_path_patterns(&target.input_settings.input)?;
                let outcomes = source_paths
                    .par_iter()
                    .map(|source_path| {
                        let documents = target.input_settings.load_file(source_path)?;
                        for (n, document) in documents.into_iter().enumerate() {
                            evaluator
                                .validate(&target.validator, Value::from(document))
                                .with_context(|| format!("document {n}"))?;
                        }
                        Ok(())
                    })
                    .collect::<Vec<anyhow::Result<()>>>();

                let mut failures = 0usize;
                for (source_path, outcome) in source_paths.iter().zip(outcomes) {
                    match outcome {
                        Ok(()) => println!("{} {}", "ok".green().bold(), source_path.display()),
                        Err(error) => {
                            failures += 1;
                            println!("{} {}: {error:#}", "failed".red().bold(), source_path.display());
                        }
                    }
                }
                info!(files = source_paths.len(), failures, "checked");
                if failures == 0 {
                    Ok(ExitCode::SUCCESS)
                } else {
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

//!
//! Type-checks a ThingTalk program against a schema file and prints what it
//! still needs (its slots), its rule plans or its canonical form as JSON.
//!
//! Usage: `thingtalk-check --schemas <schemas.json> <program.tt> [--emit slots|plans|program]`

use clap::{Parser, ValueEnum};
use serde_json::{json, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use thingtalk::{
    compile_program, format_errors, generate, iterate_slots2, parse_source, typecheck_program,
    CheckerOptions, CompileError, CompileResult, ErrorKind, MemorySchemaDelegate, NodePath,
    Program, SchemaRetriever, SlotItem, SourceMap,
};

#[derive(Parser, Debug)]
#[command(name = "thingtalk-check")]
#[command(about = "Type-check a ThingTalk program and report its slots or rule plans")]
struct Args {
    /// Path to the program
    program: PathBuf,

    /// JSON file with the class schemas, keyed by device kind
    #[arg(long)]
    schemas: PathBuf,

    /// What to print once the program is well-typed
    #[arg(long, value_enum, default_value_t = Emit::Slots)]
    emit: Emit,

    /// Reject missing required parameters instead of filling them with `$?`
    #[arg(long)]
    strict: bool,

    /// Locale of slot prompts
    #[arg(long, default_value = "en-US")]
    locale: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Emit {
    Slots,
    Plans,
    Program,
}

#[tokio::main]
async fn main() {
    thingtalk_tools::init_logging();

    let args = Args::parse();

    let code = read(&args.program);
    let delegate = match MemorySchemaDelegate::from_json(&read(&args.schemas)) {
        Ok(delegate) => delegate,
        Err(e) => {
            error!("Invalid schema file '{}': {}", args.schemas.display(), e);
            process::exit(1);
        }
    };
    let schemas = SchemaRetriever::new(Arc::new(delegate));

    let mut sources = SourceMap::new();
    let name = args.program.display().to_string();
    match check(&args, &name, &code, &mut sources, &schemas).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to print output: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("{}", format_errors(&[e], &sources).trim_end());
            process::exit(1);
        }
    }
}

fn read(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

async fn check(
    args: &Args,
    name: &str,
    code: &str,
    sources: &mut SourceMap,
    schemas: &SchemaRetriever,
) -> CompileResult<Json> {
    let mut program = parse_source(name, code, sources)?;
    let options = CheckerOptions {
        allow_undefined: !args.strict,
    };
    typecheck_program(&mut program, schemas, &options).await?;
    info!(file = name, rules = program.rules.len(), "program is well-typed");

    match args.emit {
        Emit::Program => Ok(json!({ "program": generate(&program) })),
        Emit::Slots => Ok(slots(&program, &args.locale)),
        Emit::Plans => {
            let plans = compile_program(&program)?;
            serde_json::to_value(plans).map_err(|e| {
                CompileError::new(ErrorKind::Internal, NodePath::root(), e.to_string())
            })
        }
    }
}

fn slots(program: &Program, locale: &str) -> Json {
    let items = iterate_slots2(program)
        .map(|item| match item {
            SlotItem::Selector(selector) => json!({ "selector": selector.kind }),
            SlotItem::Value(slot) => {
                let prompt = slot.prompt(locale).ok();
                json!({ "slot": slot, "prompt": prompt })
            }
        })
        .collect();
    Json::Array(items)
}

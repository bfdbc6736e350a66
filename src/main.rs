//! `elc <FILE> [--emit run|ast|bytecode|json] [--debug] [--json-errors]`
//!
//! Compiles and runs `.el` source files, or assembles and runs `.elb`
//! bytecode listings.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use elc::diagnostic::{ansi::AnsiRenderer, json, registry, Diagnostic};

#[derive(Parser, Debug)]
#[command(name = "elc", version)]
#[command(about = "Compile and run S-expression programs on a stack VM")]
struct Args {
    /// Source file (.el) or bytecode listing (.elb)
    #[arg(required_unless_present = "explain")]
    file: Option<PathBuf>,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Run)]
    emit: Emit,

    /// Trace every executed instruction to stderr
    #[arg(long)]
    debug: bool,

    /// Report errors as one-line JSON on stderr
    #[arg(long = "json-errors")]
    json_errors: bool,

    /// Explain an error code, e.g. ELC-C006
    #[arg(long, value_name = "CODE", conflicts_with = "file")]
    explain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Execute and print each output line
    Run,
    /// Syntax tree as JSON
    Ast,
    /// Text bytecode listing
    Bytecode,
    /// Compiled program as JSON
    Json,
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "elc=debug" } else { "elc=warn" }));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Some(code) = &args.explain {
        match registry::lookup(code) {
            Some(entry) => {
                print!("{}", entry.long);
                return;
            }
            None => {
                eprintln!("unknown error code '{code}'");
                process::exit(1);
            }
        }
    }

    let Some(path) = args.file.as_deref() else {
        eprintln!("no input file");
        process::exit(1);
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let d = Diagnostic::error(format!("cannot read {}: {e}", path.display()));
            fail(&d, args.json_errors);
        }
    };

    if let Err(err) = execute(&args, path, &source) {
        fail(&Diagnostic::from(&err).with_source(source), args.json_errors);
    }
}

fn execute(args: &Args, path: &Path, source: &str) -> Result<(), elc::Error> {
    let is_listing = path.extension().is_some_and(|ext| ext == "elb");
    debug!(path = %path.display(), listing = is_listing, emit = ?args.emit, "loading");

    if args.emit == Emit::Ast {
        if is_listing {
            fail(&Diagnostic::error("--emit ast needs a source file, not a bytecode listing"), args.json_errors);
        }
        let nodes = elc::parser::parse_source(source)?;
        print_json(&nodes, args.json_errors);
        return Ok(());
    }

    let program = if is_listing {
        elc::assemble(source)?
    } else {
        elc::compile_source(source)?
    };

    match args.emit {
        Emit::Bytecode => print!("{program}"),
        Emit::Json => print_json(&program, args.json_errors),
        Emit::Run | Emit::Ast => match elc::run(&program, args.debug) {
            Ok(output) => {
                for line in output {
                    println!("{line}");
                }
            }
            Err(trap) => {
                // What ran before the fault is still the program's output
                for line in &trap.output {
                    println!("{line}");
                }
                return Err(trap.into());
            }
        },
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, json_errors: bool) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(&Diagnostic::error(format!("serialization error: {e}")), json_errors),
    }
}

fn fail(d: &Diagnostic, json_errors: bool) -> ! {
    if json_errors {
        eprintln!("{}", json::render(d));
    } else {
        let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
        eprint!("{}", renderer.render(d));
    }
    process::exit(1);
}

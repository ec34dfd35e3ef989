//! `enact`: the front-end CLI (§6). Compiles a source file, or drops into
//! an interactive prompt when given none, and prints diagnostics in the
//! caret-underline format of §4.7.
//!
//! Downstream phases this crate does not implement — bytecode emission,
//! the stack VM, and the tracing GC (§1) — are represented here only as
//! the debug flags §6 says the CLI accepts; setting them does not turn on
//! anything, since there is no chunk to disassemble or execution to trace.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use enactc::{ast_printer, compile, render_diagnostics, render_diagnostics_json, Outcome};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "enact",
    about = "Enact language front-end: lexer, parser, and semantic analyzer",
    version,
    long_about = "Compiles an Enact source file through the front-end pipeline \
                  (lexer, parser, and two-pass semantic analyzer) and reports \
                  diagnostics. Run `enact` with no arguments for an interactive \
                  prompt."
)]
struct Cli {
    /// Source file to compile. Omit for an interactive prompt.
    #[arg()]
    path: Option<PathBuf>,

    /// Print the parsed AST of each compiled unit.
    #[arg(long)]
    debug_print_ast: bool,

    /// Disassemble the emitted bytecode chunk (no-op: bytecode emission is
    /// out of scope for this front-end).
    #[arg(long)]
    debug_disassemble_chunk: bool,

    /// Trace VM execution (no-op: the VM is out of scope for this front-end).
    #[arg(long)]
    debug_trace_execution: bool,

    /// Stress the garbage collector (no-op: the GC is out of scope for this
    /// front-end).
    #[arg(long)]
    debug_stress_gc: bool,

    /// Log garbage collector activity (no-op: the GC is out of scope for
    /// this front-end).
    #[arg(long)]
    debug_log_gc: bool,

    /// Shorthand for enabling every `--debug-*` flag above.
    #[arg(long)]
    debug: bool,

    /// Emit diagnostics as JSON instead of the caret-underline text format.
    #[arg(long)]
    json: bool,
}

/// Exit codes (§6).
mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGS: i32 = 65;
    pub const FILE_READ_ERROR: i32 = 70;
    pub const COMPILE_ERROR: i32 = 75;
    pub const STATIC_ANALYSIS_ERROR: i32 = 76;
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            process::exit(exit_code::INVALID_ARGS);
        }
    };

    let options = RunOptions {
        debug_print_ast: cli.debug || cli.debug_print_ast,
        json: cli.json,
    };

    match cli.path {
        None => run_prompt(&options),
        Some(path) => run_file(&path, &options),
    }
}

/// Output-affecting flags threaded through `run_file`/`run_prompt`/
/// `run_source`, grouped instead of passed as separate bools one-per-flag.
struct RunOptions {
    debug_print_ast: bool,
    json: bool,
}

/// Reads the source file, returning `anyhow::Result` with `.with_context`
/// rather than a bare `io::Error`.
fn read_source(path: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read '{}'", path.display()))
}

/// One argument → read the whole file and compile it once (§6).
fn run_file(path: &PathBuf, options: &RunOptions) {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            process::exit(exit_code::FILE_READ_ERROR);
        }
    };

    let outcome = run_source(&source, options);
    process::exit(match outcome {
        Outcome::Ok => exit_code::SUCCESS,
        Outcome::ParseError | Outcome::CompileError => exit_code::COMPILE_ERROR,
        Outcome::AnalysisError | Outcome::RuntimeError => exit_code::STATIC_ANALYSIS_ERROR,
    });
}

/// No argument → interactive prompt: read one line at a time, treat each
/// as a complete compilation unit, print diagnostics, loop (§6).
fn run_prompt(options: &RunOptions) {
    let stdin = io::stdin();
    loop {
        print!("enact > ");
        if io::stdout().flush().is_err() {
            return;
        }

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                println!();
                return;
            }
            Ok(_) => {
                run_source(&line, options);
            }
            Err(_) => return,
        }
    }
}

/// Runs one compilation unit through the pipeline, printing any
/// diagnostics. Upon any error, compilation continues through its current
/// phase but does not enter the next (§7 "User-visible behavior").
fn run_source(source: &str, options: &RunOptions) -> Outcome {
    let (ctx, module, outcome) = compile(source);

    if options.debug_print_ast && outcome == Outcome::Ok {
        print!("{}", ast_printer::print_module(&module));
    }

    if outcome != Outcome::Ok {
        if options.json {
            eprintln!("{}", render_diagnostics_json(&ctx));
        } else {
            eprintln!("{}", render_diagnostics(&ctx));
        }
    }

    outcome
}

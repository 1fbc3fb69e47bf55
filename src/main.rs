// File: src/main.rs
//
// Main entry point for the loxwalk interpreter.
// Handles command-line argument parsing and dispatches to the appropriate
// subcommand (run, repl, or ast).

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use loxwalk::errors::Reporter;
use loxwalk::interpreter::Interpreter;
use loxwalk::repl::Repl;
use loxwalk::{printer, run_source, RunError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

// sysexits codes
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;
const EXIT_IO_ERROR: i32 = 74;

#[derive(ClapParser)]
#[command(
    name = "loxwalk",
    about = "loxwalk: a tree-walking interpreter for a Lox dialect",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Disable colored diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run {
        /// Path to the script
        file: PathBuf,
    },

    /// Launch the interactive REPL (default)
    Repl,

    /// Print every statement of a script in prefix form (expression statements only with --rpn)
    Ast {
        /// Path to the script
        file: PathBuf,

        /// Print in reverse Polish notation instead of prefix form
        #[arg(long)]
        rpn: bool,
    },
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let code = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Run { file } => run_file(&file),
        Commands::Repl => run_repl(),
        Commands::Ast { file, rpn } => print_ast(&file, rpn),
    };
    process::exit(code);
}

fn read_script(file: &Path) -> Result<String, i32> {
    fs::read_to_string(file).map_err(|err| {
        eprintln!("{} could not read {}: {}", "Error:".bright_red().bold(), file.display(), err);
        EXIT_IO_ERROR
    })
}

fn run_file(file: &Path) -> i32 {
    let source = match read_script(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut interpreter = Interpreter::new();
    let mut reporter = Reporter::new();
    let result = run_source(&source, &mut interpreter, &mut reporter);
    reporter.emit();

    match result {
        Ok(()) => 0,
        Err(RunError::Compile(_)) => EXIT_COMPILE_ERROR,
        Err(RunError::Runtime(err)) => {
            eprintln!("{}", err.render());
            EXIT_RUNTIME_ERROR
        }
    }
}

fn run_repl() -> i32 {
    let result = Repl::new().and_then(|mut repl| repl.run());
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {}", "Error:".bright_red().bold(), err);
            EXIT_IO_ERROR
        }
    }
}

fn print_ast(file: &Path, rpn: bool) -> i32 {
    let source = match read_script(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut reporter = Reporter::new();
    let stmts = loxwalk::parse_source(&source, &mut reporter);
    if reporter.had_error() {
        reporter.emit();
        return EXIT_COMPILE_ERROR;
    }

    for stmt in &stmts {
        match stmt {
            loxwalk::ast::Stmt::Expression(expr) if rpn => println!("{}", printer::to_postfix(expr)),
            _ if rpn => {}
            _ => println!("{}", printer::to_prefix_stmt(stmt)),
        }
    }
    0
}

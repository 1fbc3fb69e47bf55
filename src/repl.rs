// File: src/repl.rs
//
// Interactive REPL (Read-Eval-Print Loop) for the loxwalk language.
// Provides an interactive shell with:
// - Multi-line input: lines accumulate while parentheses or braces are open
// - Command history and line editing (rustyline)
// - Special commands (:help, :clear, :quit, :vars, :reset)
// - Persistent globals across inputs
// - Bare expressions (no trailing semicolon) are evaluated and echoed
//
// Errors of any kind are printed and the session continues.

use crate::errors::Reporter;
use crate::interpreter::{Interpreter, Value};
use crate::lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::{execute_program, RunError};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// REPL session that maintains interpreter state and handles user interaction
pub struct Repl {
    interpreter: Interpreter,
    editor: DefaultEditor,
}

impl Repl {
    /// Creates a new REPL session with a fresh interpreter
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        Ok(Repl { interpreter: Interpreter::new(), editor })
    }

    /// Displays the welcome banner with version and help information
    fn show_banner(&self) {
        println!(
            "{} {}",
            "loxwalk".bright_cyan().bold(),
            format!("v{} - interactive shell", env!("CARGO_PKG_VERSION")).bright_cyan()
        );
        println!(
            "  Use {} for commands or {} to exit",
            ":help".bright_yellow(),
            ":quit".bright_yellow()
        );
        println!("  {} Leave a brace or parenthesis open to continue on the next line", "Tip:".bright_magenta());
        println!();
    }

    /// Starts the REPL loop
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.show_banner();

        let mut buffer = String::new();

        loop {
            let prompt = if buffer.is_empty() {
                "lox> ".bright_green().to_string()
            } else {
                "...> ".bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());

                    // Commands are only recognised at the start of an input
                    if buffer.is_empty() && line.trim().starts_with(':') {
                        if self.handle_command(line.trim()) {
                            continue;
                        } else {
                            break;
                        }
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    if is_input_complete(&buffer) {
                        self.eval_input(&buffer);
                        buffer.clear();
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C (input discarded, :quit to exit)".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "Goodbye!".bright_cyan());
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    /// Handles special REPL commands starting with ':'
    /// Returns true to continue REPL, false to quit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":help" | ":h" => {
                self.show_help();
                true
            }
            ":quit" | ":q" | ":exit" => {
                println!("{}", "Goodbye!".bright_cyan());
                false
            }
            ":clear" | ":c" => {
                print!("\x1B[2J\x1B[1;1H");
                self.show_banner();
                true
            }
            ":vars" | ":v" => {
                self.show_variables();
                true
            }
            ":reset" | ":r" => {
                self.interpreter = Interpreter::new();
                println!("{}", "Environment reset".bright_green());
                true
            }
            _ => {
                println!(
                    "{} Unknown command: {}. Type {} for available commands.",
                    "Error:".bright_red(),
                    cmd.bright_yellow(),
                    ":help".bright_yellow()
                );
                true
            }
        }
    }

    fn show_help(&self) {
        println!();
        println!("{}", "REPL Commands:".bright_cyan().bold());
        println!("  {}{}  Display this help message", ":help".bright_yellow(), " or :h ".dimmed());
        println!("  {}{}  Exit the REPL", ":quit".bright_yellow(), " or :q ".dimmed());
        println!("  {}{}  Clear the screen", ":clear".bright_yellow(), " or :c".dimmed());
        println!("  {}{}  Show global variables", ":vars".bright_yellow(), " or :v ".dimmed());
        println!("  {}{}  Forget every definition", ":reset".bright_yellow(), " or :r".dimmed());
        println!();
        println!("{}", "Examples:".bright_cyan().bold());
        println!("  {}", "lox> var add = (a, b) => a + b;".dimmed());
        println!("  {}", "lox> add(1, 2)".dimmed());
        println!("  {}", "=> 3".dimmed());
        println!();
    }

    /// Lists every global binding, natives included.
    fn show_variables(&self) {
        println!();
        println!("{}", "Global Variables:".bright_cyan().bold());
        for (name, slot) in self.interpreter.global_bindings() {
            let value = if slot.assigned {
                slot.value.to_string().bright_white()
            } else {
                "<unassigned>".dimmed()
            };
            println!("  {} = {}", name.bright_yellow(), value);
        }
        println!();
    }

    fn eval_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        let mut reporter = Reporter::new();
        let result = evaluate_input(&mut self.interpreter, input, &mut reporter);
        reporter.emit();

        match result {
            Ok(Some(value)) => println!("{} {}", "=>".bright_blue(), value.to_string().bright_white()),
            Ok(None) | Err(RunError::Compile(_)) => {}
            Err(RunError::Runtime(err)) => eprintln!("{}", err.render()),
        }
    }
}

/// Run one REPL input. A complete program is executed for its effects;
/// if it does not parse but the whole input is a single expression, that
/// expression is evaluated and its value returned. When neither parses, the
/// program-parse diagnostics are the ones reported.
pub fn evaluate_input(
    interpreter: &mut Interpreter,
    source: &str,
    reporter: &mut Reporter,
) -> Result<Option<Value>, RunError> {
    let tokens = lexer::tokenize(source, reporter);
    if reporter.had_error() {
        return Err(RunError::Compile(reporter.errors().count()));
    }

    let mut scratch = Reporter::new();
    let mut parser = Parser::new(tokens, &mut scratch);
    let stmts = parser.parse_program();
    let program_diagnostics = parser.diagnostic_count();

    let expr = if program_diagnostics > 0 {
        parser.reset();
        let expr = parser.parse_single_expression();
        if parser.diagnostic_count() > program_diagnostics {
            None
        } else {
            expr
        }
    } else {
        None
    };

    match expr {
        Some(expr) => {
            tracing::debug!("input evaluated as a bare expression");
            let mut resolver = Resolver::new(reporter).with_globals(interpreter.global_names());
            resolver.resolve_expression(&expr);
            let bindings = resolver.into_bindings();
            if reporter.had_error() {
                return Err(RunError::Compile(reporter.errors().count()));
            }
            interpreter.resolve(bindings);
            Ok(Some(interpreter.evaluate_expression(&expr)?))
        }
        None if program_diagnostics > 0 => {
            scratch.truncate(program_diagnostics);
            let count = scratch.errors().count();
            reporter.absorb(scratch);
            Err(RunError::Compile(count))
        }
        None => {
            execute_program(&stmts, interpreter, reporter)?;
            Ok(None)
        }
    }
}

/// True once every `(` and `{` outside strings and comments is closed
/// (extra closers also count as complete, so the parser can report them).
pub fn is_input_complete(input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let mut depth: i64 = 0;
    let mut comment_depth = 0usize;
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if comment_depth > 0 {
            match (c, next) {
                ('/', Some('*')) => {
                    comment_depth += 1;
                    i += 1;
                }
                ('*', Some('/')) => {
                    comment_depth -= 1;
                    i += 1;
                }
                _ => {}
            }
        } else if in_string {
            if c == '"' {
                in_string = false;
            }
        } else {
            match (c, next) {
                ('/', Some('/')) => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                ('/', Some('*')) => {
                    comment_depth = 1;
                    i += 1;
                }
                ('"', _) => in_string = true,
                ('(', _) | ('{', _) => depth += 1,
                (')', _) | ('}', _) => depth -= 1,
                _ => {}
            }
        }
        i += 1;
    }

    !in_string && comment_depth == 0 && depth <= 0
}

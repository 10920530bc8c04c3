use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ArgParser;

use minipy::ast::Pos;
use minipy::evaluator::Interpreter;
use minipy::lexer::tokenize;
use minipy::parser::Parser;

// Distinct exit status per failure category.
const EXIT_LEX: u8 = 65;
const EXIT_PARSE: u8 = 66;
const EXIT_RUNTIME: u8 = 70;
const EXIT_FATAL: u8 = 71;
const EXIT_IO: u8 = 74;

/// Run a minipy script.
#[derive(ArgParser, Debug)]
#[command(name = "minipy", version, about)]
struct Args {
    /// Path to the script to evaluate
    script: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    run_file(&args.script)
}

fn run_file(path: &Path) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: failed to read '{}': {}", path.display(), err);
            return ExitCode::from(EXIT_IO);
        }
    };

    let tokens = match tokenize(&source) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{}", render_error(&source, err.pos, &err.to_string(), None));
            return ExitCode::from(EXIT_LEX);
        }
    };

    let program = match Parser::new(tokens).parse_program() {
        Ok(program) => program,
        Err(errors) => {
            let rendered = errors
                .iter()
                .map(|err| render_error(&source, err.pos, &err.to_string(), err.hint.as_deref()))
                .collect::<Vec<_>>()
                .join("\n\n");
            eprintln!("{rendered}");
            return ExitCode::from(EXIT_PARSE);
        }
    };

    let mut interpreter = Interpreter::new();
    match interpreter.eval_program(&program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&source, err.pos, &err.to_string(), None));
            if err.is_fatal() {
                ExitCode::from(EXIT_FATAL)
            } else {
                ExitCode::from(EXIT_RUNTIME)
            }
        }
    }
}

// Message, offending source line, and a caret under the column.
fn render_error(source: &str, pos: Pos, message: &str, hint: Option<&str>) -> String {
    let line_text = source
        .lines()
        .nth((pos.line as usize).saturating_sub(1))
        .unwrap_or_default();
    let caret_padding = " ".repeat((pos.column as usize).saturating_sub(1));

    let mut rendered = format!("{message}\n{line_text}\n{caret_padding}^");
    if let Some(hint) = hint {
        rendered.push_str(&format!("\nhint: {hint}"));
    }
    rendered
}

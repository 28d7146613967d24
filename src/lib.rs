pub mod util;
pub mod interpreter;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use clap::Parser as ClapParser;
use thiserror::Error;
use crate::interpreter::ast::Expr;
use crate::interpreter::builtins;
use crate::interpreter::error::{ParseError, RuntimeError};
use crate::interpreter::evaluator::{Evaluator, DEFAULT_MAX_DEPTH};
use crate::interpreter::lexer::{self, TokenPos};
use crate::interpreter::parser;
use crate::interpreter::value::Value;

pub const PROMPT: &str = "aurora> ";
pub const CONTINUATION_PROMPT: &str = "   ...> ";

#[derive(ClapParser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    #[clap(help = "Script to run, starts an interactive session if omitted")]
    pub input: Option<PathBuf>,

    #[clap(long, default_value_t = DEFAULT_MAX_DEPTH, help = "Maximum function call depth")]
    pub max_depth: usize,

    #[clap(short, long, help = "Print verbose log output")]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn get_pos(&self) -> Option<TokenPos> {
        match self {
            Error::Parse(error) => Some(error.get_pos()),
            Error::Runtime(error) => Some(error.pos),
            Error::Io(_) => None,
        }
    }
}

pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = lexer::tokenize(source)?;
    parser::parse(tokens)
}

pub fn evaluate(source: &str, evaluator: &mut Evaluator) -> Result<Value, Error> {
    let program = parse(source)?;
    Ok(evaluator.evaluate(&program)?)
}

/// Installs a `tracing` subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_directive = if verbose { "aurora_lang=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

pub fn run(config: &Config) -> Result<(), Error> {
    let mut evaluator = Evaluator::new(builtins::default_globals()).with_max_depth(config.max_depth);

    match &config.input {
        Some(path) => run_file(path, &mut evaluator),
        None => {
            let stdin = std::io::stdin();
            run_repl(stdin.lock(), &mut std::io::stdout(), &mut evaluator)
        },
    }
}

pub fn run_file(path: &Path, evaluator: &mut Evaluator) -> Result<(), Error> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error: Could not read {}: {}", path.display(), error);
            return Err(Error::Io(error));
        },
    };

    tracing::debug!(path = %path.display(), "running script");

    match evaluate(&source, evaluator) {
        Ok(_) => Ok(()),
        Err(error) => {
            eprint!("{}", report(&path.display().to_string(), &source, &error));
            Err(error)
        },
    }
}

/// Reads expressions line by line until `exit` or the end of the input. Lines are collected
/// until their parentheses balance, then evaluated in the same environment.
pub fn run_repl<R: BufRead, W: Write>(input: R, output: &mut W, evaluator: &mut Evaluator) -> Result<(), Error> {
    let mut buffer = String::new();
    let mut balance = 0;

    write!(output, "{}", PROMPT)?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;

        if buffer.is_empty() && line.trim() == "exit" {
            break;
        }

        if !buffer.is_empty() {
            buffer.push('\n');
        }

        buffer.push_str(&line);
        balance += paren_balance(&line);

        if balance > 0 {
            write!(output, "{}", CONTINUATION_PROMPT)?;
            output.flush()?;
            continue;
        }

        match evaluate(&buffer, evaluator) {
            Ok(Value::Null) => {},
            Ok(value) => writeln!(output, "{}", value)?,
            Err(error) => eprint!("{}", report("<stdin>", &buffer, &error)),
        }

        buffer.clear();
        balance = 0;

        write!(output, "{}", PROMPT)?;
        output.flush()?;
    }

    Ok(())
}

/// Net number of opening parentheses on a line, ignoring strings and comments.
fn paren_balance(line: &str) -> i64 {
    let mut balance = 0;
    let mut in_string = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_string => { chars.next(); },
            '\'' => in_string = !in_string,
            '#' if !in_string => break,
            '(' if !in_string => balance += 1,
            ')' if !in_string => balance -= 1,
            _ => {},
        }
    }

    balance
}

/// Renders an error as `[path:line:column] Error: message`, followed by the source line,
/// a caret under the error position and, for runtime errors, the traceback.
pub fn report(path: &str, source: &str, error: &Error) -> String {
    let mut report = String::new();

    let pos = match error.get_pos() {
        Some(pos) => pos,
        None => {
            report.push_str(&format!("Error: {}\n", error));
            return report;
        },
    };

    report.push_str(&format!("[{}:{}:{}] Error: {}\n", path, pos.line, pos.column, error));

    if let Some(line) = source.lines().nth(pos.line.saturating_sub(1)) {
        report.push_str(&format!("    {}\n", line));
        report.push_str(&format!("    {}^\n", " ".repeat(pos.column.saturating_sub(1))));
    }

    if let Error::Runtime(error) = error {
        if !error.trace.is_empty() {
            report.push_str("Traceback (most recent call last):\n");

            for frame in &error.trace {
                report.push_str(&format!("  [{}:{}:{}] in {}\n", path, frame.call_site.line, frame.call_site.column, frame.name));
            }
        }
    }

    report
}

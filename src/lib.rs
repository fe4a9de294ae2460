//! Rox — a tree‑walking interpreter for the Lox scripting language.
//!
//! Pipeline: [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`].
//! [`Lox`] wires the stages together for a host (CLI, REPL, tests) and
//! hands back every diagnostic of a run in one [`Diagnostics`] value.

pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use log::{debug, info};

pub use error::{Diagnostics, LoxError, RuntimeError};
pub use interpreter::Interpreter;
pub use value::Value;

use error::Result;
use parser::Parser;
use resolver::Resolver;

/// Reads a script from disk as UTF‑8 text.  Failures surface as
/// [`LoxError::Io`] or [`LoxError::Utf8`].
pub fn read_source(path: &Path) -> Result<String> {
    info!("Reading source file: {:?}", path);

    let mut reader = BufReader::new(File::open(path)?);
    let mut buf: Vec<u8> = Vec::new();
    let bytes = reader.read_to_end(&mut buf)?;

    debug!("Read {} bytes from {:?}", bytes, path);

    Ok(String::from_utf8(buf)?)
}

/// How strictly static errors gate execution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Any lexical, syntax or resolution error withholds the whole script.
    Script,
    /// A REPL line still runs the statements that parsed, unless resolution
    /// failed.
    Prompt,
}

/// The interpreter session.  Globals persist across runs.
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// A session whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Runs a whole script.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        self.run_with_mode(source, RunMode::Script)
    }

    /// Runs one line typed at an interactive prompt.
    pub fn run_line(&mut self, source: &str) -> Diagnostics {
        self.run_with_mode(source, RunMode::Prompt)
    }

    pub fn run_with_mode(&mut self, source: &str, mode: RunMode) -> Diagnostics {
        info!("Running {} byte(s) in {:?} mode", source.len(), mode);

        let mut diagnostics = Diagnostics::new();

        let tokens = scanner::scan_tokens(source, &mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);

        if mode == RunMode::Script && diagnostics.had_error() {
            debug!("Syntax errors reported, skipping resolution");
            return diagnostics;
        }

        let mut resolve_diagnostics = Diagnostics::new();
        let locals = Resolver::new().resolve(&statements, &mut resolve_diagnostics);
        let resolve_failed = resolve_diagnostics.had_error();

        for e in resolve_diagnostics.into_errors() {
            diagnostics.report(e);
        }

        if resolve_failed {
            debug!("Resolution errors reported, execution withheld");
            return diagnostics;
        }

        self.interpreter.resolve(locals);

        if let Err(e) = self.interpreter.interpret(&statements) {
            debug!("Runtime error: {}", e);
            diagnostics.report(LoxError::Runtime(e));
        }

        diagnostics
    }
}

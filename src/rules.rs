//! The sound-change rule language: lexer, parser, compiler and the standard
//! combinator library.
//!
//! A rule program is a sequence of `CHANGE` laws and `GROUP` blocks. Each
//! law carries an optional metadata preamble and a `BEGIN … END` block of
//! rewrite statements, which compile down to [`Rule`](crate::transducer::Rule)
//! values against a feature model and a combinator library:
//!
//! ```text
//! NAME "Intervocalic voicing"
//! DATE 450
//! CHANGE
//! BEGIN
//!     [-continuant -voice] -> [+voice] | [-consonantal] _ [-consonantal];
//!     /k/ => /g/ | in Syllable[0] => /x/;
//! END
//! ```

mod ast;
mod compiler;
mod lexer;
pub mod library;
mod parser;
mod soundlaw;

pub use library::{standard_library, Arg, Combinator, Library};
pub use soundlaw::{LawMeta, Program, ProgramItem, SoundLaw, SoundLawGroup};

use crate::features::FeatureModel;
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// A parse failure, located in the source program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Pretty rendering against the source text, with the offending line and
    /// a caret under the error column.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}: {}\n",
            "syntax error".red().bold(),
            self.message
        ));
        out.push_str(&format!("  --> line {}, column {}\n", self.line, self.column));
        if let Some(text) = source.lines().nth(self.line.saturating_sub(1)) {
            out.push_str(&format!("   | {}\n", text));
            let pad = " ".repeat(self.column.saturating_sub(1));
            out.push_str(&format!("   | {}{}\n", pad, "^".yellow().bold()));
        }
        out
    }
}

/// Semantic failures while turning a parsed program into rules.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("domain lists {domain} elements but codomain lists {codomain}")]
    LengthMismatch { domain: usize, codomain: usize },
    #[error("unknown feature '{0}' in rule program")]
    UnknownFeature(String),
    #[error("unknown symbol '{0}' in rule program")]
    UnknownSymbol(String),
    #[error("invalid rewrite: {0}")]
    InvalidRewrite(String),
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    #[error("invalid arguments to {function}: {detail}")]
    InvalidArguments { function: String, detail: String },
    #[error("program requires library '{expected}' but '{found}' is loaded")]
    LibraryMismatch { expected: String, found: String },
    #[error("program requires library version {expected} but {found} is loaded")]
    LibraryVersion { expected: String, found: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Compiles a rule program against a feature model and a library.
pub fn compile(
    source: &str,
    model: &Arc<FeatureModel>,
    library: &Library,
) -> Result<Program, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let items = parser::parse(tokens)?;
    compiler::compile_items(items, model, library)
}

/// Reads and compiles a rule program file.
pub fn compile_file<P: AsRef<Path>>(
    path: P,
    model: &Arc<FeatureModel>,
    library: &Library,
) -> Result<Program, CompileError> {
    let source = fs::read_to_string(path)?;
    compile(&source, model, library)
}

/// Checks a program for syntax errors without compiling it.
pub fn validate(source: &str) -> Result<(), SyntaxError> {
    let tokens = lexer::tokenize(source)?;
    parser::parse(tokens)?;
    Ok(())
}

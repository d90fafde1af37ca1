//! Centralised error hierarchy for the **rlox interpreter**.
//!
//! The scanner, parser and interpreter convert their failure modes into one
//! of the variants defined here.  Every variant carries the 1‑based source
//! line it refers to, so each error can be routed to a [`Reporter`] as a
//! `(line, message)` pair.
//!
//! The module **does not** decide what happens to a diagnostic; that is the
//! reporter's job.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Raised when `print`
    /// cannot write to its output channel.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Source line the error refers to.  I/O failures have no location and
    /// report line `0`.
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Runtime { line, .. } => *line,
            LoxError::Io(_) => 0,
        }
    }

    /// The bare message, without the `[line N]` prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
            LoxError::Io(e) => e.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Diagnostic sink.  The core hands every lexical, parse and runtime error
/// to a reporter as a `(line, message)` pair and never prints on its own.
pub trait Reporter {
    fn report(&mut self, line: usize, message: &str);

    /// Convenience wrapper forwarding a [`LoxError`].
    fn report_error(&mut self, error: &LoxError) {
        self.report(error.line(), &error.message());
    }
}

/// Reporter used by the command-line driver: one line per diagnostic on
/// standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, line: usize, message: &str) {
        eprintln!("[line {}] Error: {}", line, message);
    }
}

/// Collecting reporter, handy for tests and embedders.
impl Reporter for Vec<(usize, String)> {
    fn report(&mut self, line: usize, message: &str) {
        self.push((line, message.to_string()));
    }
}

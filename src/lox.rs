//! One interpreter session: lex → parse → interpret, with every diagnostic
//! routed to a [`Reporter`].
//!
//! The interpreter, and with it the global scope, lives as long as the
//! session, so consecutive runs (REPL lines) see each other's definitions.
//! The error flag is per run.

use std::io::{self, Write};

use log::{debug, info};

use crate::error::{Reporter, StderrReporter};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox<W: Write = io::Stdout, R: Reporter = StderrReporter> {
    interpreter: Interpreter<W>,
    reporter: R,
    had_error: bool,
}

impl Lox {
    /// Session printing to stdout and reporting to stderr.
    pub fn new() -> Self {
        Self::with_parts(io::stdout(), StderrReporter)
    }
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write, R: Reporter> Lox<W, R> {
    pub fn with_parts(out: W, reporter: R) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            reporter,
            had_error: false,
        }
    }

    /// Run one piece of source text.  Returns `true` when nothing was
    /// reported.
    pub fn run(&mut self, source: &str) -> bool {
        self.had_error = false;

        let tokens: Vec<Token> = self.scan(source);
        if self.had_error {
            debug!("Lexing failed, skipping parse");
            return false;
        }

        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        for error in parser.errors() {
            self.reporter.report_error(error);
            self.had_error = true;
        }
        if self.had_error {
            debug!("Parsing failed, skipping execution");
            return false;
        }

        if let Err(error) = self.interpreter.interpret(&program) {
            self.reporter.report_error(&error);
            self.had_error = true;
        }

        info!("Run finished, had_error={}", self.had_error);

        !self.had_error
    }

    /// Scan `source`, reporting every lexical error and keeping the tokens
    /// that did scan.
    fn scan(&mut self, source: &str) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),

                Err(error) => {
                    self.reporter.report_error(&error);
                    self.had_error = true;
                }
            }
        }

        tokens
    }

    /// Whether the most recent run reported anything.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }
}

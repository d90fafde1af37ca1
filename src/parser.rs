/*!
Recursive‑descent parser for rlox.

Grammar (EBNF, lowest precedence first)
---------------------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT "{" ( "class"? IDENT "(" parameters? ")" block )* "}" ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | ifStmt | whileStmt | forStmt
               | jumpStmt | returnStmt | block | ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
jumpStmt       → ( "break" | "continue" ) ";" ;
returnStmt     → "return" expression? ";" ;
block          → "{" declaration* "}" ;
expression     → assignment ( "," expression )? ;
assignment     → ( call "." )? IDENT "=" assignment | ternary ;
ternary        → logic_or ( "?" ternary ":" ternary )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → assignment ( "," assignment )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")"
               | "fun" "(" parameters? ")" ( block | "->" assignment ) ;
```

Errors
------

A malformed statement is abandoned with `Err`; the top‑level loop records
the error, discards tokens up to the next statement boundary
(`synchronize`) and carries on, so one run can report several errors.
Misplaced `break`/`continue`/`return` and the 255 parameter/argument cap
are recorded without abandoning the statement.
*/

use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, FunctionStmt, Stmt};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Upper bound on parameters per function and arguments per call.
const MAX_ARITY: usize = 255;

/// Top‑level parser over the scanner's token list.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<LoxError>,

    /// Enclosing loops inside the current function body.
    loop_depth: usize,
    /// Saved `loop_depth` of every enclosing function.
    loop_stack: Vec<usize>,
    function_depth: usize,
    class_depth: usize,
}

impl Parser {
    /// Construct a new parser.  A missing trailing `EOF` is supplied so the
    /// helpers never run off the end.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
            loop_depth: 0,
            loop_stack: Vec::new(),
            function_depth: 0,
            class_depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Statements that failed to parse are left
    /// out; inspect [`Parser::errors`] to find out why.
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            let start = self.current;

            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);

                    self.errors.push(e);

                    if self.current == start {
                        self.advance();
                    }

                    self.synchronize();
                }
            }
        }

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            self.errors.len()
        );

        statements
    }

    /// Every error recorded so far, in source order.
    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at {:?}", self.peek().token_type);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            Ok(Stmt::Function(self.function()?))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name.")?
            .clone();

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        self.class_depth += 1;
        let members = self.class_members();
        self.class_depth -= 1;
        let (methods, class_methods) = members?;

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            methods,
            class_methods,
        })
    }

    fn class_members(&mut self) -> Result<(Vec<FunctionStmt>, Vec<FunctionStmt>)> {
        let mut methods: Vec<FunctionStmt> = Vec::new();
        let mut class_methods: Vec<FunctionStmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let is_class_method = self.matches(TokenType::CLASS);
            let method: FunctionStmt = self.function()?;

            debug!(
                "Parsed {} method '{}'",
                if is_class_method { "class" } else { "instance" },
                method.name.lexeme
            );

            if is_class_method {
                insert_method(&mut class_methods, method);
            } else {
                insert_method(&mut methods, method);
            }
        }

        Ok((methods, class_methods))
    }

    /// `IDENT "(" parameters? ")" block`, the `fun` keyword already consumed.
    fn function(&mut self) -> Result<FunctionStmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected function name.")?
            .clone();

        let params: Vec<Token> = self.parameters()?;

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body.")?;

        let body: Stmt = self.function_body()?;

        Ok(FunctionStmt {
            name,
            decl: Rc::new(FunctionDecl { params, body }),
        })
    }

    fn parameters(&mut self) -> Result<Vec<Token>> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' before parameters.")?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() == MAX_ARITY {
                    let line = self.peek().line;
                    self.report(line, "Too many parameters in function declaration.");
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;

        Ok(params)
    }

    /// Parse a function body block (opening `{` already consumed).  Loops
    /// outside the function do not count inside it.
    fn function_body(&mut self) -> Result<Stmt> {
        self.function_depth += 1;
        self.loop_stack.push(self.loop_depth);
        self.loop_depth = 0;

        let body = self.block();

        self.loop_depth = self.loop_stack.pop().unwrap_or(0);
        self.function_depth -= 1;

        Ok(Stmt::Block(body?))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::BREAK) || self.matches(TokenType::CONTINUE) {
            self.jump_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else if self.matches(TokenType::SEMICOLON) {
            Ok(Stmt::Empty)
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Option<Box<Stmt>> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let body: Box<Stmt> = self.loop_body()?;

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;

        let body: Box<Stmt> = self.loop_body()?;

        Ok(Stmt::While { condition, body })
    }

    fn loop_body(&mut self) -> Result<Box<Stmt>> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Box::new(body?))
    }

    fn jump_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            self.report(
                keyword.line,
                format!("'{}' must be inside a loop.", keyword.lexeme),
            );
        }

        self.consume(
            TokenType::SEMICOLON,
            &format!("Expected ';' after '{}'.", keyword.lexeme),
        )?;

        Ok(Stmt::Jump {
            keyword,
            value: None,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.function_depth == 0 {
            self.report(keyword.line, "'return' must be inside a function.");
        }

        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;

        Ok(Stmt::Jump { keyword, value })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Unclosed curly brace.")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    /// Comma expression: the lowest precedence level.
    fn expression(&mut self) -> Result<Expr> {
        let expr: Expr = self.assignment()?;

        if self.matches(TokenType::COMMA) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.expression()?;

            return Ok(Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.ternary()?;

        if self.matches(TokenType::EQUAL) {
            let equals_line: usize = self.previous().line;
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Variable(name) if name.token_type == TokenType::IDENTIFIER => {
                    Ok(Expr::Assign {
                        name,
                        value: Box::new(value),
                    })
                }

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),

                _ => Err(LoxError::parse(equals_line, "Invalid assign lvalue.")),
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition: Expr = self.logical_or()?;

        if !self.matches(TokenType::QUESTION) {
            return Ok(condition);
        }

        let then_branch: Expr = self.ternary()?;
        self.consume(TokenType::COLON, "Expected ':' in ternary expression.")?;
        let else_branch: Expr = self.ternary()?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// One left‑associative binary precedence level.
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while operators.iter().any(|op| self.check(op.clone())) {
            let operator: Token = self.advance().clone();
            let right: Expr = operand(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::STAR, TokenType::SLASH, TokenType::PERCENT],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let paren: Token = self.previous().clone();
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() == MAX_ARITY {
                    let line = self.peek().line;
                    self.report(line, "Too many arguments in call.");
                }

                arguments.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s: String = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable(self.previous().clone()));
        }

        if self.matches(TokenType::THIS) {
            if self.class_depth == 0 {
                return Err(LoxError::parse(
                    self.previous().line,
                    "Cannot use 'this' outside of a class.",
                ));
            }

            return Ok(Expr::Variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Unclosed parenthesis.")?;

            return Ok(expr);
        }

        if self.matches(TokenType::FUN) {
            return self.lambda();
        }

        let token: &Token = self.peek();
        let message = if token.token_type == TokenType::EOF {
            "Unexpected end of input.".to_string()
        } else {
            format!("Unexpected token '{}'.", token.lexeme)
        };

        Err(LoxError::parse(token.line, message))
    }

    /// `fun (params) { ... }` or `fun (params) -> expr`, the `fun` already
    /// consumed.  An arrow body becomes a single `return` jump.
    fn lambda(&mut self) -> Result<Expr> {
        let params: Vec<Token> = self.parameters()?;

        let body: Stmt = if self.matches(TokenType::LEFT_BRACE) {
            self.function_body()?
        } else if self.matches(TokenType::ARROW) {
            let line: usize = self.previous().line;
            let value: Expr = self.assignment()?;

            Stmt::Jump {
                keyword: Token::new(TokenType::RETURN, "return", line),
                value: Some(value),
            }
        } else {
            return Err(LoxError::parse(
                self.previous().line,
                "Expected '{' or '->' after lambda parameters.",
            ));
        };

        Ok(Expr::Lambda(Rc::new(FunctionDecl { params, body })))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Record an error that does not abandon the current statement.
    fn report<S: Into<String>>(&mut self, line: usize, message: S) {
        self.errors.push(LoxError::parse(line, message));
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    /// Consume a token of the given type or fail.  The error is placed on
    /// the last token that *was* accepted, which is where the missing piece
    /// belongs.
    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        let line: usize = if self.current > 0 {
            self.previous().line
        } else {
            self.peek().line
        };

        Err(LoxError::parse(line, message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary: just
    /// past a `;`, or right before a keyword or `{` that starts a statement.
    /// Nesting counters are reset because parsing restarts at top level.
    fn synchronize(&mut self) {
        self.loop_depth = 0;
        self.loop_stack.clear();
        self.function_depth = 0;
        self.class_depth = 0;

        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::SEMICOLON => {
                    self.advance();
                    return;
                }

                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::CONTINUE
                | TokenType::LEFT_BRACE => return,

                _ => {}
            }

            self.advance();
        }
    }
}

/// Add a method, replacing an earlier one with the same name in place.
fn insert_method(methods: &mut Vec<FunctionStmt>, method: FunctionStmt) {
    match methods
        .iter_mut()
        .find(|m| m.name.lexeme == method.name.lexeme)
    {
        Some(slot) => *slot = method,
        None => methods.push(method),
    }
}

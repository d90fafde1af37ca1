use std::rc::Rc;

use crate::stmt::FunctionDecl;
use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so literals do not keep
/// the token alive.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as `f64` even though only digit runs lex.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// **Abstract‑Syntax‑Tree node** for every kind of *expression*.
/// Each node is owned by exactly one parent.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `name = value`
    Assign { name: Token, value: Box<Expr> },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix operator, including the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Prefix `!` or `-`.
    Unary { operator: Token, right: Box<Expr> },

    Call {
        callee: Box<Expr>,
        /// The opening `(` token, kept for error locations.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    Literal(LiteralValue),

    /// Anonymous `fun (params) { ... }` or `fun (params) -> expr`.
    Lambda(Rc<FunctionDecl>),

    /// Identifier lookup.  `this` is represented the same way.
    Variable(Token),
}

use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// Parameters and body shared by named functions, methods and lambdas.
/// Runtime function values hold an `Rc` to this, so a body outlives the
/// program that declared it (REPL lines, closures returned from calls).
#[derive(Debug)]
pub struct FunctionDecl {
    pub params: Vec<Token>,
    pub body: Stmt,
}

/// `fun name(params) { ... }`, also used for class methods.
#[derive(Debug, Clone)]
pub struct FunctionStmt {
    pub name: Token,
    pub decl: Rc<FunctionDecl>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Function(FunctionStmt),

    Class {
        name: Token,
        methods: Vec<FunctionStmt>,
        /// Methods declared with a leading `class` keyword.
        class_methods: Vec<FunctionStmt>,
    },

    Expression(Expr),

    Print(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    For {
        initializer: Option<Box<Stmt>>, // var or expression statement
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// `break`, `continue` or `return`, told apart by the keyword's type.
    Jump {
        keyword: Token,
        value: Option<Expr>,
    },

    Empty,
}

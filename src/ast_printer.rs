use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, FunctionStmt, Stmt};
use crate::token::Token;

/// Renders the AST in a parenthesised prefix form, one string per node,
/// e.g. `(+ 1.0 (* 2.0 3.0))` or `(var x 1.0)`.  Used by `rlox parse`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(? {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names and members ──────────────────────────────────────
            Expr::Variable(name) => name.lexeme.clone(),

            Expr::Assign { name, value } => format!("(= {} {})", name.lexeme, Self::print(value)),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Lambda(decl) => format!("(fun {})", Self::function_tail(decl)),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(statements) => {
                let mut s = String::from("(block");
                for stmt in statements {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, Self::print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Function(function) => Self::print_function(function),

            Stmt::Class {
                name,
                methods,
                class_methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::print_function(method));
                }
                for method in class_methods {
                    s.push_str(" (class ");
                    s.push_str(&Self::print_function(method));
                    s.push(')');
                }
                s.push(')');
                s
            }

            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_ref()
                    .map_or_else(|| "_".to_string(), |s| Self::print_stmt(s)),
                condition
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print),
                increment
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print),
                Self::print_stmt(body)
            ),

            Stmt::Jump { keyword, value } => match value {
                Some(expr) => format!("({} {})", keyword.lexeme, Self::print(expr)),
                None => format!("({})", keyword.lexeme),
            },

            Stmt::Empty => "(;)".into(),
        }
    }

    fn print_function(function: &FunctionStmt) -> String {
        format!(
            "(fun {} {})",
            function.name.lexeme,
            Self::function_tail(&function.decl)
        )
    }

    fn function_tail(decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p: &Token| p.lexeme.as_str()).collect();

        format!("({}) {}", params.join(" "), Self::print_stmt(&decl.body))
    }
}

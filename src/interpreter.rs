//! Tree‑walking evaluator.
//!
//! Statements run through [`Interpreter::execute`], which yields an optional
//! [`Jump`] so `break`, `continue` and `return` can unwind loops, blocks and
//! calls without being errors.  Runtime errors travel as `Err(LoxError)` and
//! abort everything up to the top‑level [`Interpreter::interpret`] loop.
//!
//! Every scope change goes through [`Interpreter::scoped`] and every call
//! pushes the caller's scope on `call_stack`; both are restored on the error
//! path too, so a failed run leaves the interpreter back at global scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::environment::{Env, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionStmt, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{Builtin, Class, Function, Object, Value};

/// Pending control transfer produced by a `Jump` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Break,
    Continue,
    Return,
}

impl Jump {
    fn from_keyword(keyword: &Token) -> Self {
        match keyword.token_type {
            TokenType::BREAK => Jump::Break,
            TokenType::CONTINUE => Jump::Continue,
            _ => Jump::Return,
        }
    }
}

/// Deepest nesting of user function calls; one more is reported as
/// "Stack overflow." instead of exhausting the host stack.
pub const MAX_CALL_DEPTH: usize = 255;

pub struct Interpreter<W: Write = io::Stdout> {
    /// Innermost active scope.
    environment: Env,
    /// Caller scopes of the calls currently executing.
    call_stack: Vec<Env>,
    /// Value carried by the most recent `return`.
    last_return: Value,
    /// Destination of `print`.
    out: W,
}

impl<W: Write> Interpreter<W> {
    /// Creates an interpreter writing `print` output to `out`, with the
    /// native functions `clock` and `random` defined globally.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let environment: Env = Rc::new(RefCell::new(Environment::new()));

        {
            let mut globals = environment.borrow_mut();

            globals.define(
                "clock",
                Value::Builtin(Rc::new(Builtin {
                    name: "clock",
                    func: |_args: &[Value]| {
                        Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0)
                    },
                })),
            );

            globals.define(
                "random",
                Value::Builtin(Rc::new(Builtin {
                    name: "random",
                    func: |_args: &[Value]| Value::Number(rand::random::<f64>()),
                })),
            );
        }

        Self {
            environment,
            call_stack: Vec::new(),
            last_return: Value::Nil,
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Interprets a list of statements (a "program"), stopping at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Run `body` inside a new child scope of the current one.  The previous
    /// scope is reinstated whatever `body` returns.
    fn scoped<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let previous: Env = Rc::clone(&self.environment);
        self.environment = Environment::child_of(&previous);

        let result = body(self);

        self.environment = previous;

        result
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Option<Jump>> {
        match stmt {
            Stmt::Block(statements) => self.scoped(|interp| {
                for stmt in statements {
                    if let Some(jump) = interp.execute(stmt)? {
                        return Ok(Some(jump));
                    }
                }

                Ok(None)
            }),

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(None)
            }

            Stmt::Function(function) => {
                debug!("Defining function '{}'", function.name.lexeme);

                let value = Value::Function(Rc::new(Function::new(
                    Rc::clone(&function.decl),
                    Rc::clone(&self.environment),
                    false,
                )));

                self.environment
                    .borrow_mut()
                    .define(&function.name.lexeme, value);

                Ok(None)
            }

            Stmt::Class {
                name,
                methods,
                class_methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let class = Class {
                    name: name.lexeme.clone(),
                    methods: self.method_table(methods),
                    class_methods: self.method_table(class_methods),
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));

                Ok(None)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(None)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;

                Ok(None)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(None)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Some(Jump::Break) => break,
                        Some(Jump::Return) => return Ok(Some(Jump::Return)),
                        Some(Jump::Continue) | None => {}
                    }
                }

                Ok(None)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => self.scoped(|interp| {
                if let Some(init) = initializer {
                    interp.execute(init)?;
                }

                loop {
                    if let Some(condition) = condition {
                        if !is_truthy(&interp.evaluate(condition)?) {
                            break;
                        }
                    }

                    match interp.execute(body)? {
                        Some(Jump::Break) => break,
                        Some(Jump::Return) => return Ok(Some(Jump::Return)),
                        Some(Jump::Continue) | None => {}
                    }

                    if let Some(increment) = increment {
                        interp.evaluate(increment)?;
                    }
                }

                Ok(None)
            }),

            Stmt::Jump { keyword, value } => {
                self.last_return = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("'{}' with value {}", keyword.lexeme, self.last_return);

                Ok(Some(Jump::from_keyword(keyword)))
            }

            Stmt::Empty => Ok(None),
        }
    }

    /// Methods close over the scope the class is declared in.
    fn method_table(&self, methods: &[FunctionStmt]) -> HashMap<String, Rc<Function>> {
        methods
            .iter()
            .map(|method| {
                let function = Function::new(
                    Rc::clone(&method.decl),
                    Rc::clone(&self.environment),
                    method.name.lexeme == "init",
                );

                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect()
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Variable(name) => self.look_up(name),

            Expr::Assign { name, value } => {
                if !self.environment.borrow().has(&name.lexeme) {
                    return Err(undefined_variable(name));
                }

                let value = self.evaluate(value)?;

                self.environment
                    .borrow_mut()
                    .assign(&name.lexeme, value.clone());

                Ok(value)
            }

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Object(instance) => {
                    let value = self.evaluate(value)?;

                    instance
                        .borrow_mut()
                        .fields
                        .insert(name.lexeme.clone(), value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(
                    name.line,
                    "Only access fields of objects.",
                )),
            },

            Expr::Get { object, name } => {
                let target = self.evaluate(object)?;

                self.get_member(target, name)
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => is_truthy(&left),
                    _ => !is_truthy(&left),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

                    _ => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(invalid_operands(operator)),
                    },
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call(callee, paren, values)
            }

            Expr::Lambda(decl) => Ok(Value::Function(Rc::new(Function::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
                false,
            )))),
        }
    }

    fn look_up(&self, name: &Token) -> Result<Value> {
        let found = self.environment.borrow().get(&name.lexeme);

        found.ok_or_else(|| undefined_variable(name))
    }

    /// `target.name`: class methods on classes; fields, then bound instance
    /// methods, then class methods on objects.
    fn get_member(&self, target: Value, name: &Token) -> Result<Value> {
        match target {
            Value::Class(class) => class
                .class_methods
                .get(&name.lexeme)
                .map(|method| Value::Function(Rc::clone(method)))
                .ok_or_else(|| {
                    LoxError::runtime(
                        name.line,
                        format!("Unknown class method '{}'.", name.lexeme),
                    )
                }),

            Value::Object(instance) => {
                let field = instance.borrow().fields.get(&name.lexeme).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }

                let class: Rc<Class> = Rc::clone(&instance.borrow().class);

                if let Some(method) = class.methods.get(&name.lexeme) {
                    let bound = method.bind(Value::Object(Rc::clone(&instance)));
                    return Ok(Value::Function(Rc::new(bound)));
                }

                if let Some(method) = class.class_methods.get(&name.lexeme) {
                    return Ok(Value::Function(Rc::clone(method)));
                }

                Err(LoxError::runtime(
                    name.line,
                    format!("Uninitialized field '{}'.", name.lexeme),
                ))
            }

            _ => Err(LoxError::runtime(
                name.line,
                "Only access fields of objects.",
            )),
        }
    }

    fn call(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        match callee {
            Value::Builtin(builtin) => {
                debug!("Calling builtin '{}'", builtin.name);

                Ok((builtin.func)(&arguments))
            }

            Value::Function(function) => {
                if arguments.len() != function.arity() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!(
                            "Incorrect argument count for function: expected {} but got {}.",
                            function.arity(),
                            arguments.len()
                        ),
                    ));
                }

                self.invoke(&function, paren, arguments)
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Value::Object(Rc::new(RefCell::new(Object::new(Rc::clone(
                    &class,
                )))));

                if let Some(init) = class.methods.get("init") {
                    if arguments.len() != init.arity() {
                        return Err(LoxError::runtime(
                            paren.line,
                            format!(
                                "Incorrect argument count for constructor: expected {} but got {}.",
                                init.arity(),
                                arguments.len()
                            ),
                        ));
                    }

                    let bound = init.bind(instance.clone());
                    self.invoke(&bound, paren, arguments)?;
                }

                Ok(instance)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Run a user function with already checked arguments.
    fn invoke(
        &mut self,
        function: &Function,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(paren.line, "Stack overflow."));
        }

        self.call_stack.push(Rc::clone(&self.environment));
        self.environment = Rc::clone(&function.closure);

        let result = self.scoped(|interp| {
            for (param, argument) in function.decl.params.iter().zip(arguments) {
                interp
                    .environment
                    .borrow_mut()
                    .define(&param.lexeme, argument);
            }

            interp.execute(&function.decl.body)
        });

        if let Some(caller) = self.call_stack.pop() {
            self.environment = caller;
        }

        let jump = result?;

        if function.is_initializer {
            let this = function.closure.borrow().get("this");
            return Ok(this.unwrap_or(Value::Nil));
        }

        Ok(match jump {
            Some(Jump::Return) => mem::replace(&mut self.last_return, Value::Nil),
            _ => Value::Nil,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Bool(false))
}

/// Every non-logical infix operator, operands already evaluated.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::COMMA => return Ok(right),
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(match operator.token_type {
            TokenType::PLUS => Value::Number(a + b),
            TokenType::MINUS => Value::Number(a - b),
            TokenType::STAR => Value::Number(a * b),
            TokenType::SLASH => Value::Number(a / b),
            TokenType::PERCENT => Value::Number(a % b),
            TokenType::GREATER => Value::Bool(a > b),
            TokenType::GREATER_EQUAL => Value::Bool(a >= b),
            TokenType::LESS => Value::Bool(a < b),
            TokenType::LESS_EQUAL => Value::Bool(a <= b),
            _ => return Err(invalid_operands(operator)),
        }),

        (Value::String(a), right) if operator.token_type == TokenType::PLUS => {
            Ok(Value::String(format!("{}{}", a, right)))
        }

        _ => Err(invalid_operands(operator)),
    }
}

fn invalid_operands(operator: &Token) -> LoxError {
    LoxError::runtime(
        operator.line,
        format!("Invalid types for operation '{}'.", operator.lexeme),
    )
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(
        name.line,
        format!("Undefined variable '{}'.", name.lexeme),
    )
}

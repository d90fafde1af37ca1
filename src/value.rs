use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::environment::{Env, Environment};
use crate::stmt::FunctionDecl;

/// Signature of a native function: evaluated arguments in, value out.
pub type NativeFn = fn(&[Value]) -> Value;

/// Runtime value produced and consumed by the interpreter.
///
/// Strings, numbers and booleans are plain data; builtins, functions,
/// classes and objects are shared handles compared by identity.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Builtin(Rc<Builtin>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Object(Rc<RefCell<Object>>),
}

pub struct Builtin {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// A user function or method together with the scope it closes over.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
    /// Set for methods named `init`: calling one yields the bound `this`.
    pub is_initializer: bool,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// A fresh copy whose closure is a new child frame defining `this`.
    /// The original method is left untouched.
    pub fn bind(&self, instance: Value) -> Function {
        let closure: Env = Environment::child_of(&self.closure);
        closure.borrow_mut().define("this", instance);

        Function {
            decl: Rc::clone(&self.decl),
            closure,
            is_initializer: self.is_initializer,
        }
    }
}

// The closure is skipped: printing it would recurse through every function
// stored in the scope chain.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
    pub class_methods: HashMap<String, Rc<Function>>,
}

pub struct Object {
    pub class: Rc<Class>,
    pub fields: HashMap<String, Value>,
}

impl Object {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }
}

// Fields may refer back to the object itself, so only their names are shown.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for Value {
    /// Language equality: `nil` only equals `nil`, primitives compare by
    /// value, everything else by identity.  Different kinds never match.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => fmt_number(*n, f),

            Value::String(s) => f.write_str(s),

            Value::Builtin(_) => f.write_str("<Lox Builtin>"),

            Value::Function(_) => f.write_str("<function>"),

            Value::Class(class) => write!(f, "<class {}>", class.name),

            Value::Object(object) => write!(f, "<instance {}>", object.borrow().class.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_drop_the_fraction() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(1.0 / 0.0).to_string(), "Infinity");
    }

    #[test]
    fn distinct_kinds_are_never_equal() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::String("1".into()), Value::Number(1.0));
    }

    #[test]
    fn classes_and_objects_render_with_their_name() {
        let class = Rc::new(Class {
            name: "Pt".into(),
            methods: HashMap::new(),
            class_methods: HashMap::new(),
        });
        let object = Value::Object(Rc::new(RefCell::new(Object::new(Rc::clone(&class)))));

        assert_eq!(Value::Class(class).to_string(), "<class Pt>");
        assert_eq!(object.to_string(), "<instance Pt>");
    }
}

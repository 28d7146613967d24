use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use crate::interpreter::ast::{Expr, FieldDecl, TypeTag};
use crate::interpreter::environment::Environment;
use crate::interpreter::error::NativeError;
use crate::util;

/// Nesting depth after which struct instances are no longer printed field by field.
const MAX_DISPLAY_DEPTH: usize = 8;

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    Null,

    StructType(Rc<StructType>),
    StructInstance(Rc<RefCell<StructInstance>>),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
}

/// Two numeric operands, promoted to a common representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericPair {
    Int(i64, i64),
    Float(f64, f64),
}

impl Value {
    pub fn str(value: &str) -> Value {
        Value::Str(Rc::from(value))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Int(_) => String::from("int"),
            Value::Float(_) => String::from("float"),
            Value::Str(_) => String::from("str"),
            Value::Bool(_) => String::from("bool"),
            Value::Null => String::from("null"),
            Value::StructType(_) => String::from("struct"),
            Value::StructInstance(instance) => instance.borrow().struct_type.name.clone(),
            Value::Function(_) | Value::Builtin(_) => String::from("fun"),
        }
    }

    /// `null`, `false` and numeric zero are falsy, every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            _ => true,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Pairs two numbers, promoting to float unless both are ints.
    pub fn numeric_pair(&self, other: &Value) -> Option<NumericPair> {
        match (self, other) {
            (Value::Int(left), Value::Int(right)) => Some(NumericPair::Int(*left, *right)),
            _ => Some(NumericPair::Float(self.as_float()?, other.as_float()?)),
        }
    }

    /// Checks this value against a declared field type, promoting an int given for a float field.
    pub fn conform_to(self, type_tag: &TypeTag) -> Result<Value, Value> {
        match (type_tag, self) {
            (TypeTag::Any, value) => Ok(value),
            (TypeTag::Int, value @ Value::Int(_)) => Ok(value),
            (TypeTag::Float, value @ Value::Float(_)) => Ok(value),
            (TypeTag::Float, Value::Int(value)) => Ok(Value::Float(value as f64)),
            (TypeTag::Str, value @ Value::Str(_)) => Ok(value),
            (TypeTag::Bool, value @ Value::Bool(_)) => Ok(value),
            (TypeTag::Null, Value::Null) => Ok(Value::Null),
            (TypeTag::Fun, value @ (Value::Function(_) | Value::Builtin(_))) => Ok(value),
            (TypeTag::Struct(name), Value::StructInstance(instance)) if instance.borrow().struct_type.name == *name =>
                Ok(Value::StructInstance(instance)),
            // struct references may be left empty
            (TypeTag::Struct(_), Value::Null) => Ok(Value::Null),
            (_, value) => Err(value),
        }
    }

    fn fmt_nested(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        match self {
            Value::Str(value) if depth > 0 => write!(f, "'{}'", value),
            Value::StructInstance(instance) => {
                let instance = instance.borrow();

                if depth >= MAX_DISPLAY_DEPTH {
                    return write!(f, "{}(...)", instance.struct_type.name);
                }

                write!(f, "{}(", instance.struct_type.name)?;

                for (index, (field, value)) in instance.struct_type.fields.iter().zip(&instance.values).enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }

                    write!(f, "{}: ", field.name)?;
                    value.fmt_nested(f, depth + 1)?;
                }

                f.write_str(")")
            },
            _ => write!(f, "{}", self),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => f.write_str(&util::format_float(*value)),
            Value::Str(value) => f.write_str(value),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Null => f.write_str("null"),

            Value::StructType(struct_type) => write!(f, "<struct {}>", struct_type.name),
            Value::StructInstance(_) => self.fmt_nested(f, 0),
            Value::Function(function) => match &function.name {
                Some(name) => write!(f, "<fun {}>", name),
                None => f.write_str("<fun>"),
            },
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(value) => write!(f, "'{}'", value),
            _ => write!(f, "{}", self),
        }
    }
}

/// Structural equality for plain data, identity for struct instances, types and functions.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Null, Value::Null) => true,
            (Value::StructType(left), Value::StructType(right)) => Rc::ptr_eq(left, right),
            (Value::StructInstance(left), Value::StructInstance(right)) => Rc::ptr_eq(left, right),
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::Builtin(left), Value::Builtin(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// An instance holds exactly one value per declared field, in declaration order.
#[derive(Debug)]
pub struct StructInstance {
    pub struct_type: Rc<StructType>,
    pub values: Vec<Value>,
}

impl StructInstance {
    pub fn get(&self, field: &str) -> Option<Value> {
        self.struct_type.field_index(field).map(|index| self.values[index].clone())
    }
}

pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Expr>,
    pub closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fun {}({})", self.display_name(), self.params.join(", "))
    }
}

pub type NativeFunction = dyn Fn(&[Value]) -> Result<Value, NativeError>;

/// A function supplied by the host, called through the same path as user functions.
pub struct Builtin {
    pub name: String,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub function: Box<NativeFunction>,
}

impl Builtin {
    pub fn new(name: &str, arity: Option<usize>, function: impl Fn(&[Value]) -> Result<Value, NativeError> + 'static) -> Value {
        Value::Builtin(Rc::new(Builtin {
            name: name.to_owned(),
            arity,
            function: Box::new(function),
        }))
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "builtin {}", self.name)
    }
}

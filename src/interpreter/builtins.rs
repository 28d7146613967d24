use std::cell::RefCell;
use std::rc::Rc;
use crate::interpreter::environment::Environment;
use crate::interpreter::error::NativeError;
use crate::interpreter::value::{Builtin, Value};

type NativeFn = fn(&[Value]) -> Result<Value, NativeError>;

const BUILTINS: [(&str, Option<usize>, NativeFn); 5] = [
    ("print", None, print),
    ("float", Some(1), to_float),
    ("int", Some(1), to_int),
    ("str", Some(1), to_str),
    ("type", Some(1), type_of),
];

/// Creates a root environment holding the default builtins.
pub fn default_globals() -> Rc<RefCell<Environment>> {
    let mut globals = Environment::new_global();

    for (name, arity, function) in BUILTINS {
        globals = Environment::define(&globals, name, Builtin::new(name, arity, function));
    }

    globals
}

fn print(args: &[Value]) -> Result<Value, NativeError> {
    println!("{}", args.iter().map(Value::to_string).collect::<Vec<String>>().join(" "));
    Ok(Value::Null)
}

fn to_float(args: &[Value]) -> Result<Value, NativeError> {
    match &args[0] {
        Value::Int(value) => Ok(Value::Float(*value as f64)),
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Bool(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
        Value::Str(text) => text.trim().parse::<f64>().map(Value::Float)
            .map_err(|_| NativeError::type_error(format!("Cannot convert '{}' to float", text))),
        value => Err(NativeError::type_error(format!("Cannot convert '{}' to float", value.type_name()))),
    }
}

fn to_int(args: &[Value]) -> Result<Value, NativeError> {
    match &args[0] {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Float(value) => truncate(*value),
        Value::Bool(value) => Ok(Value::Int(i64::from(*value))),
        Value::Str(text) => {
            let text = text.trim();

            match text.parse::<i64>() {
                Ok(value) => Ok(Value::Int(value)),
                Err(_) => text.parse::<f64>().map_err(|_| NativeError::type_error(format!("Cannot convert '{}' to int", text)))
                    .and_then(truncate),
            }
        },
        value => Err(NativeError::type_error(format!("Cannot convert '{}' to int", value.type_name()))),
    }
}

fn truncate(value: f64) -> Result<Value, NativeError> {
    let truncated = value.trunc();

    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Ok(Value::Int(truncated as i64))
    } else {
        Err(NativeError::type_error(format!("Cannot convert {} to int", value)))
    }
}

fn to_str(args: &[Value]) -> Result<Value, NativeError> {
    Ok(Value::str(&args[0].to_string()))
}

fn type_of(args: &[Value]) -> Result<Value, NativeError> {
    Ok(Value::str(&args[0].type_name()))
}

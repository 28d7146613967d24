use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use crate::interpreter::ast::{Argument, BinaryOperator, Branch, Expr, FieldDecl, Literal, UnaryOperator};
use crate::interpreter::environment::{Environment, RecursionToParent};
use crate::interpreter::error::{CallFrame, ErrorKind, RuntimeError};
use crate::interpreter::lexer::TokenPos;
use crate::interpreter::value::{Builtin, Function, NumericPair, StructInstance, StructType, Value};
use crate::util;

pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Longest string, in bytes, that string repetition may produce.
pub const MAX_STRING_LENGTH: usize = 1 << 30;

/// Non-local exits out of an expression.
enum Unwind {
    Return(Value),
    Error(Box<RuntimeError>),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(Box::new(error))
    }
}

type EvalResult<T = Value> = Result<T, Unwind>;

struct EvaluatedArgument {
    name: Option<String>,
    value: Value,
    pos: TokenPos,
}

pub struct Evaluator {
    environment: Rc<RefCell<Environment>>,
    call_stack: Vec<CallFrame>,
    max_depth: usize,
}

impl Evaluator {
    pub fn new(globals: Rc<RefCell<Environment>>) -> Evaluator {
        Evaluator {
            environment: globals,
            call_stack: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Evaluator {
        self.max_depth = max_depth;
        self
    }

    /// The innermost scope at top level. Persists between calls to [`Evaluator::evaluate`].
    pub fn environment(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.environment)
    }

    /// Evaluates a parsed program. A top-level `return` ends it with the returned value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let result = match self.evaluate_expr(expr) {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(*error),
        };

        self.call_stack.clear();
        tracing::trace!(ok = result.is_ok(), "evaluation finished");
        result
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult {
        util::ensure_sufficient_stack(|| self.evaluate_node(expr))
    }

    fn evaluate_node(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Int(value) => Value::Int(*value),
                Literal::Float(value) => Value::Float(*value),
                Literal::Str(value) => Value::str(value),
                Literal::Bool(value) => Value::Bool(*value),
                Literal::Null => Value::Null,
            }),
            Expr::Identifier { name, pos } => self.environment.borrow().lookup(name, RecursionToParent::Always)
                .ok_or_else(|| self.error(ErrorKind::NameError, format!("Undefined variable '{}'", name), *pos)),

            Expr::Assignment { name, value, .. } => {
                let value = match value.as_ref() {
                    Expr::FunDef { name: None, params, body, .. } => self.make_function(Some(name.clone()), params, body),
                    Expr::StructDef { name: None, fields, .. } => make_struct_type(name.clone(), fields),
                    value => self.evaluate_expr(value)?,
                };

                self.define(name, value.clone());
                Ok(value)
            },
            Expr::BinaryOp { op: BinaryOperator::And, left, right, .. } => {
                if !self.evaluate_expr(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }

                Ok(Value::Bool(self.evaluate_expr(right)?.is_truthy()))
            },
            Expr::BinaryOp { op: BinaryOperator::Or, left, right, .. } => {
                if self.evaluate_expr(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }

                Ok(Value::Bool(self.evaluate_expr(right)?.is_truthy()))
            },
            Expr::BinaryOp { op, left, right, pos } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;

                self.binary_op(*op, left, right, *pos)
            },
            Expr::UnaryOp { op, operand, pos } => {
                let operand = self.evaluate_expr(operand)?;

                match (op, operand) {
                    (UnaryOperator::Plus, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
                    (UnaryOperator::Minus, Value::Int(value)) =>
                        Ok(value.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(value as f64)))),
                    (UnaryOperator::Minus, Value::Float(value)) => Ok(Value::Float(-value)),
                    (op, value) => Err(self.error(ErrorKind::TypeError,
                        format!("Unsupported operand type for unary {}: '{}'", op, value.type_name()), *pos)),
                }
            },
            Expr::Not { operand, .. } => Ok(Value::Bool(!self.evaluate_expr(operand)?.is_truthy())),

            Expr::Call { callee, args, pos } => {
                let callee = self.evaluate_expr(callee)?;
                let args = self.evaluate_arguments(args)?;

                self.call(callee, args, *pos)
            },
            Expr::MemberAccess { target, field, pos } => {
                let target = self.evaluate_expr(target)?;
                let instance = self.expect_instance(target, field, *pos)?;
                let value = instance.borrow().get(field);

                value.ok_or_else(|| self.unknown_field(&instance.borrow().struct_type, field, *pos))
            },
            Expr::MemberSet { target, field, value, pos } => {
                let target = self.evaluate_expr(target)?;
                let instance = self.expect_instance(target, field, *pos)?;
                let value = self.evaluate_expr(value)?;

                let struct_type = Rc::clone(&instance.borrow().struct_type);
                let index = struct_type.field_index(field)
                    .ok_or_else(|| self.unknown_field(&struct_type, field, *pos))?;
                let value = self.conform_field(&struct_type, &struct_type.fields[index], value, *pos)?;

                instance.borrow_mut().values[index] = value.clone();
                Ok(value)
            },

            Expr::If { branches, .. } => self.evaluate_if(branches),
            Expr::For { var, from, to, step, body, pos } => {
                let from = self.evaluate_expr(from)?;
                let to = self.evaluate_expr(to)?;

                if !from.is_number() || !to.is_number() {
                    return Err(self.error(ErrorKind::TypeError, format!("For loop bounds must be numbers, got '{}' and '{}'",
                        from.type_name(), to.type_name()), *pos));
                }

                let saved = Rc::clone(&self.environment);
                self.environment = Environment::new_with_parent(Rc::clone(&saved));

                let result = self.evaluate_for(var, from, to, step.as_deref(), body, *pos);

                self.environment = saved;
                result
            },
            Expr::While { condition, body, .. } => {
                let mut last = Value::Null;

                while self.evaluate_expr(condition)?.is_truthy() {
                    last = self.evaluate_expr(body)?;
                }

                Ok(last)
            },

            Expr::FunDef { name, params, body, .. } => {
                let function = self.make_function(name.clone(), params, body);

                if let Some(name) = name {
                    self.define(name, function.clone());
                }

                Ok(function)
            },
            Expr::StructDef { name, fields, .. } => {
                let struct_type = make_struct_type(name.clone().unwrap_or_else(|| String::from("<anonymous>")), fields);

                if let Some(name) = name {
                    self.define(name, struct_type.clone());
                }

                Ok(struct_type)
            },
            Expr::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate_expr(value)?,
                    None => Value::Null,
                };

                Err(Unwind::Return(value))
            },

            Expr::Block { exprs, .. } => {
                let mut last = Value::Null;

                for expr in exprs {
                    last = self.evaluate_expr(expr)?;
                }

                Ok(last)
            },
        }
    }

    fn evaluate_arguments(&mut self, args: &[Argument]) -> EvalResult<Vec<EvaluatedArgument>> {
        let mut evaluated = Vec::with_capacity(args.len());

        for arg in args {
            evaluated.push(EvaluatedArgument {
                name: arg.name.clone(),
                value: self.evaluate_expr(&arg.value)?,
                pos: arg.value.pos(),
            });
        }

        Ok(evaluated)
    }

    fn evaluate_if(&mut self, branches: &[Branch]) -> EvalResult {
        for branch in branches {
            let taken = match &branch.condition {
                Some(condition) => self.evaluate_expr(condition)?.is_truthy(),
                None => true,
            };

            if taken {
                return self.evaluate_expr(&branch.body);
            }
        }

        Ok(Value::Null)
    }

    /// Runs a `for` loop inside its own scope, which the caller has already entered.
    ///
    /// The first bound check uses the direction from `from` to `to`. After that, `step` is
    /// evaluated once after each body run and its sign decides the direction.
    fn evaluate_for(&mut self, var: &str, from: Value, to: Value, step: Option<&Expr>, body: &Expr, pos: TokenPos) -> EvalResult {
        let ascending = compare_numbers(&to, &from) != Some(Ordering::Less);
        let mut direction = if ascending { Ordering::Less } else { Ordering::Greater };
        let mut current = from;
        let mut last = Value::Null;

        while compare_numbers(&current, &to) == Some(direction) {
            self.define(var, current.clone());
            last = self.evaluate_expr(body)?;

            let step = match step {
                Some(step) => self.evaluate_expr(step)?,
                None => Value::Int(if ascending { 1 } else { -1 }),
            };

            direction = match step.as_float() {
                Some(step) if step > 0.0 => Ordering::Less,
                Some(step) if step < 0.0 => Ordering::Greater,
                Some(_) => return Err(self.error(ErrorKind::TypeError, "For loop step cannot be zero", pos)),
                None => return Err(self.error(ErrorKind::TypeError,
                    format!("For loop step must be a number, got '{}'", step.type_name()), pos)),
            };

            // the body may have rebound the loop variable
            let value = self.environment.borrow().lookup(var, RecursionToParent::Never).unwrap_or(current);
            current = self.binary_op(BinaryOperator::Add, value, step, pos)?;

            if !current.is_number() {
                return Err(self.error(ErrorKind::TypeError, format!("For loop variable '{}' must stay a number", var), pos));
            }
        }

        Ok(last)
    }

    // Calls

    fn call(&mut self, callee: Value, args: Vec<EvaluatedArgument>, pos: TokenPos) -> EvalResult {
        match callee {
            Value::Function(function) => self.call_function(function, args, pos),
            Value::Builtin(builtin) => self.call_builtin(&builtin, args, pos),
            Value::StructType(struct_type) => self.construct_struct(struct_type, args, pos),
            value => Err(self.error(ErrorKind::TypeError, format!("'{}' is not callable", value.type_name()), pos)),
        }
    }

    fn call_function(&mut self, function: Rc<Function>, args: Vec<EvaluatedArgument>, pos: TokenPos) -> EvalResult {
        self.reject_named_arguments(&args, function.display_name())?;

        if args.len() != function.params.len() {
            return Err(self.error(ErrorKind::ArityError, format!("Function '{}' expects {} argument(s), got {}",
                function.display_name(), function.params.len(), args.len()), pos));
        }

        if self.call_stack.len() >= self.max_depth {
            return Err(self.error(ErrorKind::RecursionLimit,
                format!("Maximum recursion depth of {} exceeded", self.max_depth), pos));
        }

        let mut frame = Environment::new_with_parent(Rc::clone(&function.closure));

        if let Some(name) = &function.name {
            frame = Environment::define(&frame, name, Value::Function(Rc::clone(&function)));
        }

        for (param, arg) in function.params.iter().zip(args) {
            frame = Environment::define(&frame, param, arg.value);
        }

        tracing::trace!(function = function.display_name(), depth = self.call_stack.len() + 1, "calling function");
        self.call_stack.push(CallFrame { name: function.display_name().to_owned(), call_site: pos });

        let saved = std::mem::replace(&mut self.environment, frame);
        let result = self.evaluate_expr(&function.body);

        self.environment = saved;
        self.call_stack.pop();

        match result {
            Err(Unwind::Return(value)) => Ok(value),
            result => result,
        }
    }

    fn call_builtin(&mut self, builtin: &Builtin, args: Vec<EvaluatedArgument>, pos: TokenPos) -> EvalResult {
        self.reject_named_arguments(&args, &builtin.name)?;

        if let Some(arity) = builtin.arity {
            if args.len() != arity {
                return Err(self.error(ErrorKind::ArityError, format!("Builtin '{}' expects {} argument(s), got {}",
                    builtin.name, arity, args.len()), pos));
            }
        }

        let values: Vec<Value> = args.into_iter().map(|arg| arg.value).collect();

        (builtin.function)(&values).map_err(|error| self.error(error.kind, error.message, pos))
    }

    fn construct_struct(&mut self, struct_type: Rc<StructType>, args: Vec<EvaluatedArgument>, pos: TokenPos) -> EvalResult {
        let named = args.iter().filter(|arg| arg.name.is_some()).count();

        let supplied: Vec<(Value, TokenPos)> = if named == 0 {
            if args.len() != struct_type.fields.len() {
                return Err(self.error(ErrorKind::ArityError, format!("Struct '{}' expects {} field(s), got {}",
                    struct_type.name, struct_type.fields.len(), args.len()), pos));
            }

            args.into_iter().map(|arg| (arg.value, arg.pos)).collect()
        } else if named == args.len() {
            let mut slots: Vec<Option<(Value, TokenPos)>> = vec![None; struct_type.fields.len()];

            for arg in args {
                let name = arg.name.unwrap_or_default();

                match struct_type.field_index(&name) {
                    Some(index) if slots[index].is_some() => return Err(self.error(ErrorKind::NameError,
                        format!("Field '{}' of struct '{}' given more than once", name, struct_type.name), arg.pos)),
                    Some(index) => slots[index] = Some((arg.value, arg.pos)),
                    None => return Err(self.unknown_field(&struct_type, &name, arg.pos)),
                }
            }

            let mut supplied = Vec::with_capacity(slots.len());

            for (field, slot) in struct_type.fields.iter().zip(slots) {
                match slot {
                    Some(slot) => supplied.push(slot),
                    None => return Err(self.error(ErrorKind::NameError,
                        format!("Missing field '{}' for struct '{}'", field.name, struct_type.name), pos)),
                }
            }

            supplied
        } else {
            return Err(self.error(ErrorKind::TypeError,
                format!("Struct '{}' takes either all named or all positional arguments", struct_type.name), pos));
        };

        let mut values = Vec::with_capacity(supplied.len());

        for (field, (value, arg_pos)) in struct_type.fields.iter().zip(supplied) {
            values.push(self.conform_field(&struct_type, field, value, arg_pos)?);
        }

        tracing::debug!(name = %struct_type.name, fields = values.len(), "constructed struct instance");
        Ok(Value::StructInstance(Rc::new(RefCell::new(StructInstance { struct_type, values }))))
    }

    fn reject_named_arguments(&self, args: &[EvaluatedArgument], callee: &str) -> EvalResult<()> {
        match args.iter().find(|arg| arg.name.is_some()) {
            Some(arg) => Err(self.error(ErrorKind::TypeError,
                format!("'{}' does not accept named arguments", callee), arg.pos)),
            None => Ok(()),
        }
    }

    // Values

    fn make_function(&mut self, name: Option<String>, params: &[String], body: &Rc<Expr>) -> Value {
        Environment::capture(&self.environment);

        Value::Function(Rc::new(Function {
            name,
            params: params.to_vec(),
            body: Rc::clone(body),
            closure: Rc::clone(&self.environment),
        }))
    }

    fn expect_instance(&self, target: Value, field: &str, pos: TokenPos) -> EvalResult<Rc<RefCell<StructInstance>>> {
        match target {
            Value::StructInstance(instance) => Ok(instance),
            value => Err(self.error(ErrorKind::TypeError,
                format!("Cannot access field '{}' of '{}'", field, value.type_name()), pos)),
        }
    }

    fn conform_field(&self, struct_type: &StructType, field: &FieldDecl, value: Value, pos: TokenPos) -> EvalResult {
        value.conform_to(&field.type_tag).map_err(|value| self.error(ErrorKind::TypeError,
            format!("Field '{}' of struct '{}' expects {}, got '{}'", field.name, struct_type.name, field.type_tag, value.type_name()), pos))
    }

    fn binary_op(&self, op: BinaryOperator, left: Value, right: Value, pos: TokenPos) -> EvalResult {
        let result = match op {
            BinaryOperator::Add => match (&left, &right) {
                (Value::Str(left), Value::Str(right)) => Some(Value::str(&format!("{}{}", left, right))),
                _ => left.numeric_pair(&right).map(|pair| match pair {
                    NumericPair::Int(left, right) => left.checked_add(right).map(Value::Int)
                        .unwrap_or(Value::Float(left as f64 + right as f64)),
                    NumericPair::Float(left, right) => Value::Float(left + right),
                }),
            },
            BinaryOperator::Subtract => left.numeric_pair(&right).map(|pair| match pair {
                NumericPair::Int(left, right) => left.checked_sub(right).map(Value::Int)
                    .unwrap_or(Value::Float(left as f64 - right as f64)),
                NumericPair::Float(left, right) => Value::Float(left - right),
            }),
            BinaryOperator::Multiply => match (&left, &right) {
                (Value::Str(text), Value::Int(count)) | (Value::Int(count), Value::Str(text)) => {
                    if *count < 0 {
                        return Err(self.error(ErrorKind::TypeError, "Cannot repeat a string a negative number of times", pos));
                    }

                    let count = usize::try_from(*count).ok()
                        .filter(|count| matches!(text.len().checked_mul(*count), Some(length) if length <= MAX_STRING_LENGTH))
                        .ok_or_else(|| self.error(ErrorKind::TypeError,
                            format!("Repeated string would be longer than {} bytes", MAX_STRING_LENGTH), pos))?;

                    Some(Value::str(&text.repeat(count)))
                },
                _ => left.numeric_pair(&right).map(|pair| match pair {
                    NumericPair::Int(left, right) => left.checked_mul(right).map(Value::Int)
                        .unwrap_or(Value::Float(left as f64 * right as f64)),
                    NumericPair::Float(left, right) => Value::Float(left * right),
                }),
            },
            BinaryOperator::Divide => match left.numeric_pair(&right) {
                Some(NumericPair::Int(_, 0)) => return Err(self.error(ErrorKind::DivisionByZero, "Division by zero", pos)),
                Some(NumericPair::Float(_, right)) if right == 0.0 =>
                    return Err(self.error(ErrorKind::DivisionByZero, "Division by zero", pos)),
                // exact quotients stay integers
                Some(NumericPair::Int(left, right)) => Some(match (left.checked_rem(right), left.checked_div(right)) {
                    (Some(0), Some(quotient)) => Value::Int(quotient),
                    _ => Value::Float(left as f64 / right as f64),
                }),
                Some(NumericPair::Float(left, right)) => Some(Value::Float(left / right)),
                None => None,
            },
            BinaryOperator::Power => left.numeric_pair(&right).map(|pair| match pair {
                NumericPair::Int(base, exponent) => u32::try_from(exponent).ok()
                    .and_then(|exponent| base.checked_pow(exponent))
                    .map(Value::Int)
                    .unwrap_or(Value::Float((base as f64).powf(exponent as f64))),
                NumericPair::Float(base, exponent) => Value::Float(base.powf(exponent)),
            }),

            BinaryOperator::Equal => Some(Value::Bool(self.values_equal(&left, &right, pos)?)),
            BinaryOperator::NotEqual => Some(Value::Bool(!self.values_equal(&left, &right, pos)?)),
            BinaryOperator::Less => Some(Value::Bool(self.compare(&left, &right, pos)? == Ordering::Less)),
            BinaryOperator::Greater => Some(Value::Bool(self.compare(&left, &right, pos)? == Ordering::Greater)),
            BinaryOperator::LessEqual => Some(Value::Bool(self.compare(&left, &right, pos)? != Ordering::Greater)),
            BinaryOperator::GreaterEqual => Some(Value::Bool(self.compare(&left, &right, pos)? != Ordering::Less)),

            // short-circuited before both operands are evaluated
            BinaryOperator::And => Some(Value::Bool(left.is_truthy() && right.is_truthy())),
            BinaryOperator::Or => Some(Value::Bool(left.is_truthy() || right.is_truthy())),
        };

        result.ok_or_else(|| self.error(ErrorKind::TypeError, format!("Unsupported operand types for {}: '{}' and '{}'",
            op, left.type_name(), right.type_name()), pos))
    }

    fn values_equal(&self, left: &Value, right: &Value, pos: TokenPos) -> EvalResult<bool> {
        match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Ok(left == right),
            _ if left.is_number() && right.is_number() => Ok(compare_numbers(left, right) == Some(Ordering::Equal)),
            _ if left.type_name() == right.type_name() => Ok(left == right),
            _ => Err(self.error(ErrorKind::TypeError,
                format!("Cannot compare '{}' and '{}'", left.type_name(), right.type_name()), pos)),
        }
    }

    fn compare(&self, left: &Value, right: &Value, pos: TokenPos) -> EvalResult<Ordering> {
        let ordering = match (left, right) {
            (Value::Str(left), Value::Str(right)) => Some(left.cmp(right)),
            _ => compare_numbers(left, right),
        };

        ordering.ok_or_else(|| self.error(ErrorKind::TypeError,
            format!("Cannot order '{}' and '{}'", left.type_name(), right.type_name()), pos))
    }

    // Helpers

    fn define(&mut self, name: &str, value: Value) {
        self.environment = Environment::define(&self.environment, name, value);
    }

    fn unknown_field(&self, struct_type: &StructType, field: &str, pos: TokenPos) -> Unwind {
        self.error(ErrorKind::NameError, format!("Struct '{}' has no field '{}'", struct_type.name, field), pos)
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, pos: TokenPos) -> Unwind {
        let mut error = RuntimeError::new(kind, message, pos);
        error.trace = self.call_stack.clone();

        Unwind::from(error)
    }
}

fn make_struct_type(name: String, fields: &[FieldDecl]) -> Value {
    Value::StructType(Rc::new(StructType { name, fields: fields.to_vec() }))
}

/// Orders two numbers, comparing ints exactly and anything involving a float as floats.
fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match left.numeric_pair(right)? {
        NumericPair::Int(left, right) => Some(left.cmp(&right)),
        NumericPair::Float(left, right) => left.partial_cmp(&right),
    }
}

#[cfg(test)]
mod tests;

use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use crate::interpreter::lexer::TokenPos;
use crate::util;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOperator {
    Add, Subtract, Multiply, Divide, Power,
    Equal, NotEqual,
    Less, Greater, LessEqual, GreaterEqual,
    And, Or,
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOperator {
    Plus, Minus,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        })
    }
}

/// The declared type of a struct field.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeTag {
    Int, Float, Str, Bool, Null,
    Fun,
    Any,
    /// A struct type, resolved by name when an instance is constructed.
    Struct(String),
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::Int => f.write_str("int"),
            TypeTag::Float => f.write_str("float"),
            TypeTag::Str => f.write_str("str"),
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::Null => f.write_str("null"),
            TypeTag::Fun => f.write_str("fun"),
            TypeTag::Any => f.write_str("any"),
            TypeTag::Struct(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Debug for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{}", value),
            Literal::Float(value) => f.write_str(&util::format_float(*value)),
            Literal::Str(value) => write!(f, "'{}'", value),
            Literal::Bool(value) => write!(f, "{}", value),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct Argument {
    /// Set for named arguments (`field: value`), used by struct constructors.
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Clone, PartialEq)]
pub struct Branch {
    /// `None` for the `el` branch and for an `eli` without a condition.
    pub condition: Option<Expr>,
    pub body: Expr,
}

#[derive(Clone, PartialEq, Debug)]
pub struct FieldDecl {
    pub name: String,
    pub type_tag: TypeTag,
}

#[derive(Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        pos: TokenPos,
    },
    Identifier {
        name: String,
        pos: TokenPos,
    },

    Assignment {
        name: String,
        value: Box<Expr>,
        pos: TokenPos,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        pos: TokenPos,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
        pos: TokenPos,
    },
    Not {
        operand: Box<Expr>,
        pos: TokenPos,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        pos: TokenPos,
    },
    MemberAccess {
        target: Box<Expr>,
        field: String,
        pos: TokenPos,
    },
    MemberSet {
        target: Box<Expr>,
        field: String,
        value: Box<Expr>,
        pos: TokenPos,
    },

    If {
        branches: Vec<Branch>,
        pos: TokenPos,
    },
    For {
        var: String,
        from: Box<Expr>,
        to: Box<Expr>,
        step: Option<Box<Expr>>,
        body: Box<Expr>,
        pos: TokenPos,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
        pos: TokenPos,
    },

    FunDef {
        name: Option<String>,
        params: Vec<String>,
        body: Rc<Expr>,
        pos: TokenPos,
    },
    StructDef {
        name: Option<String>,
        fields: Vec<FieldDecl>,
        pos: TokenPos,
    },
    Return {
        value: Option<Box<Expr>>,
        pos: TokenPos,
    },

    /// A parenthesised sequence of expressions, or a whole program.
    Block {
        exprs: Vec<Expr>,
        pos: TokenPos,
    },
}

impl Expr {
    pub fn pos(&self) -> TokenPos {
        match self {
            Expr::Literal { pos, .. }
            | Expr::Identifier { pos, .. }
            | Expr::Assignment { pos, .. }
            | Expr::BinaryOp { pos, .. }
            | Expr::UnaryOp { pos, .. }
            | Expr::Not { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::MemberAccess { pos, .. }
            | Expr::MemberSet { pos, .. }
            | Expr::If { pos, .. }
            | Expr::For { pos, .. }
            | Expr::While { pos, .. }
            | Expr::FunDef { pos, .. }
            | Expr::StructDef { pos, .. }
            | Expr::Return { pos, .. }
            | Expr::Block { pos, .. } => *pos,
        }
    }
}

impl Drop for Expr {
    // Deeply nested trees are taken apart through a worklist instead of recursively.
    fn drop(&mut self) {
        let mut children = Vec::new();
        self.take_children(&mut children);

        while let Some(mut child) = children.pop() {
            child.take_children(&mut children);
        }
    }
}

impl Expr {
    fn take_children(&mut self, children: &mut Vec<Expr>) {
        fn take(expr: &mut Expr) -> Expr {
            std::mem::replace(expr, Expr::Literal { value: Literal::Null, pos: TokenPos::default() })
        }

        match self {
            Expr::Literal { .. } | Expr::Identifier { .. } | Expr::StructDef { .. } => {},
            Expr::Assignment { value, .. } => children.push(take(value)),
            Expr::BinaryOp { left, right, .. } => children.extend([take(left), take(right)]),
            Expr::UnaryOp { operand, .. } | Expr::Not { operand, .. } => children.push(take(operand)),
            Expr::Call { callee, args, .. } => {
                children.push(take(callee));
                children.extend(args.drain(..).map(|arg| arg.value));
            },
            Expr::MemberAccess { target, .. } => children.push(take(target)),
            Expr::MemberSet { target, value, .. } => children.extend([take(target), take(value)]),
            Expr::If { branches, .. } => {
                for branch in branches.drain(..) {
                    children.extend(branch.condition);
                    children.push(branch.body);
                }
            },
            Expr::For { from, to, step, body, .. } => {
                children.extend([take(from), take(to), take(body)]);
                children.extend(step.as_mut().map(|step| take(step)));
            },
            Expr::While { condition, body, .. } => children.extend([take(condition), take(body)]),
            Expr::FunDef { body, .. } => children.extend(Rc::get_mut(body).map(take)),
            Expr::Return { value, .. } => children.extend(value.as_mut().map(|value| take(value))),
            Expr::Block { exprs, .. } => children.append(exprs),
        }
    }
}

fn join<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<String>>().join(", ")
}

impl Debug for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {:?}", name, self.value),
            None => write!(f, "{:?}", self.value),
        }
    }
}

impl Debug for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{:?}", value),
            Expr::Identifier { name, .. } => f.write_str(name),

            Expr::Assignment { name, value, .. } => write!(f, "(set {} = {:?})", name, value),
            Expr::BinaryOp { op, left, right, .. } => write!(f, "({:?} {} {:?})", left, op, right),
            Expr::UnaryOp { op, operand, .. } => write!(f, "({}{:?})", op, operand),
            Expr::Not { operand, .. } => write!(f, "(not {:?})", operand),

            Expr::Call { callee, args, .. } =>
                write!(f, "{:?}({})", callee, join(args, |arg| format!("{:?}", arg))),
            Expr::MemberAccess { target, field, .. } => write!(f, "{:?}.{}", target, field),
            Expr::MemberSet { target, field, value, .. } => write!(f, "(set {:?}.{} = {:?})", target, field, value),

            Expr::If { branches, .. } => {
                for (index, branch) in branches.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }

                    match (&branch.condition, index) {
                        (Some(condition), 0) => write!(f, "if {:?} then {:?}", condition, branch.body)?,
                        (Some(condition), _) => write!(f, "eli {:?} then {:?}", condition, branch.body)?,
                        (None, _) => write!(f, "el {:?}", branch.body)?,
                    }
                }

                Ok(())
            },
            Expr::For { var, from, to, step, body, .. } => {
                write!(f, "for {} = {:?} to {:?}", var, from, to)?;

                if let Some(step) = step {
                    write!(f, " step {:?}", step)?;
                }

                write!(f, " then {:?}", body)
            },
            Expr::While { condition, body, .. } => write!(f, "while {:?} then {:?}", condition, body),

            Expr::FunDef { name, params, body, .. } =>
                write!(f, "fun{}({}) -> {:?}", name.as_ref().map(|name| format!(" {}", name)).unwrap_or_default(),
                       params.join(", "), body),
            Expr::StructDef { name, fields, .. } =>
                write!(f, "struct{}({})", name.as_ref().map(|name| format!(" {}", name)).unwrap_or_default(),
                       join(fields, |field| format!("{}: {}", field.name, field.type_tag))),
            Expr::Return { value, .. } => match value {
                Some(value) => write!(f, "return {:?}", value),
                None => f.write_str("return"),
            },

            Expr::Block { exprs, .. } => {
                if exprs.is_empty() {
                    return f.write_str("{}");
                }

                write!(f, "{{ {} }}", exprs.iter().map(|expr| format!("{:?}", expr)).collect::<Vec<String>>().join("; "))
            },
        }
    }
}

use std::fmt::{Display, Formatter};
use thiserror::Error;
use crate::interpreter::lexer::{LexerError, TokenPos};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error("Expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        pos: TokenPos,
    },
}

impl ParseError {
    pub fn get_pos(&self) -> TokenPos {
        match self {
            ParseError::Lexer(error) => error.get_pos(),
            ParseError::Syntax { pos, .. } => *pos,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NameError,
    TypeError,
    ArityError,
    DivisionByZero,
    RecursionLimit,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::NameError => "NameError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ArityError => "ArityError",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::RecursionLimit => "RecursionLimit",
        })
    }
}

/// One active function call, recorded for tracebacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    pub name: String,
    /// Position of the call expression that entered this frame.
    pub call_site: TokenPos,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: TokenPos,
    /// Calls active when the error was raised, outermost first.
    pub trace: Vec<CallFrame>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pos: TokenPos) -> RuntimeError {
        RuntimeError { kind, message: message.into(), pos, trace: Vec::new() }
    }
}

/// Error raised by a host builtin. The evaluator attaches the position of the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct NativeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl NativeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> NativeError {
        NativeError { kind, message: message.into() }
    }

    pub fn type_error(message: impl Into<String>) -> NativeError {
        NativeError::new(ErrorKind::TypeError, message)
    }
}

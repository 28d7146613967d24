pub mod ast;
pub mod lexer;
pub mod parser;
pub mod error;
pub mod value;
pub mod environment;
pub mod evaluator;
pub mod builtins;

//! Lexer, token cursor, recursive-descent parser and AST for mini-C.

pub mod ast;
pub mod cursor;
pub mod lexer;
pub mod parser;

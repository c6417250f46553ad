//! The frontend is in charge of taking HRA source text and producing a
//! validated [`Program`](parser::Program) from the AST submodule.
//!
//! It does this by implementing a word-based tokenizer that reassembles
//! multi-word keywords, and a line-at-a-time parser.

pub mod ast;
pub mod lexer;
pub mod parser;

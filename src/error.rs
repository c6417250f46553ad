//! Errors shared by every stage of the toolchain.
//!
//! Syntax errors are raised while tokens are turned into nodes and the node
//! sequence is validated. Runtime errors are raised by the interpreter while
//! stepping, and by the code generator when it can prove ahead of time that
//! the same access would fail. Addresses in runtime errors are always the
//! ones the interpreter would report, so both backends agree.

use crate::frontend::ast::Arity;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    #[error("at line {line} '{content}' is not an instruction")]
    UnknownInstruction { line: usize, content: String },

    #[error("at line {line} expected {expected} parameter(s) but received {} -> {}",
        .received.len(), display_params(.received))]
    ParameterCount { line: usize, expected: Arity, received: Vec<String> },

    #[error("at line {line} '{content}' is not a valid number")]
    InvalidNumber { line: usize, content: String },

    #[error("at line {line} given amount ({amount}) must at least be 1")]
    InvalidAmount { line: usize, amount: i64 },

    #[error("at line {line} '{name}' is not a valid function name")]
    InvalidFunctionName { line: usize, name: String },

    #[error("function name of {name} defined at line {line} is already in use")]
    DuplicateFunction { line: usize, name: String },

    #[error("function {name} defined at line {line} has no 'close'")]
    UnterminatedFunction { line: usize, name: String },

    #[error("function {name} defined at line {line} has an empty body")]
    EmptyFunction { line: usize, name: String },

    #[error("function {inner} at line {inner_line} is defined inside function {name} at line {line}")]
    NestedFunction { line: usize, name: String, inner_line: usize, inner: String },

    #[error("no 'exit' found in program")]
    MissingExit,

    #[error("memory size must be at least 1")]
    InvalidMemorySize,

    #[error("requested memory size ({size}) is smaller than the given input ({inputs} values)")]
    InputTooLarge { size: usize, inputs: usize },

    #[error("at line {line} tried accessing memory address {address} outside 0..{size}")]
    MemoryOutOfRange { line: usize, address: i64, size: usize },

    #[error("instruction pointer is outside scope, max available: {max}, pointer: {address}")]
    InstructionOutOfRange { address: i64, max: usize },

    #[error("at line {line} function {name} was not found")]
    FunctionNotFound { line: usize, name: String },

    #[error("'{0}' is not a valid entry label")]
    InvalidEntryName(String),
}

impl Error {
    /// True for errors raised before anything runs or is generated.
    pub fn is_syntax(&self) -> bool {
        use Error::*;
        match self {
            UnknownInstruction { .. } |
            ParameterCount { .. } |
            InvalidNumber { .. } |
            InvalidAmount { .. } |
            InvalidFunctionName { .. } |
            DuplicateFunction { .. } |
            UnterminatedFunction { .. } |
            EmptyFunction { .. } |
            NestedFunction { .. } |
            MissingExit => true,

            InvalidMemorySize |
            InputTooLarge { .. } |
            MemoryOutOfRange { .. } |
            InstructionOutOfRange { .. } |
            FunctionNotFound { .. } |
            InvalidEntryName(_) => false,
        }
    }
}

fn display_params(params: &[String]) -> String {
    if params.is_empty() {
        "None".to_owned()
    } else {
        params.join(", ")
    }
}

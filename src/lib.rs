//! HRA is a small language of pointer instructions over a fixed block of
//! integer memory. Programs can be interpreted, producing a trace of machine
//! states, or compiled to 32-bit ARM assembly.
//!
//! ```
//! let program = hra::parse(hra::tokenize("set value to 5\nprint\nexit")).unwrap();
//! let machine = hra::prepare(&program, &hra::MachineConfig { memory_size: 1, inputs: vec![] }).unwrap();
//! let state = hra::run(&program, machine).run().unwrap();
//! assert_eq!(state.output, vec![5]);
//! ```

#[macro_use] extern crate log;
extern crate regex;
extern crate thiserror;

pub mod codegen;
pub mod error;
pub mod frontend;
pub mod runtime;

pub use codegen::{generate, CodegenOptions};
pub use error::{Error, Result};
pub use frontend::lexer::tokenize;
pub use frontend::parser::{parse, Program};
pub use runtime::interpreter::{run, Interpreter};
pub use runtime::machine::{prepare, Machine, MachineConfig};

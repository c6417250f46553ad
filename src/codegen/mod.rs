//! The code generator lowers a validated program to assembly text that
//! behaves like the interpreter: same memory layout, same jump rules and the
//! same runtime errors, either rejected up front or trapped at runtime.

pub mod arm;

pub use arm::{generate, CodegenOptions};

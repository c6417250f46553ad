//! The runtime holds the machine state and executes programs on it.
//!
//! [`machine`] defines what every instruction does to the machine; the code
//! generator mirrors those rules, so it is the single source of truth for
//! the language's semantics.

pub mod interpreter;
pub mod machine;

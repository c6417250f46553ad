//! Steps a [`Machine`] through a [`Program`].
//!
//! The interpreter is also an iterator over machine snapshots: one per
//! executed instruction, then the state `exit` was reached in. A failing step
//! is yielded once as an error, after which the iterator is exhausted.
use crate::error::{Error, Result};
use crate::frontend::ast::Instruction;
use crate::frontend::parser::Program;
use super::machine::Machine;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Exited,
}

pub struct Interpreter<'p> {
    program: &'p Program,
    machine: Machine,
    status: Status,
    failed: bool,
    steps: u64,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, machine: Machine) -> Self {
        Interpreter { program, machine, status: Status::Running, failed: false, steps: 0 }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Executes the node under the instruction cursor.
    pub fn step(&mut self) -> Result<Status> {
        if self.status == Status::Exited {
            return Ok(Status::Exited);
        }

        let index = self.machine.instruction_cursor;
        let node = match self.program.get(index) {
            Some(node) => node,
            None => {
                return Err(Error::InstructionOutOfRange {
                    address: index as i64 + 1,
                    max: self.program.len(),
                })
            }
        };

        if node.instruction == Instruction::Exit {
            info!("exit reached at line {} after {} step(s)", node.line, self.steps);
            self.status = Status::Exited;
            return Ok(Status::Exited);
        }

        trace!("line {}: {}", node.line, node);
        self.machine.perform(node, self.program.len())?;
        self.steps += 1;
        Ok(Status::Running)
    }

    /// Runs until `exit` and returns the final state, without keeping the
    /// states in between.
    pub fn run(mut self) -> Result<Machine> {
        while self.step()? == Status::Running {}
        Ok(self.machine)
    }
}

impl<'p> Iterator for Interpreter<'p> {
    type Item = Result<Machine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.status == Status::Exited {
            return None;
        }

        match self.step() {
            Ok(_) => Some(Ok(self.machine.clone())),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Starts interpreting `program` on `machine`.
pub fn run(program: &Program, machine: Machine) -> Interpreter<'_> {
    Interpreter::new(program, machine)
}

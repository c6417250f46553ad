//! The virtual machine an HRA program runs on, and what each instruction
//! does to it.
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;

use crate::error::{Error, Result};
use crate::frontend::ast::{Address, Instruction, Line, Node, Value};
use crate::frontend::parser::Program;

/// Sizing for a fresh machine.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MachineConfig {
    pub memory_size: usize,
    /// Copied into the first cells; the rest start at zero.
    pub inputs: Vec<Value>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig { memory_size: 32, inputs: Vec::new() }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Machine {
    pub memory: Vec<Value>,
    pub memory_cursor: Address,
    /// 0-based index of the next node to run.
    pub instruction_cursor: usize,
    /// Function name to the line of its `make function`.
    pub functions: BTreeMap<String, Line>,
    /// Function names in declaration order.
    pub registered_functions: Vec<String>,
    /// Every value written by `print`, oldest first.
    pub output: Vec<Value>,
}

impl Machine {
    pub fn new(config: &MachineConfig) -> Result<Machine> {
        if config.memory_size == 0 {
            return Err(Error::InvalidMemorySize);
        }
        if config.inputs.len() > config.memory_size {
            return Err(Error::InputTooLarge {
                size: config.memory_size,
                inputs: config.inputs.len(),
            });
        }

        let mut memory = config.inputs.clone();
        memory.resize(config.memory_size, 0);

        Ok(Machine {
            memory,
            memory_cursor: 0,
            instruction_cursor: 0,
            functions: BTreeMap::new(),
            registered_functions: Vec::new(),
            output: Vec::new(),
        })
    }

    /// The cell under the memory cursor.
    pub fn current(&self) -> Value {
        self.memory[self.memory_cursor]
    }

    /// Applies a node to the machine, leaving the instruction cursor on the
    /// node to run next. `exit` is handled by the caller and does nothing here.
    pub fn perform(&mut self, node: &Node, program_len: usize) -> Result<()> {
        use Instruction::*;
        let index = node.index();
        let mut next = index as i64 + 1;

        match &node.instruction {
            RightMemory(n) => {
                let address = (self.memory_cursor as i64).saturating_add(*n as i64);
                self.memory_cursor = self.check_memory(node.line, address)?;
            }
            LeftMemory(n) => {
                let address = self.memory_cursor as i64 - *n as i64;
                self.memory_cursor = self.check_memory(node.line, address)?;
            }
            MoveMemory(a) => {
                self.memory_cursor = self.check_memory(node.line, *a as i64)?;
            }
            CopyValue(a) => {
                let target = self.check_memory(node.line, *a as i64)?;
                self.memory[target] = self.current();
            }
            RightInstruction(n) => next = (index as i64).saturating_add(*n as i64),
            LeftInstruction(n) => next = index as i64 - *n as i64,
            MoveInstruction(line) => next = *line as i64 - 1,
            Print => {
                let value = self.current();
                debug!("line {}: print {}", node.line, value);
                self.output.push(value);
            }
            // Entering a function, by falling into it or by being called,
            // continues with the first line of its body.
            Function(_) | Close | Exit => {}
            Call(name) => {
                let begin = match self.functions.get(name) {
                    Some(begin) => *begin,
                    None => return Err(Error::FunctionNotFound { line: node.line, name: name.clone() }),
                };
                // The begin node's index is `begin - 1`; its body starts one after.
                next = begin as i64;
            }
            Greater(a, b) | Less(a, b) | Equal(a, b) | Unequal(a, b) => {
                let lhs = self.memory[self.check_memory(node.line, *a as i64)?];
                let rhs = self.memory[self.check_memory(node.line, *b as i64)?];
                if node.instruction.compare(lhs, rhs) == Some(false) {
                    next = index as i64 + 2;
                }
            }
            Set(v) => self.memory[self.memory_cursor] = *v,
            Increment(v) => self.memory[self.memory_cursor] = self.current().wrapping_add(*v),
            Decrement(v) => self.memory[self.memory_cursor] = self.current().wrapping_sub(*v),
            Multiply(v) => self.memory[self.memory_cursor] = self.current().wrapping_mul(*v),
        }

        self.instruction_cursor = check_jump(next.saturating_add(1), program_len)? - 1;
        Ok(())
    }

    /// Checks a memory address against this machine's memory.
    pub fn check_memory(&self, line: Line, address: i64) -> Result<Address> {
        check_memory(line, address, self.memory.len())
    }
}

/// Checks a memory address against a memory of `size` cells.
pub fn check_memory(line: Line, address: i64, size: usize) -> Result<Address> {
    match usize::try_from(address) {
        Ok(address) if address < size => Ok(address),
        _ => Err(Error::MemoryOutOfRange { line, address, size }),
    }
}

/// Checks the line a jump lands on. Landing one past the last line is
/// allowed, but there is nothing there to run.
pub fn check_jump(target: i64, program_len: usize) -> Result<Line> {
    match usize::try_from(target) {
        Ok(line) if line >= 1 && line <= program_len + 1 => Ok(line),
        _ => Err(Error::InstructionOutOfRange { address: target, max: program_len }),
    }
}

/// Builds the machine a program starts on: memory per the configuration,
/// functions registered and the instruction cursor on the entry point.
pub fn prepare(program: &Program, config: &MachineConfig) -> Result<Machine> {
    let mut machine = Machine::new(config)?;

    for function in &program.functions {
        machine.functions.insert(function.name.clone(), function.begin);
        machine.registered_functions.push(function.name.clone());
    }
    machine.instruction_cursor = program.entry_point();

    debug!("machine ready: {} cell(s), entry at line {}",
        machine.memory.len(), machine.instruction_cursor + 1);
    Ok(machine)
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let memory: Vec<String> = self.memory.iter().map(|v| v.to_string()).collect();
        write!(f, "memory=[{}] memory_pointer={} instruction_pointer={} functions=[{}]",
            memory.join(", "),
            self.memory_cursor,
            self.instruction_cursor,
            self.registered_functions.join(", "))
    }
}

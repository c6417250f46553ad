use hra::{Machine, MachineConfig, Program, Result};

pub fn program(source: &str) -> Program {
    hra::parse(hra::tokenize(source)).unwrap()
}

pub fn config(memory_size: usize, inputs: &[i32]) -> MachineConfig {
    MachineConfig { memory_size, inputs: inputs.to_vec() }
}

pub fn interpret(source: &str, memory_size: usize, inputs: &[i32]) -> Result<Machine> {
    let program = hra::parse(hra::tokenize(source))?;
    let machine = hra::prepare(&program, &config(memory_size, inputs))?;
    hra::run(&program, machine).run()
}

pub fn compile(source: &str, memory_size: usize, inputs: &[i32]) -> Result<String> {
    let program = hra::parse(hra::tokenize(source))?;
    let machine = hra::prepare(&program, &config(memory_size, inputs))?;
    hra::generate(&program, &machine, &hra::CodegenOptions::default(), inputs)
}

/// Printed values the way the compiled program writes them.
pub fn printed(machine: &Machine) -> String {
    machine.output.iter().map(|value| value.to_string()).collect()
}

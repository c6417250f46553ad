//! Lowers a program to 32-bit ARM assembly (GNU `as`, unified syntax) for
//! Linux, runnable under `qemu-arm`.
//!
//! Memory cell `i` lives at `fp - (i + 1) * 4`. `r4` always holds the byte
//! address of the cell under the memory cursor; `r0`-`r3` are scratch.
//! Every node gets a `node_<line>` label, and `node_<len + 1>` traps like the
//! interpreter does when it runs off the end of the program.
use std::convert::TryFrom;

use crate::error::{Error, Result};
use crate::frontend::ast::{is_identifier, Instruction, Line, Node, Value};
use crate::frontend::parser::Program;
use crate::runtime::machine::{check_jump, check_memory, Machine};

pub const WORD: usize = 4;
pub const COMMENT: &str = "@";

/// Exit status of a program that moved its memory cursor out of memory.
pub const MEMORY_FAULT: u8 = 2;
/// Exit status of a program that ran past its last line.
pub const INSTRUCTION_FAULT: u8 = 3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CodegenOptions {
    /// Label the linker starts the program at.
    pub entry: String,
    /// Adds a comment with the source of every node.
    pub verbose: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions { entry: "_start".to_owned(), verbose: false }
    }
}

/// Generates the assembly for `program` running on a machine prepared like
/// `machine`, with `inputs` stored in the first cells. Nothing is generated
/// if the program contains an access that would fail at runtime for certain.
pub fn generate(program: &Program, machine: &Machine, options: &CodegenOptions, inputs: &[Value]) -> Result<String> {
    let size = machine.memory.len();
    if !is_identifier(&options.entry) {
        return Err(Error::InvalidEntryName(options.entry.clone()));
    }
    if size == 0 || u32::try_from(size * WORD).is_err() {
        return Err(Error::InvalidMemorySize);
    }
    if inputs.len() > size {
        return Err(Error::InputTooLarge { size, inputs: inputs.len() });
    }
    for node in &program.nodes {
        validate(node, machine, program.len())?;
    }

    let mut generator = Generator { lines: Vec::new(), size, verbose: options.verbose };
    generator.header(program.len());

    let start = machine.instruction_cursor;
    for index in 0..=program.len() {
        if index == start {
            if index > 0 {
                // Falling off the line above must not run the setup again.
                generator.op("b", &node_label(index + 1));
            }
            generator.preamble(&options.entry, inputs);
        }
        match program.get(index) {
            Some(node) => generator.node(node),
            None => {
                generator.label(&node_label(index + 1));
                generator.op("b", "hra_instruction_fault");
            }
        }
    }

    generator.routines();
    info!("generated {} line(s) of assembly for {} node(s)", generator.lines.len(), program.len());

    let mut text = generator.lines.join("\n");
    text.push('\n');
    Ok(text)
}

/// Rejects what the interpreter would reject once it reached `node`, where
/// that does not depend on the state at runtime.
fn validate(node: &Node, machine: &Machine, program_len: usize) -> Result<()> {
    use Instruction::*;
    let size = machine.memory.len();
    let line = node.line as i64;

    match &node.instruction {
        MoveMemory(a) | CopyValue(a) => {
            check_memory(node.line, *a as i64, size)?;
        }
        RightInstruction(n) => {
            check_jump(line.saturating_add(*n as i64), program_len)?;
        }
        LeftInstruction(n) => {
            check_jump(line - *n as i64, program_len)?;
        }
        MoveInstruction(target) => {
            check_jump(*target as i64, program_len)?;
        }
        Greater(a, b) | Less(a, b) | Equal(a, b) | Unequal(a, b) => {
            check_memory(node.line, *a as i64, size)?;
            check_memory(node.line, *b as i64, size)?;
            check_jump(line + 1, program_len)?;
            check_jump(line + 2, program_len)?;
        }
        Call(name) => {
            if !machine.functions.contains_key(name) {
                return Err(Error::FunctionNotFound { line: node.line, name: name.clone() });
            }
        }
        RightMemory(_) | LeftMemory(_) | Print | Function(_) | Close | Exit |
        Set(_) | Increment(_) | Decrement(_) | Multiply(_) => {}
    }
    Ok(())
}

fn node_label(line: Line) -> String {
    format!("node_{}", line)
}

fn function_label(name: &str) -> String {
    format!("function_{}", name)
}

/// Byte distance below `fp` of a memory cell.
fn cell_offset(address: usize) -> u32 {
    // Addresses are validated against the memory size, whose byte size fits.
    ((address + 1) * WORD) as u32
}

struct Generator {
    lines: Vec<String>,
    size: usize,
    verbose: bool,
}

impl Generator {
    fn label(&mut self, name: &str) {
        self.lines.push(format!("{}:", name));
    }

    fn directive(&mut self, text: &str) {
        self.lines.push(format!("    {}", text));
    }

    fn comment(&mut self, text: &str) {
        self.lines.push(format!("{} {}", COMMENT, text));
    }

    fn op(&mut self, mnemonic: &str, operands: &str) {
        if operands.is_empty() {
            self.lines.push(format!("    {}", mnemonic));
        } else {
            self.lines.push(format!("    {} {}", mnemonic, operands));
        }
    }

    /// Materialises a constant without a literal pool.
    fn load(&mut self, register: &str, value: u32) {
        if value <= 0xFF {
            self.op("mov", &format!("{}, #{}", register, value));
        } else {
            self.op("movw", &format!("{}, #{}", register, value & 0xFFFF));
            if value >> 16 != 0 {
                self.op("movt", &format!("{}, #{}", register, value >> 16));
            }
        }
    }

    /// Loads the cell at an absolute address, clobbering `scratch`.
    fn load_cell(&mut self, register: &str, scratch: &str, address: usize) {
        self.load(scratch, cell_offset(address));
        self.op("ldr", &format!("{}, [fp, -{}]", register, scratch));
    }

    fn header(&mut self, program_len: usize) {
        self.comment(&format!("HRA program: {} line(s), {} memory cell(s)", program_len, self.size));
        self.directive(".syntax unified");
        self.directive(".arch armv7-a");
        self.directive(".text");
    }

    /// Sets up the memory frame. Placed right before the first node to run,
    /// so control falls through into it. Code above it branches around it.
    fn preamble(&mut self, entry: &str, inputs: &[Value]) {
        self.directive(&format!(".global {}", entry));
        self.label(entry);
        if self.verbose {
            self.comment(&format!("reserve and clear {} memory cell(s)", self.size));
        }
        self.op("mov", "fp, sp");
        self.load("r1", (self.size * WORD) as u32);
        self.op("sub", "sp, sp, r1");
        self.op("mov", "r0, #0");
        self.op("mov", "r2, sp");
        self.label("hra_clear");
        self.op("cmp", "r2, fp");
        self.op("strlo", "r0, [r2], #4");
        self.op("blo", "hra_clear");

        if self.verbose && !inputs.is_empty() {
            self.comment(&format!("store {} input value(s)", inputs.len()));
        }
        for (address, value) in inputs.iter().enumerate() {
            self.load("r0", *value as u32);
            self.load("r1", cell_offset(address));
            self.op("str", "r0, [fp, -r1]");
        }

        self.op("sub", "r4, fp, #4");
    }

    fn node(&mut self, node: &Node) {
        use Instruction::*;
        self.label(&node_label(node.line));
        if self.verbose {
            self.comment(&format!("{}: {}", node.line, node));
        }

        match &node.instruction {
            RightMemory(n) => self.move_cursor("sub", *n),
            LeftMemory(n) => self.move_cursor("add", *n),
            MoveMemory(a) => {
                self.load("r1", cell_offset(*a));
                self.op("sub", "r4, fp, r1");
            }
            CopyValue(a) => {
                self.op("ldr", "r0, [r4]");
                self.load("r1", cell_offset(*a));
                self.op("str", "r0, [fp, -r1]");
            }
            RightInstruction(n) => self.op("b", &node_label(node.line + n)),
            LeftInstruction(n) => self.op("b", &node_label(node.line - n)),
            MoveInstruction(target) => self.op("b", &node_label(*target)),
            Print => {
                self.op("ldr", "r0, [r4]");
                self.op("bl", "hra_print");
            }
            Function(name) => self.label(&function_label(name)),
            Close => {}
            Call(name) => self.op("b", &function_label(name)),
            Exit => self.op("b", "hra_exit"),
            Greater(a, b) => self.compare("bgt", *a, *b, node.line),
            Less(a, b) => self.compare("blt", *a, *b, node.line),
            Equal(a, b) => self.compare("beq", *a, *b, node.line),
            Unequal(a, b) => self.compare("bne", *a, *b, node.line),
            Set(v) => {
                self.load("r0", *v as u32);
                self.op("str", "r0, [r4]");
            }
            Increment(v) => self.modify("add", *v),
            Decrement(v) => self.modify("sub", *v),
            Multiply(v) => self.modify("mul", *v),
        }
    }

    /// Moves the cursor register by `n` cells and traps if it left memory.
    fn move_cursor(&mut self, mnemonic: &str, n: usize) {
        if n >= self.size {
            // No cursor position survives a move this far.
            self.op("b", "hra_memory_fault");
            return;
        }
        self.load("r1", (n * WORD) as u32);
        self.op(mnemonic, "r4, r4, r1");
        self.op("sub", "r1, fp, #4");
        self.op("cmp", "r4, r1");
        self.op("bhi", "hra_memory_fault");
        self.load("r1", (self.size * WORD) as u32);
        self.op("sub", "r1, fp, r1");
        self.op("cmp", "r4, r1");
        self.op("blo", "hra_memory_fault");
    }

    fn modify(&mut self, mnemonic: &str, value: Value) {
        self.op("ldr", "r0, [r4]");
        self.load("r1", value as u32);
        // mul may not share its destination with the first operand on older cores.
        self.op(mnemonic, "r2, r0, r1");
        self.op("str", "r2, [r4]");
    }

    /// A true comparison falls through to the next line, a false one skips it.
    fn compare(&mut self, branch: &str, lhs: usize, rhs: usize, line: Line) {
        self.load_cell("r0", "r2", lhs);
        self.load_cell("r1", "r3", rhs);
        self.op("cmp", "r0, r1");
        self.op(branch, &node_label(line + 1));
        self.op("b", &node_label(line + 2));
    }

    fn routines(&mut self) {
        self.print_routine();

        if self.verbose {
            self.comment("faults and exit; the status of a normal exit is memory cell 0");
        }
        self.label("hra_memory_fault");
        self.op("mov", &format!("r0, #{}", MEMORY_FAULT));
        self.op("b", "hra_terminate");
        self.label("hra_instruction_fault");
        self.op("mov", &format!("r0, #{}", INSTRUCTION_FAULT));
        self.op("b", "hra_terminate");
        self.label("hra_exit");
        self.op("ldr", "r0, [fp, #-4]");
        self.label("hra_terminate");
        self.op("mov", "sp, fp");
        self.op("mov", "r7, #1");
        self.op("svc", "#0");
    }

    /// Writes r0 to stdout in decimal, without a separator. Preserves r4.
    fn print_routine(&mut self) {
        if self.verbose {
            self.comment("print r0 in decimal to stdout");
        }
        self.label("hra_print");
        self.op("push", "{r4-r7, lr}");
        self.op("sub", "sp, sp, #16");
        self.op("add", "r5, sp, #16");
        self.op("mov", "r6, r5");
        self.op("mov", "r7, r0");
        self.op("cmp", "r0, #0");
        self.op("rsblt", "r0, r0, #0");
        self.label("hra_print_digit");
        // r3 = r0 / 10, by multiplying with the reciprocal 0xCCCCCCCD >> 35.
        self.load("r3", 0xCCCC_CCCD);
        self.op("umull", "r2, r3, r0, r3");
        self.op("lsr", "r3, r3, #3");
        self.op("add", "r2, r3, r3, lsl #2");
        self.op("sub", "r2, r0, r2, lsl #1");
        self.op("add", "r2, r2, #48");
        self.op("strb", "r2, [r6, #-1]!");
        self.op("movs", "r0, r3");
        self.op("bne", "hra_print_digit");
        self.op("cmp", "r7, #0");
        self.op("movlt", "r2, #45");
        self.op("strblt", "r2, [r6, #-1]!");
        self.op("mov", "r0, #1");
        self.op("mov", "r1, r6");
        self.op("sub", "r2, r5, r6");
        self.op("mov", "r7, #4");
        self.op("svc", "#0");
        self.op("add", "sp, sp, #16");
        self.op("pop", "{r4-r7, pc}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use crate::frontend::parser::parse;
    use crate::runtime::machine::{prepare, MachineConfig};

    fn assemble(source: &str, memory_size: usize, inputs: &[i32], options: &CodegenOptions) -> Result<String> {
        let program = parse(tokenize(source)).unwrap();
        let machine = prepare(&program, &MachineConfig { memory_size, inputs: inputs.to_vec() }).unwrap();
        generate(&program, &machine, options, inputs)
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_load() {
        let mut g = Generator { lines: vec![], size: 1, verbose: false };
        g.load("r0", 5);
        g.load("r1", 0x1234);
        g.load("r2", (-2i32) as u32);
        assert_eq!(g.lines, vec![
            "    mov r0, #5",
            "    movw r1, #4660",
            "    movw r2, #65534",
            "    movt r2, #65535",
        ]);
    }

    #[test]
    fn test_labels_and_entry() {
        let text = assemble("
            make function f
            print
            move instruction pointer to 5
            close
            run function f
            exit
        ", 1, &[], &CodegenOptions::default()).unwrap();
        let lines = lines(&text);

        for line in 1..=7 {
            assert!(lines.contains(&format!("node_{}:", line).as_str()), "missing node_{}", line);
        }
        assert!(lines.contains(&"function_f:"));
        assert!(lines.contains(&"    b function_f"));
        assert!(lines.contains(&"    b node_5"));
        assert!(lines.contains(&"    b hra_exit"));

        // The entry sits right before the first line that runs.
        let entry = lines.iter().position(|l| *l == "_start:").unwrap();
        let node_4 = lines.iter().position(|l| *l == "node_4:").unwrap();
        let node_5 = lines.iter().position(|l| *l == "node_5:").unwrap();
        assert!(node_4 < entry && entry < node_5);
        assert_eq!(lines[entry - 1], "    .global _start");
        // The close on line 4 continues at line 5 without redoing the setup.
        assert_eq!(lines[entry - 2], "    b node_5");
    }

    #[test]
    fn test_entry_at_first_line_has_no_branch_around() {
        let text = assemble("print\nexit", 1, &[], &CodegenOptions::default()).unwrap();
        let lines = lines(&text);
        let entry = lines.iter().position(|l| *l == "_start:").unwrap();
        assert!(!lines[..entry].iter().any(|l| l.starts_with("    b ")));
    }

    #[test]
    fn test_huge_jump_is_out_of_range() {
        let options = CodegenOptions::default();
        assert_eq!(
            assemble("plus instruction pointer 9223372036854775807\nexit", 1, &[], &options),
            Err(Error::InstructionOutOfRange { address: i64::MAX, max: 2 })
        );

        let text = assemble("plus memory pointer 9223372036854775807\nexit", 2, &[], &options).unwrap();
        assert!(text.contains("node_1:\n    b hra_memory_fault\n"));
    }

    #[test]
    fn test_custom_entry() {
        let options = CodegenOptions { entry: "main".to_owned(), verbose: false };
        let text = assemble("exit", 1, &[], &options).unwrap();
        assert!(text.contains("    .global main\nmain:\n"));

        let options = CodegenOptions { entry: "not a label".to_owned(), verbose: false };
        assert_eq!(
            assemble("exit", 1, &[], &options),
            Err(Error::InvalidEntryName("not a label".to_owned()))
        );
    }

    #[test]
    fn test_inputs() {
        let text = assemble("exit", 3, &[7, -1], &CodegenOptions::default()).unwrap();
        assert!(text.contains("    mov r0, #7\n    mov r1, #4\n    str r0, [fp, -r1]\n"));
        assert!(text.contains("    movw r0, #65535\n    movt r0, #65535\n    mov r1, #8\n    str r0, [fp, -r1]\n"));
        assert!(text.contains("    mov r1, #12\n    sub sp, sp, r1\n"));

        let program = parse(tokenize("exit")).unwrap();
        let machine = prepare(&program, &MachineConfig { memory_size: 1, inputs: vec![] }).unwrap();
        assert_eq!(
            generate(&program, &machine, &CodegenOptions::default(), &[1, 2]),
            Err(Error::InputTooLarge { size: 1, inputs: 2 })
        );
    }

    #[test]
    fn test_compare() {
        let text = assemble("
            less compare between 0 1
            print
            exit
        ", 2, &[], &CodegenOptions::default()).unwrap();
        assert!(text.contains(concat!(
            "node_1:\n",
            "    mov r2, #4\n",
            "    ldr r0, [fp, -r2]\n",
            "    mov r3, #8\n",
            "    ldr r1, [fp, -r3]\n",
            "    cmp r0, r1\n",
            "    blt node_2\n",
            "    b node_3\n",
        )));
    }

    #[test]
    fn test_values() {
        let text = assemble("
            set value to 3
            increment pointer by 2
            multiply pointer by 300
            exit
        ", 1, &[], &CodegenOptions::default()).unwrap();
        assert!(text.contains("node_1:\n    mov r0, #3\n    str r0, [r4]\n"));
        assert!(text.contains("node_2:\n    ldr r0, [r4]\n    mov r1, #2\n    add r2, r0, r1\n    str r2, [r4]\n"));
        assert!(text.contains("node_3:\n    ldr r0, [r4]\n    movw r1, #300\n    mul r2, r0, r1\n"));
    }

    #[test]
    fn test_cursor_moves_are_checked() {
        let text = assemble("plus memory pointer\nexit", 2, &[], &CodegenOptions::default()).unwrap();
        assert!(text.contains(concat!(
            "node_1:\n",
            "    mov r1, #4\n",
            "    sub r4, r4, r1\n",
            "    sub r1, fp, #4\n",
            "    cmp r4, r1\n",
            "    bhi hra_memory_fault\n",
            "    mov r1, #8\n",
            "    sub r1, fp, r1\n",
            "    cmp r4, r1\n",
            "    blo hra_memory_fault\n",
        )));

        let text = assemble("min memory pointer 5\nexit", 2, &[], &CodegenOptions::default()).unwrap();
        assert!(text.contains("node_1:\n    b hra_memory_fault\n"));
    }

    #[test]
    fn test_sentinel() {
        let text = assemble("print\nexit", 1, &[], &CodegenOptions::default()).unwrap();
        assert!(text.contains("node_3:\n    b hra_instruction_fault\n"));
    }

    #[test]
    fn test_verbose() {
        let quiet = assemble("set value to 1\nexit", 1, &[], &CodegenOptions::default()).unwrap();
        let verbose = assemble("set value to 1\nexit", 1, &[],
            &CodegenOptions { entry: "_start".to_owned(), verbose: true }).unwrap();

        assert!(verbose.contains("@ 1: set value to 1\n"));
        assert!(verbose.contains("@ 2: exit\n"));
        assert!(!quiet.contains("@ 1:"));
        assert!(verbose.lines().count() > quiet.lines().count());
    }

    #[test]
    fn test_static_errors() {
        let options = CodegenOptions::default();
        assert_eq!(
            assemble("move memory pointer to 4\nexit", 2, &[], &options),
            Err(Error::MemoryOutOfRange { line: 1, address: 4, size: 2 })
        );
        assert_eq!(
            assemble("exit\nequal compare between 0 2", 2, &[], &options),
            Err(Error::MemoryOutOfRange { line: 2, address: 2, size: 2 })
        );
        assert_eq!(
            assemble("move instruction pointer to 9\nexit", 1, &[], &options),
            Err(Error::InstructionOutOfRange { address: 9, max: 2 })
        );
        assert_eq!(
            assemble("exit\nmin instruction pointer 2", 1, &[], &options),
            Err(Error::InstructionOutOfRange { address: 0, max: 2 })
        );
        assert_eq!(
            assemble("exit\ngreater compare between 0 0", 1, &[], &options),
            Err(Error::InstructionOutOfRange { address: 4, max: 2 })
        );
        assert_eq!(
            assemble("run function nope\nexit", 1, &[], &options),
            Err(Error::FunctionNotFound { line: 1, name: "nope".to_owned() })
        );
    }

    #[test]
    fn test_deterministic() {
        let source = "
            make function b
            print
            close
            make function a
            decrement pointer by 1
            move instruction pointer to 9
            close
            run function a
            run function b
            exit
        ";
        let options = CodegenOptions { entry: "_start".to_owned(), verbose: true };
        let first = assemble(source, 4, &[3], &options).unwrap();
        let second = assemble(source, 4, &[3], &options).unwrap();
        assert_eq!(first, second);
    }
}

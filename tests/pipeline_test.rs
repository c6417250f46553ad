mod common;
use common::*;
use hra::Error;

const COUNT_UP: &str = include_str!("../programs/count_up.hra");
const IS_EVEN: &str = include_str!("../programs/is_even.hra");

#[test]
fn test_set() {
    let m = interpret("set value to 5\nexit", 1, &[]).unwrap();
    assert_eq!(m.memory, vec![5]);
}

#[test]
fn test_set_and_increment() {
    let m = interpret("set value to 3\nincrement pointer by 2\nexit", 1, &[]).unwrap();
    assert_eq!(m.memory, vec![5]);
}

#[test]
fn test_print_second_cell() {
    let m = interpret("set value to 0\nplus memory pointer 1\nset value to 9\nprint\nexit", 2, &[]).unwrap();
    assert_eq!(printed(&m), "9");
}

#[test]
fn test_greater_fall_through_and_skip() {
    let source = "greater compare between 0 1\nprint\nexit";
    // Condition holds: the print on the next line runs.
    assert_eq!(printed(&interpret(source, 2, &[4, 3]).unwrap()), "4");
    // Condition fails: the print is skipped.
    assert_eq!(printed(&interpret(source, 2, &[3, 3]).unwrap()), "");
}

#[test]
fn test_count_up() {
    assert_eq!(printed(&interpret(COUNT_UP, 2, &[0]).unwrap()), "012345678910");
    assert_eq!(printed(&interpret(COUNT_UP, 2, &[5]).unwrap()), "5678910");
    assert_eq!(printed(&interpret(COUNT_UP, 2, &[9]).unwrap()), "910");
}

#[test]
fn test_is_even() {
    for (input, expected) in &[(0, 1), (1, 0), (2, 1), (3, 0), (10, 1)] {
        let m = interpret(IS_EVEN, 2, &[*input]).unwrap();
        assert_eq!(m.memory[0], *expected, "input {}", input);
        assert_eq!(printed(&m), expected.to_string());
    }
}

#[test]
fn test_trace_ends_with_exit_state() {
    let program = program(COUNT_UP);
    let machine = hra::prepare(&program, &config(2, &[9])).unwrap();
    let trace: Vec<hra::Machine> = hra::run(&program, machine).map(|s| s.unwrap()).collect();
    let last = trace.last().unwrap();
    assert_eq!(last.memory, vec![10, 10]);
    assert_eq!(program.get(last.instruction_cursor).unwrap().instruction, hra::frontend::ast::Instruction::Exit);
}

#[test]
fn test_syntax_errors() {
    assert_eq!(interpret("print", 1, &[]).unwrap_err(), Error::MissingExit);
    assert!(interpret("make function f\nprint\nexit", 1, &[]).unwrap_err().is_syntax());
    assert!(interpret("multiply pointer by 0\nexit", 1, &[]).unwrap_err().is_syntax());
}

#[test]
fn test_generate_is_deterministic() {
    let first = compile(COUNT_UP, 2, &[3]).unwrap();
    let second = compile(COUNT_UP, 2, &[3]).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("function_count:"));
}

#[test]
fn test_run_and_generate_agree_on_memory_errors() {
    let source = "move memory pointer to 5\nexit";
    let expected = Error::MemoryOutOfRange { line: 1, address: 5, size: 2 };
    assert_eq!(interpret(source, 2, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 2, &[]).unwrap_err(), expected);

    let source = "set value to 1\ncopy value to 3\nexit";
    let expected = Error::MemoryOutOfRange { line: 2, address: 3, size: 3 };
    assert_eq!(interpret(source, 3, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 3, &[]).unwrap_err(), expected);
}

#[test]
fn test_run_and_generate_agree_on_instruction_errors() {
    let source = "move instruction pointer to 7\nexit";
    let expected = Error::InstructionOutOfRange { address: 7, max: 2 };
    assert_eq!(interpret(source, 1, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 1, &[]).unwrap_err(), expected);

    let source = "print\nmin instruction pointer 3\nexit";
    let expected = Error::InstructionOutOfRange { address: -1, max: 3 };
    assert_eq!(interpret(source, 1, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 1, &[]).unwrap_err(), expected);
}

#[test]
fn test_run_and_generate_agree_on_huge_jumps() {
    let source = "plus instruction pointer 9223372036854775807\nexit";
    let expected = Error::InstructionOutOfRange { address: i64::MAX, max: 2 };
    assert_eq!(interpret(source, 1, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 1, &[]).unwrap_err(), expected);

    let source = "plus memory pointer\nplus memory pointer 9223372036854775807\nexit";
    let expected = Error::MemoryOutOfRange { line: 2, address: i64::MAX, size: 2 };
    assert_eq!(interpret(source, 2, &[]).unwrap_err(), expected);
    assert!(compile(source, 2, &[]).unwrap().contains("node_2:\n    b hra_memory_fault\n"));
}

#[test]
fn test_unknown_function() {
    let source = "run function missing\nexit";
    let expected = Error::FunctionNotFound { line: 1, name: "missing".to_owned() };
    assert_eq!(interpret(source, 1, &[]).unwrap_err(), expected);
    assert_eq!(compile(source, 1, &[]).unwrap_err(), expected);
}

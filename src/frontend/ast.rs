//! This AST describes a parsed HRA program.
//!
//! A program is a list of nodes, one per logical line. A node's address is
//! its logical line number, starting at 1; that number is also what jump
//! instructions refer to. Comments are lines starting with `#`.
//!
//! Supported Instructions:
//!
//! ```text
//! plus memory pointer [N]          ; memory cursor += N (default 1)
//! min memory pointer [N]           ; memory cursor -= N (default 1)
//! move memory pointer to A         ; memory cursor = A
//! copy value to A                  ; memory[A] = memory[cursor]
//! plus instruction pointer [N]     ; continue N lines further down
//! min instruction pointer [N]      ; continue N lines further up
//! move instruction pointer to L    ; continue at line L
//! print                            ; write memory[cursor]
//! make function NAME               ; start the body of NAME
//! close                            ; end the body of the open function
//! run function NAME                ; jump into the body of NAME
//! exit                             ; stop the program
//! greater compare between A B      ; memory[A] > memory[B], else skip a line
//! less compare between A B         ; memory[A] < memory[B], else skip a line
//! equal compare between A B        ; memory[A] == memory[B], else skip a line
//! unequal compare between A B      ; memory[A] != memory[B], else skip a line
//! set value to V                   ; memory[cursor] = V
//! increment pointer by V           ; memory[cursor] += V
//! decrement pointer by V           ; memory[cursor] -= V
//! multiply pointer by V            ; memory[cursor] *= V
//! ```
//!
//! Numbers may be written in decimal, or with a `0x` or `0b` prefix.
//! Only `set value to` accepts negative values.
//!
//! Note that `run function` does not remember where it was called from. The
//! function body has to jump back on its own; otherwise execution runs past
//! `close` into whatever follows.

use std::convert::TryFrom;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::lexer::{Token, TokenKind};
use crate::error::{Error, Result};

/// How many parameters an instruction takes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Arity {
    None,
    Exactly(usize),
    OneOf(&'static [usize]),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::None => count == 0,
            Arity::Exactly(n) => count == *n,
            Arity::OneOf(counts) => counts.contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::None => write!(f, "no"),
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::OneOf(counts) => {
                let counts: Vec<String> = counts.iter().map(|n| n.to_string()).collect();
                write!(f, "{}", counts.join(" or "))
            }
        }
    }
}

/// A memory address.
pub type Address = usize;
/// A logical line number.
pub type Line = usize;
/// The value of a memory cell.
pub type Value = i32;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    RightMemory(usize),
    LeftMemory(usize),
    MoveMemory(Address),
    CopyValue(Address),
    RightInstruction(usize),
    LeftInstruction(usize),
    MoveInstruction(Line),
    Print,
    Function(String),
    Close,
    Call(String),
    Exit,
    Greater(Address, Address),
    Less(Address, Address),
    Equal(Address, Address),
    Unequal(Address, Address),
    Set(Value),
    Increment(Value),
    Decrement(Value),
    Multiply(Value),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;
        match self {
            RightMemory(n) | LeftMemory(n) |
            RightInstruction(n) | LeftInstruction(n) => write!(f, "{} {}", self.keyword(), n),
            MoveMemory(a) | CopyValue(a)             => write!(f, "{} {}", self.keyword(), a),
            MoveInstruction(l)                       => write!(f, "{} {}", self.keyword(), l),
            Function(name) | Call(name)              => write!(f, "{} {}", self.keyword(), name),
            Greater(a, b) | Less(a, b) |
            Equal(a, b) | Unequal(a, b)              => write!(f, "{} {} {}", self.keyword(), a, b),
            Set(v) | Increment(v) |
            Decrement(v) | Multiply(v)               => write!(f, "{} {}", self.keyword(), v),
            Print | Close | Exit                     => write!(f, "{}", self.keyword()),
        }
    }
}

impl Instruction {
    /// Builds the instruction a keyword selects from its raw parameters.
    /// Returns `None` when the token kind does not start an instruction.
    pub fn decode(kind: TokenKind, line: Line, params: &[String]) -> Option<Result<Instruction>> {
        let arity = Self::arity(kind)?;
        if !arity.accepts(params.len()) {
            return Some(Err(Error::ParameterCount {
                line,
                expected: arity,
                received: params.to_vec(),
            }));
        }
        Some(Self::configure(kind, line, params))
    }

    fn arity(kind: TokenKind) -> Option<Arity> {
        use TokenKind::*;
        match kind {
            RightMemory | LeftMemory |
            RightInstruction | LeftInstruction => Some(Arity::OneOf(&[0, 1])),

            MoveMemory | CopyValue | MoveInstruction |
            Function | Call |
            Set | Increment | Decrement | Multiply => Some(Arity::Exactly(1)),

            Greater | Less | Equal | Unequal => Some(Arity::Exactly(2)),

            Print | Close | Exit => Some(Arity::None),

            Literal | Reserved => None,
        }
    }

    /// Decodes parameters whose count has already been checked.
    fn configure(kind: TokenKind, line: Line, params: &[String]) -> Result<Instruction> {
        use Instruction::*;
        let instruction = match kind {
            TokenKind::RightMemory      => RightMemory(move_amount(line, params)?),
            TokenKind::LeftMemory       => LeftMemory(move_amount(line, params)?),
            TokenKind::RightInstruction => RightInstruction(move_amount(line, params)?),
            TokenKind::LeftInstruction  => LeftInstruction(move_amount(line, params)?),
            TokenKind::MoveMemory       => MoveMemory(address(line, &params[0])?),
            TokenKind::CopyValue        => CopyValue(address(line, &params[0])?),
            TokenKind::MoveInstruction  => MoveInstruction(address(line, &params[0])?),
            TokenKind::Print            => Print,
            TokenKind::Function         => Function(function_name(line, &params[0])?),
            TokenKind::Close            => Close,
            TokenKind::Call             => Call(function_name(line, &params[0])?),
            TokenKind::Exit             => Exit,
            TokenKind::Greater          => Greater(address(line, &params[0])?, address(line, &params[1])?),
            TokenKind::Less             => Less(address(line, &params[0])?, address(line, &params[1])?),
            TokenKind::Equal            => Equal(address(line, &params[0])?, address(line, &params[1])?),
            TokenKind::Unequal          => Unequal(address(line, &params[0])?, address(line, &params[1])?),
            TokenKind::Set              => Set(value(line, &params[0])?),
            TokenKind::Increment        => Increment(value_amount(line, &params[0])?),
            TokenKind::Decrement        => Decrement(value_amount(line, &params[0])?),
            TokenKind::Multiply         => Multiply(value_amount(line, &params[0])?),
            TokenKind::Literal | TokenKind::Reserved => {
                return Err(Error::UnknownInstruction { line, content: params.join(" ") })
            }
        };
        Ok(instruction)
    }

    /// The source keyword of this instruction.
    pub fn keyword(&self) -> &'static str {
        self.kind().keyword().unwrap_or_default()
    }

    pub fn kind(&self) -> TokenKind {
        use Instruction::*;
        match self {
            RightMemory(_)      => TokenKind::RightMemory,
            LeftMemory(_)       => TokenKind::LeftMemory,
            MoveMemory(_)       => TokenKind::MoveMemory,
            CopyValue(_)        => TokenKind::CopyValue,
            RightInstruction(_) => TokenKind::RightInstruction,
            LeftInstruction(_)  => TokenKind::LeftInstruction,
            MoveInstruction(_)  => TokenKind::MoveInstruction,
            Print               => TokenKind::Print,
            Function(_)         => TokenKind::Function,
            Close               => TokenKind::Close,
            Call(_)             => TokenKind::Call,
            Exit                => TokenKind::Exit,
            Greater(_, _)       => TokenKind::Greater,
            Less(_, _)          => TokenKind::Less,
            Equal(_, _)         => TokenKind::Equal,
            Unequal(_, _)       => TokenKind::Unequal,
            Set(_)              => TokenKind::Set,
            Increment(_)        => TokenKind::Increment,
            Decrement(_)        => TokenKind::Decrement,
            Multiply(_)         => TokenKind::Multiply,
        }
    }

    /// Evaluates a comparison instruction against two cell values.
    /// Returns `None` for every other instruction.
    pub fn compare(&self, lhs: Value, rhs: Value) -> Option<bool> {
        use Instruction::*;
        match self {
            Greater(_, _) => Some(lhs > rhs),
            Less(_, _)    => Some(lhs < rhs),
            Equal(_, _)   => Some(lhs == rhs),
            Unequal(_, _) => Some(lhs != rhs),
            _ => None,
        }
    }
}

/// One parsed line of a program.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    pub line: Line,
    pub params: Vec<String>,
    pub instruction: Instruction,
}

impl Node {
    /// Builds a node from the keyword token that starts a row and the tokens
    /// following it.
    pub fn new(keyword: &Token, params: &[Token]) -> Result<Node> {
        let raw: Vec<String> = params.iter().map(|token| token.content.clone()).collect();
        match Instruction::decode(keyword.kind, keyword.line, &raw) {
            Some(Ok(instruction)) => Ok(Node { line: keyword.line, params: raw, instruction }),
            Some(Err(e)) => Err(e),
            None => Err(Error::UnknownInstruction {
                line: keyword.line,
                content: keyword.content.clone(),
            }),
        }
    }

    /// Position of this node in the program's node list.
    pub fn index(&self) -> usize {
        self.line - 1
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.instruction)
    }
}

/// Checks that a name can be used as a label in generated assembly.
pub fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .map_or(false, |pattern| pattern.is_match(name))
}

fn function_name(line: Line, content: &str) -> Result<String> {
    if is_identifier(content) {
        Ok(content.to_owned())
    } else {
        Err(Error::InvalidFunctionName { line, name: content.to_owned() })
    }
}

/// Parses a decimal, `0x` hexadecimal or `0b` binary literal.
fn number(line: Line, content: &str) -> Result<i64> {
    let invalid = || Error::InvalidNumber { line, content: content.to_owned() };
    let (negative, digits) = match content.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, content),
    };

    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, digits)
    };

    // from_str_radix would take a second sign, as in "--1" or "0x-1".
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }

    match i64::from_str_radix(body, radix) {
        Ok(n) if negative => Ok(-n),
        Ok(n) => Ok(n),
        Err(_) => Err(invalid()),
    }
}

fn address(line: Line, content: &str) -> Result<Address> {
    let n = number(line, content)?;
    Address::try_from(n).map_err(|_| Error::InvalidNumber { line, content: content.to_owned() })
}

fn value(line: Line, content: &str) -> Result<Value> {
    let n = number(line, content)?;
    Value::try_from(n).map_err(|_| Error::InvalidNumber { line, content: content.to_owned() })
}

fn value_amount(line: Line, content: &str) -> Result<Value> {
    let amount = value(line, content)?;
    if amount < 1 {
        return Err(Error::InvalidAmount { line, amount: i64::from(amount) });
    }
    Ok(amount)
}

fn move_amount(line: Line, params: &[String]) -> Result<usize> {
    let content = match params.first() {
        Some(content) => content,
        None => return Ok(1),
    };
    let amount = number(line, content)?;
    if amount < 1 {
        return Err(Error::InvalidAmount { line, amount });
    }
    usize::try_from(amount).map_err(|_| Error::InvalidNumber { line, content: content.to_owned() })
}

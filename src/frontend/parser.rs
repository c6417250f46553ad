//! The Parser module takes the token rows from the lexer and converts them
//! into a validated node list.
use std::collections::VecDeque;

use super::ast::*;
use super::lexer::Token;
use crate::error::{Error, Result};

/// A function region, from its `make function` line to its `close` line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Function {
    pub name: String,
    pub begin: Line,
    pub end: Line,
}

/// A parsed and validated program.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
    /// In declaration order.
    pub functions: Vec<Function>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at a 0-based index.
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    /// Index of the first node to run: the line right after the last
    /// declared function's `close`, or the first line if there are none.
    pub fn entry_point(&self) -> usize {
        match self.functions.last() {
            // `end` is 1-based, so it is also the index of the line after it.
            Some(function) => function.end,
            None => 0,
        }
    }
}

pub struct Parser {
    rows: VecDeque<Vec<Token>>,
    nodes: Vec<Node>,
}

impl Parser {
    pub fn new(rows: Vec<Vec<Token>>) -> Self {
        let capacity = rows.len();
        Parser { rows: VecDeque::from(rows), nodes: Vec::with_capacity(capacity) }
    }

    /// Run the parser, consuming itself and returning the validated program.
    pub fn run(mut self) -> Result<Program> {
        while let Some(node) = self.instruction()? {
            self.nodes.push(node);
        }

        let functions = functions(&self.nodes)?;

        if !self.nodes.iter().any(|node| node.instruction == Instruction::Exit) {
            return Err(Error::MissingExit);
        }

        info!("parsed {} node(s) and {} function(s)", self.nodes.len(), functions.len());
        Ok(Program { nodes: self.nodes, functions })
    }

    /// Consumes one row to produce a node.
    fn instruction(&mut self) -> Result<Option<Node>> {
        loop {
            let row = match self.consume() {
                Some(row) => row,
                // No rows left to parse means we're out of instructions.
                None => return Ok(None),
            };

            match row.split_first() {
                Some((keyword, params)) => return Node::new(keyword, params).map(Some),
                None => warn!("skipping an empty token row"),
            }
        }
    }

    /// Pops a row off the input and returns it.
    /// Returns None if no rows are left.
    #[inline]
    fn consume(&mut self) -> Option<Vec<Token>> {
        self.rows.pop_front()
    }
}

/// Tokens to program, see [`Parser`].
pub fn parse(rows: Vec<Vec<Token>>) -> Result<Program> {
    Parser::new(rows).run()
}

/// Checks every function region and collects them in declaration order.
fn functions(nodes: &[Node]) -> Result<Vec<Function>> {
    let mut functions: Vec<Function> = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let name = match &node.instruction {
            Instruction::Function(name) => name,
            _ => continue,
        };

        if functions.iter().any(|function| &function.name == name) {
            return Err(Error::DuplicateFunction { line: node.line, name: name.clone() });
        }

        let mut end = None;
        for inner in &nodes[index + 1..] {
            match &inner.instruction {
                Instruction::Close => {
                    end = Some(inner.line);
                    break;
                }
                Instruction::Function(inner_name) => {
                    return Err(Error::NestedFunction {
                        line: node.line,
                        name: name.clone(),
                        inner_line: inner.line,
                        inner: inner_name.clone(),
                    });
                }
                _ => {}
            }
        }

        let end = match end {
            Some(end) => end,
            None => return Err(Error::UnterminatedFunction { line: node.line, name: name.clone() }),
        };
        if end == node.line + 1 {
            return Err(Error::EmptyFunction { line: node.line, name: name.clone() });
        }

        debug!("registered function {} (lines {}-{})", name, node.line, end);
        functions.push(Function { name: name.clone(), begin: node.line, end });
    }

    Ok(functions)
}

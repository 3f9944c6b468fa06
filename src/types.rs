//! This module defines the core data structures shared by every compilation stage: the raw IR
//! produced by the parser, the flat IR produced by macro expansion, and the error types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::Rule;

/// The blank symbol every tape cell starts with.
pub const BLANK_SYMBOL: char = '_';
/// The word used in diagram labels in place of the blank symbol.
pub const BLANK_LABEL: &str = "BLANK";
/// The maximum allowed size for a source program in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The maximum number of steps the in-process machine executes before giving up.
pub const MAX_EXECUTION_STEPS: usize = 100_000;

/// Returns `true` if `c` is a symbol the language can read or write.
pub fn is_symbol(c: char) -> bool {
    c.is_ascii_digit() || c == '*' || c == BLANK_SYMBOL
}

/// Represents the possible directions the tape head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left.
    #[serde(rename = "L")]
    Left,
    /// Move the head one cell to the right.
    #[serde(rename = "R")]
    Right,
    /// Keep the head in the same cell.
    #[serde(rename = "S")]
    Stay,
}

impl Direction {
    /// Parses the single-letter form used in source programs.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "S" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// Returns the signed head offset applied by this direction.
    pub fn offset(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Stay => "S",
        };
        f.write_str(letter)
    }
}

/// Where control goes after a raw transition fires.
///
/// `Call` and `Return` only exist before macro expansion; the flat IR has plain state names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Target {
    /// Jump to the named state.
    Goto { name: String },
    /// Inline the named macro, resuming at `ret` when the macro returns.
    Call { name: String, ret: String },
    /// Leave the enclosing macro.
    Return,
}

/// A transition as written in the source, before macro expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransition {
    pub src: String,
    pub read: char,
    pub write: char,
    pub dir: Direction,
    pub target: Target,
    /// Source line of the transition's first token.
    pub line: usize,
}

/// A named group of transitions whose first source state is the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub name: String,
    pub body: Vec<RawTransition>,
}

impl Macro {
    /// Returns the entry state of the macro, if it has any transitions.
    pub fn entry(&self) -> Option<&str> {
        self.body.first().map(|t| t.src.as_str())
    }
}

/// The `CONFIG:` section of a program.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub start: Option<String>,
    pub accept: Option<String>,
    pub reject: Option<String>,
}

/// The raw IR: metadata, macro definitions and top-level transitions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProgram {
    pub meta: Metadata,
    pub macros: BTreeMap<String, Macro>,
    pub main: Vec<RawTransition>,
}

/// A transition after macro expansion. `next` is always a concrete state name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTransition {
    pub src: String,
    pub read: char,
    pub write: char,
    pub dir: Direction,
    pub next: String,
}

/// The flat IR consumed by the code generators.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatProgram {
    pub meta: Metadata,
    pub transitions: Vec<FlatTransition>,
}

/// Represents the errors that abort a compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The source contains a character no token starts with.
    #[error("Lexical error: {0}")]
    LexError(#[from] Box<pest::error::Error<Rule>>),
    /// A token of the wrong kind or value was found.
    #[error("Syntax error: expected {expected} but got {found} at line {line}")]
    SyntaxError {
        expected: String,
        found: String,
        line: usize,
    },
    /// The program has no `MAIN:` section.
    #[error("Syntax error: missing MAIN section")]
    MissingMain,
    /// A macro name was defined more than once.
    #[error("Syntax error: duplicate macro definition '{name}' at line {line}")]
    DuplicateMacro { name: String, line: usize },
    /// The program does not name a start state.
    #[error("Semantic error: no START state defined in CONFIG")]
    MissingStart,
    /// A `CALL` names a macro that was never defined.
    #[error("Semantic error: call to undefined macro '{0}'")]
    UndefinedMacro(String),
    /// A macro has no transitions, so it has no entry state.
    #[error("Semantic error: macro '{0}' has no transitions")]
    EmptyMacro(String),
    /// A macro body calls another macro.
    #[error("Semantic error: nested macro call to '{callee}' inside macro '{caller}' at line {line} is not supported")]
    NestedMacro {
        caller: String,
        callee: String,
        line: usize,
    },
    /// The metadata handed to the code generator lacks a required state.
    #[error("Generation error: no {0} state defined")]
    MissingState(&'static str),
    /// The tape settings would make the generated simulator index outside its tape.
    #[error("Generation error: invalid tape settings: {0}")]
    InvalidOptions(String),
    /// A transition refers to a state the state table was not built with.
    #[error("Generation error: state '{0}' is not in the state table")]
    UnknownState(String),
    /// Reading or writing program files failed.
    #[error("File error: {0}")]
    FileError(String),
}

/// Represents the result of a single machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The machine performed a transition and continues execution.
    Continue,
    /// The machine has halted.
    Halt(Halt),
}

/// How a machine halted. These mirror the exit statuses of the generated C program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// The machine reached the accept state.
    Accepted,
    /// The machine reached the reject state.
    Rejected,
    /// No transition of `state` reads `symbol`.
    Crashed { state: String, symbol: char },
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Accepted => f.write_str("ACCEPTED"),
            Halt::Rejected => f.write_str("REJECTED"),
            Halt::Crashed { state, symbol } => {
                write!(f, "CRASH: state {state} has no rule for char '{symbol}'")
            }
        }
    }
}

/// Errors raised by the in-process machine that are not designed halting outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The head moved off either end of the fixed-size tape.
    #[error("Tape boundary exceeded at position {0}")]
    TapeBoundary(isize),
    /// The input does not fit on the tape to the right of the head.
    #[error("Input of {0} symbols does not fit on the tape")]
    InputTooLong(usize),
    /// The machine did not halt within the step budget.
    #[error("No halting state reached after {0} steps")]
    StepLimit(usize),
}

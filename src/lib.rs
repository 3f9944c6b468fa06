//! This crate compiles a small Turing Machine language into a standalone C simulator and a
//! Graphviz state diagram. It includes modules for tokenizing and parsing source programs,
//! expanding macros into a flat transition list, generating code, and running compiled
//! programs in-process.

pub mod analyzer;
pub mod codegen;
pub mod emitter;
pub mod lexer;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod types;

/// Re-exports the `Rule` enum generated from the `pest` grammar.
pub use crate::lexer::Rule;
/// Re-exports the expansion functions and the `Warning` enum from the analyzer module.
pub use analyzer::{expand, expand_with_warnings, Warning};
/// Re-exports the code generation structures.
pub use codegen::{CodegenOptions, Simulator};
/// Re-exports the emitters.
pub use emitter::{CEmitter, DotEmitter, Emitter};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::{Artifacts, ProgramLoader};
/// Re-exports the `TuringMachine` struct from the machine module.
pub use machine::TuringMachine;
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the IR, outcome and error types.
pub use types::{
    CompileError, Direction, FlatProgram, FlatTransition, Halt, RawProgram, RuntimeError, Step,
    Target, MAX_PROGRAM_SIZE,
};

/// Everything a successful compilation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    pub program: FlatProgram,
    /// Source of the C simulator.
    pub simulator: String,
    /// Graphviz description of the state diagram.
    pub graph: String,
    pub warnings: Vec<Warning>,
}

/// Runs the whole pipeline on a source program.
///
/// # Returns
///
/// * `Ok(Compilation)` with both artifacts rendered.
/// * `Err(CompileError)` from the first stage that failed. No partial output is returned.
pub fn compile(source: &str, options: &CodegenOptions) -> Result<Compilation, CompileError> {
    let (program, warnings) = expand_with_warnings(parse(source)?)?;

    let simulator = CEmitter::new(*options).emit(&program)?;
    let graph = DotEmitter.emit(&program)?;

    Ok(Compilation {
        program,
        simulator,
        graph,
        warnings,
    })
}

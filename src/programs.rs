use crate::analyzer::expand;
use crate::codegen::StateTable;
use crate::parser::parse;
use crate::types::{CompileError, FlatProgram};

// Default embedded programs
const PROGRAM_TEXTS: [(&str, &str); 3] = [
    ("palindrome", include_str!("../programs/palindrome.tm")),
    ("seek_blank", include_str!("../programs/seek_blank.tm")),
    (
        "binary_increment",
        include_str!("../programs/binary_increment.tm"),
    ),
];

/// A sample program shipped with the crate.
#[derive(Debug, Clone)]
pub struct EmbeddedProgram {
    pub name: &'static str,
    pub text: &'static str,
    pub program: FlatProgram,
}

lazy_static::lazy_static! {
    pub static ref PROGRAMS: Vec<EmbeddedProgram> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(name, text)| match parse(text).and_then(expand) {
            Ok(program) => Some(EmbeddedProgram { name, text, program }),
            Err(e) => {
                log::error!("Failed to compile embedded program '{name}': {e}");
                None
            }
        })
        .collect();
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<&'static EmbeddedProgram, CompileError> {
        PROGRAMS
            .get(index)
            .ok_or_else(|| CompileError::FileError(format!("Program index {} out of range", index)))
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<&'static EmbeddedProgram, CompileError> {
        PROGRAMS
            .iter()
            .find(|embedded| embedded.name == name)
            .ok_or_else(|| CompileError::FileError(format!("Program '{}' not found", name)))
    }

    /// Get the source text of a program by its name
    pub fn get_program_text(name: &str) -> Result<&'static str, CompileError> {
        Self::get_program_by_name(name).map(|embedded| embedded.text)
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        PROGRAMS
            .iter()
            .map(|embedded| embedded.name.to_string())
            .collect()
    }

    /// Get information about a program by its index
    pub fn get_program_info(index: usize) -> Result<ProgramInfo, CompileError> {
        let embedded = Self::get_program_by_index(index)?;

        Ok(ProgramInfo {
            index,
            name: embedded.name.to_string(),
            start_state: embedded.program.meta.start.clone().unwrap_or_default(),
            state_count: StateTable::build(&embedded.program).len(),
            transition_count: embedded.program.transitions.len(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub start_state: String,
    pub state_count: usize,
    pub transition_count: usize,
}

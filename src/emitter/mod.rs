//! Emitters turn a flat program into the text of one output artifact.

pub mod c;
pub mod dot;

pub use c::CEmitter;
pub use dot::{DotEmitter, Graph};

use crate::types::{CompileError, FlatProgram};

/// A code generator producing one textual artifact from the flat IR.
///
/// Emitters are pure: the same program always yields the same text, and emitters share no
/// state with each other.
pub trait Emitter {
    /// Renders the artifact.
    fn emit(&self, program: &FlatProgram) -> Result<String, CompileError>;

    /// File extension of the artifact, without the dot.
    fn extension(&self) -> &'static str;
}

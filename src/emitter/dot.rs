//! Renders a flat program as a Graphviz state diagram.
//!
//! Transitions between the same pair of states are merged into one edge whose label lists
//! every transition on its own line.

use super::Emitter;
use crate::codegen::required;
use crate::types::{CompileError, FlatProgram, FlatTransition, BLANK_LABEL, BLANK_SYMBOL};
use std::collections::HashMap;
use std::fmt;

/// A merged edge between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    pub labels: Vec<String>,
}

/// The state diagram of a flat program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub start: String,
    pub accept: String,
    pub reject: String,
    /// Edges in the order their `(src, dst)` pair first appears.
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn build(program: &FlatProgram) -> Result<Self, CompileError> {
        let start = required(&program.meta.start, "START")?;
        let accept = required(&program.meta.accept, "ACCEPT")?;
        let reject = required(&program.meta.reject, "REJECT")?;

        let mut edges: Vec<Edge> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();

        for t in &program.transitions {
            let key = (t.src.as_str(), t.next.as_str());
            let i = *index.entry(key).or_insert_with(|| {
                edges.push(Edge {
                    src: t.src.clone(),
                    dst: t.next.clone(),
                    labels: Vec::new(),
                });
                edges.len() - 1
            });
            edges[i].labels.push(edge_label(t));
        }

        Ok(Self {
            start: start.to_string(),
            accept: accept.to_string(),
            reject: reject.to_string(),
            edges,
        })
    }
}

/// Formats `read / write, dir`, spelling the blank symbol as `BLANK`.
pub fn edge_label(t: &FlatTransition) -> String {
    format!("{} / {}, {}", symbol_label(t.read), symbol_label(t.write), t.dir)
}

fn symbol_label(symbol: char) -> String {
    if symbol == BLANK_SYMBOL {
        BLANK_LABEL.to_string()
    } else {
        symbol.to_string()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph TuringMachine {{")?;
        writeln!(f, "    rankdir=LR;")?;
        writeln!(f, "    node [shape = circle];")?;
        writeln!(
            f,
            "    \"{}\" [shape = doublecircle, color=green];",
            self.accept
        )?;
        writeln!(f, "    \"{}\" [shape = doublecircle, color=red];", self.reject)?;
        writeln!(f, "    entry [shape = point];")?;
        writeln!(f, "    entry -> \"{}\";", self.start)?;

        for edge in &self.edges {
            writeln!(
                f,
                "    \"{}\" -> \"{}\" [label = \"{}\"];",
                edge.src,
                edge.dst,
                edge.labels.join("\\n")
            )?;
        }

        writeln!(f, "}}")
    }
}

/// Emits the Graphviz description.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotEmitter;

impl Emitter for DotEmitter {
    fn emit(&self, program: &FlatProgram) -> Result<String, CompileError> {
        Ok(Graph::build(program)?.to_string())
    }

    fn extension(&self) -> &'static str {
        "dot"
    }
}

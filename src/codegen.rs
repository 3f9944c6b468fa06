//! This module lowers a flat program into the structures the emitters render: a sorted state
//! table with dense ids and a dispatch table grouping transitions by source state.

use crate::types::{CompileError, Direction, FlatProgram, Metadata};
use std::collections::{BTreeMap, BTreeSet};

/// Tunables of the generated simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Number of cells on the tape.
    pub tape_size: usize,
    /// Cell the head starts on, and where the input is written from.
    pub head_start: usize,
    /// Number of cells printed on each side of the head.
    pub window: usize,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            tape_size: 20000,
            head_start: 10000,
            window: 10,
        }
    }
}

impl CodegenOptions {
    /// Checks that the initial tape window and head position lie inside the tape.
    ///
    /// The window printed before the first transition spans
    /// `head_start - window ..= head_start + window`, so it must fit on both sides.
    pub fn validate(&self) -> Result<(), CompileError> {
        let Self {
            tape_size,
            head_start,
            window,
        } = *self;

        if head_start >= tape_size {
            return Err(CompileError::InvalidOptions(format!(
                "head start {head_start} must be less than tape size {tape_size}"
            )));
        }
        if window > head_start {
            return Err(CompileError::InvalidOptions(format!(
                "window {window} must not exceed head start {head_start}"
            )));
        }
        if head_start + window >= tape_size {
            return Err(CompileError::InvalidOptions(format!(
                "head start {head_start} plus window {window} must be less than tape size {tape_size}"
            )));
        }

        Ok(())
    }
}

/// Maps state names to dense ids in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTable {
    names: Vec<String>,
}

impl StateTable {
    /// Collects `start`, `accept`, `reject` and every `src`/`next` of the program.
    pub fn build(program: &FlatProgram) -> Self {
        let Metadata {
            start,
            accept,
            reject,
        } = &program.meta;

        let names: BTreeSet<&str> = [start, accept, reject]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .chain(
                program
                    .transitions
                    .iter()
                    .flat_map(|t| [t.src.as_str(), t.next.as_str()]),
            )
            .collect();

        Self {
            names: names.into_iter().map(String::from).collect(),
        }
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    fn require(&self, name: &str) -> Result<usize, CompileError> {
        self.id(name)
            .ok_or_else(|| CompileError::UnknownState(name.to_string()))
    }
}

/// One conditional branch of a state's dispatch: `if (read_val == read) { ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arm {
    pub read: char,
    pub write: char,
    pub dir: Direction,
    pub next: usize,
}

/// All arms of one source state, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub state: usize,
    pub arms: Vec<Arm>,
}

/// Transitions grouped by source state id. Cases are ordered by id; arms keep the relative
/// order of the flat transitions they come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    cases: Vec<Case>,
}

impl DispatchTable {
    pub fn build(program: &FlatProgram, states: &StateTable) -> Result<Self, CompileError> {
        let mut grouped: BTreeMap<usize, Vec<Arm>> = BTreeMap::new();

        for t in &program.transitions {
            let arm = Arm {
                read: t.read,
                write: t.write,
                dir: t.dir,
                next: states.require(&t.next)?,
            };
            grouped.entry(states.require(&t.src)?).or_default().push(arm);
        }

        Ok(Self {
            cases: grouped
                .into_iter()
                .map(|(state, arms)| Case { state, arms })
                .collect(),
        })
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn case(&self, state: usize) -> Option<&Case> {
        self.cases
            .binary_search_by_key(&state, |case| case.state)
            .ok()
            .map(|i| &self.cases[i])
    }

    /// Returns the first arm of `state` reading `symbol`.
    pub fn lookup(&self, state: usize, symbol: char) -> Option<&Arm> {
        self.case(state)?.arms.iter().find(|arm| arm.read == symbol)
    }
}

/// The complete description of a generated simulator, independent of the target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    pub states: StateTable,
    pub start: usize,
    pub accept: usize,
    pub reject: usize,
    pub dispatch: DispatchTable,
    pub options: CodegenOptions,
}

impl Simulator {
    /// Builds the simulator for a flat program.
    ///
    /// # Returns
    ///
    /// * `Ok(Simulator)` if the metadata names all of start, accept and reject.
    /// * `Err(CompileError::MissingState)` naming the first missing one otherwise.
    /// * `Err(CompileError::InvalidOptions)` if the tape settings do not fit the tape.
    pub fn build(program: &FlatProgram, options: CodegenOptions) -> Result<Self, CompileError> {
        options.validate()?;

        let start = required(&program.meta.start, "START")?;
        let accept = required(&program.meta.accept, "ACCEPT")?;
        let reject = required(&program.meta.reject, "REJECT")?;

        let states = StateTable::build(program);
        let dispatch = DispatchTable::build(program, &states)?;
        log::debug!(
            "Built dispatch table: {} state(s), {} case(s)",
            states.len(),
            dispatch.cases().len()
        );

        Ok(Self {
            start: states.require(start)?,
            accept: states.require(accept)?,
            reject: states.require(reject)?,
            states,
            dispatch,
            options,
        })
    }

    /// Returns the name of a state id, or `"?"` for ids outside the table.
    pub fn state_name(&self, id: usize) -> &str {
        self.states.name(id).unwrap_or("?")
    }
}

pub(crate) fn required<'a>(
    state: &'a Option<String>,
    role: &'static str,
) -> Result<&'a str, CompileError> {
    state.as_deref().ok_or(CompileError::MissingState(role))
}

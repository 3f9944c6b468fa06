//! This module defines the `TuringMachine` struct, which executes a compiled [`Simulator`]
//! in-process with the same semantics as the generated C program: a fixed-size tape, a head
//! starting at `head_start`, accept and reject checks before every lookup, and a crash when
//! no rule matches.

use crate::codegen::Simulator;
use crate::types::{Halt, RuntimeError, Step, BLANK_SYMBOL, MAX_EXECUTION_STEPS};

/// Represents a single-tape Turing Machine running a compiled simulator.
pub struct TuringMachine<'a> {
    simulator: &'a Simulator,
    tape: Vec<char>,
    head: usize,
    state: usize,
    step_count: usize,
}

impl<'a> TuringMachine<'a> {
    /// Creates a machine with `input` written on the tape starting at the head.
    ///
    /// # Returns
    ///
    /// * `Ok(TuringMachine)` if the input fits on the tape.
    /// * `Err(RuntimeError::InputTooLong)` if it runs past the end of the tape.
    /// * `Err(RuntimeError::TapeBoundary)` if the head starts outside the tape.
    pub fn new(simulator: &'a Simulator, input: &str) -> Result<Self, RuntimeError> {
        let options = simulator.options;
        if options.head_start >= options.tape_size {
            return Err(RuntimeError::TapeBoundary(options.head_start as isize));
        }

        let symbols: Vec<char> = input.chars().collect();
        if options.head_start + symbols.len() > options.tape_size {
            return Err(RuntimeError::InputTooLong(symbols.len()));
        }

        let mut tape = vec![BLANK_SYMBOL; options.tape_size];
        tape[options.head_start..options.head_start + symbols.len()].copy_from_slice(&symbols);

        Ok(Self {
            simulator,
            tape,
            head: options.head_start,
            state: simulator.start,
            step_count: 0,
        })
    }

    /// Executes a single step.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Halt(_))` if the machine is in the accept or reject state, or no rule of
    ///   the current state reads the scanned symbol.
    /// * `Ok(Step::Continue)` after a transition fired.
    /// * `Err(RuntimeError::TapeBoundary)` if the transition moved the head off the tape.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        if self.state == self.simulator.accept {
            return Ok(Step::Halt(Halt::Accepted));
        }
        if self.state == self.simulator.reject {
            return Ok(Step::Halt(Halt::Rejected));
        }

        let symbol = self.symbol();
        let Some(arm) = self.simulator.dispatch.lookup(self.state, symbol) else {
            return Ok(Step::Halt(Halt::Crashed {
                state: self.state().to_string(),
                symbol,
            }));
        };

        self.tape[self.head] = arm.write;

        let position = self.head as isize + arm.dir.offset();
        if position < 0 || position as usize >= self.tape.len() {
            return Err(RuntimeError::TapeBoundary(position));
        }
        self.head = position as usize;
        self.state = arm.next;
        self.step_count += 1;

        Ok(Step::Continue)
    }

    /// Runs the machine until it halts or exceeds the step budget.
    pub fn run(&mut self) -> Result<Halt, RuntimeError> {
        loop {
            if let Step::Halt(halt) = self.step()? {
                log::debug!("Machine halted after {} steps: {halt}", self.step_count);
                return Ok(halt);
            }
            if self.step_count >= MAX_EXECUTION_STEPS {
                return Err(RuntimeError::StepLimit(MAX_EXECUTION_STEPS));
            }
        }
    }

    /// Returns the name of the current state.
    pub fn state(&self) -> &str {
        self.simulator.state_name(self.state)
    }

    pub fn state_id(&self) -> usize {
        self.state
    }

    /// Returns the symbol under the head.
    pub fn symbol(&self) -> char {
        self.tape[self.head]
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Returns the head position relative to where it started.
    pub fn position(&self) -> isize {
        self.head as isize - self.simulator.options.head_start as isize
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn tape(&self) -> &[char] {
        &self.tape
    }

    /// Returns the tape contents between the first and last non-blank cells.
    pub fn contents(&self) -> String {
        let used = |c: &char| *c != BLANK_SYMBOL;
        match (
            self.tape.iter().position(used),
            self.tape.iter().rposition(used),
        ) {
            (Some(first), Some(last)) => self.tape[first..=last].iter().collect(),
            _ => String::new(),
        }
    }

    /// Renders the cells around the head the way the generated program prints them.
    ///
    /// `[  _  1 [0] 1  _  ]` for a window of 2. Cells outside the tape print as blank.
    pub fn window(&self) -> String {
        let radius = self.simulator.options.window as isize;
        let head = self.head as isize;

        let mut line = String::from("[ ");
        for i in head - radius..=head + radius {
            let cell = usize::try_from(i)
                .ok()
                .and_then(|i| self.tape.get(i))
                .copied()
                .unwrap_or(BLANK_SYMBOL);
            if i == head {
                line.push_str(&format!("[{cell}]"));
            } else {
                line.push_str(&format!(" {cell} "));
            }
        }
        line.push_str(" ]");
        line
    }
}

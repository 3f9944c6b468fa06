//! Renders a [`Simulator`] as a self-contained C program.
//!
//! The generated program keeps a fixed-size tape and does not bounds-check head movement.

use super::Emitter;
use crate::codegen::{Arm, CodegenOptions, Simulator};
use crate::types::{CompileError, Direction, FlatProgram};
use std::fmt;

/// Exit status of the generated program when the input is accepted.
pub const EXIT_ACCEPTED: i32 = 0;
/// Exit status of the generated program when the input is rejected.
pub const EXIT_REJECTED: i32 = 1;
/// Exit status of the generated program when no rule matches the scanned symbol.
pub const EXIT_CRASHED: i32 = 2;

/// Emits the C simulator source.
#[derive(Debug, Clone, Default)]
pub struct CEmitter {
    pub options: CodegenOptions,
}

impl CEmitter {
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }
}

impl Emitter for CEmitter {
    fn emit(&self, program: &FlatProgram) -> Result<String, CompileError> {
        let simulator = Simulator::build(program, self.options)?;
        Ok(CSource(&simulator).to_string())
    }

    fn extension(&self) -> &'static str {
        "c"
    }
}

/// Display adapter printing a simulator as C source.
pub struct CSource<'a>(pub &'a Simulator);

impl fmt::Display for CSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sim = self.0;
        let CodegenOptions {
            tape_size,
            head_start,
            window,
        } = sim.options;

        writeln!(f, "#include <stdio.h>")?;
        writeln!(f, "#include <stdlib.h>")?;
        writeln!(f, "#include <string.h>")?;
        writeln!(f)?;
        writeln!(f, "#define TAPE_SIZE {tape_size}")?;
        writeln!(f, "#define HEAD_START {head_start}")?;
        writeln!(f, "#define WINDOW {window}")?;
        writeln!(f)?;

        writeln!(f, "/* --- STATE MAP ---")?;
        for (id, name) in sim.states.iter() {
            writeln!(f, "// {name}: {id}")?;
        }
        writeln!(f, "*/")?;
        writeln!(f)?;

        writeln!(f, "static const char *STATE_NAMES[] = {{")?;
        for (_, name) in sim.states.iter() {
            writeln!(f, "    \"{name}\",")?;
        }
        writeln!(f, "}};")?;
        writeln!(f)?;

        writeln!(f, "int current_state = {};", sim.start)?;
        writeln!(f, "int ACCEPT_STATE = {};", sim.accept)?;
        writeln!(f, "int REJECT_STATE = {};", sim.reject)?;
        writeln!(f)?;
        writeln!(f, "char tape[TAPE_SIZE];")?;
        writeln!(f, "int head = HEAD_START;")?;
        writeln!(f)?;

        f.write_str(PRINT_TAPE)?;
        f.write_str(&main_prologue())?;

        for case in sim.dispatch.cases() {
            writeln!(
                f,
                "            case {}: /* {} */",
                case.state,
                sim.state_name(case.state)
            )?;
            for (i, arm) in case.arms.iter().enumerate() {
                write_arm(f, arm, i == 0)?;
            }
            writeln!(f, "                break;")?;
        }

        write!(f, "{}", main_epilogue())
    }
}

fn write_arm(f: &mut fmt::Formatter<'_>, arm: &Arm, first: bool) -> fmt::Result {
    let keyword = if first { "if" } else { "else if" };

    writeln!(f, "                {keyword} (read_val == '{}') {{", arm.read)?;
    writeln!(f, "                    tape[head] = '{}';", arm.write)?;
    match arm.dir {
        Direction::Left => writeln!(f, "                    head--;")?,
        Direction::Right => writeln!(f, "                    head++;")?,
        Direction::Stay => {}
    }
    writeln!(f, "                    current_state = {};", arm.next)?;
    writeln!(f, "                    matched = 1;")?;
    writeln!(f, "                }}")
}

const PRINT_TAPE: &str = r#"void print_tape() {
    printf("\r[ ");
    for (int i = head - WINDOW; i <= head + WINDOW; i++) {
        if (i == head) printf("[%c]", tape[i]);
        else printf(" %c ", tape[i]);
    }
    printf(" ] Head: %d State: %d (%s)  ", head - HEAD_START, current_state, STATE_NAMES[current_state]);
    fflush(stdout);
}

"#;

fn main_prologue() -> String {
    format!(
        r#"int main(int argc, char **argv) {{
    memset(tape, '_', TAPE_SIZE);

    char buffer[256];
    const char *input = "";
    if (argc > 1) {{
        input = argv[1];
    }} else {{
        printf("Enter Input: ");
        if (scanf("%255s", buffer) == 1) input = buffer;
    }}

    size_t length = strlen(input);
    for (size_t i = 0; i < length; i++) {{
        tape[head + i] = input[i];
    }}

    printf("\n--- RUNNING ---\n");

    while (1) {{
        print_tape();

        if (current_state == ACCEPT_STATE) {{ printf("\n\nACCEPTED!\n"); return {EXIT_ACCEPTED}; }}
        if (current_state == REJECT_STATE) {{ printf("\n\nREJECTED!\n"); return {EXIT_REJECTED}; }}

        char read_val = tape[head];
        int matched = 0;

        switch (current_state) {{
"#
    )
}

fn main_epilogue() -> String {
    format!(
        r#"        }} /* End Switch */

        if (!matched) {{
            printf("\n\nCRASH: State %d (%s) has no rule for char '%c'\n", current_state, STATE_NAMES[current_state], read_val);
            return {EXIT_CRASHED};
        }}
    }}
}}
"#
    )
}

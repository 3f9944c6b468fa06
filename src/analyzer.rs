//! This module provides the semantic analysis pass: it validates the raw IR and expands every
//! macro call into a private, renamed copy of the macro body, producing the flat IR.
//!
//! Each call site gets its own instance id, so calling a macro twice yields two disjoint
//! sets of states, and each copy returns to the state named at its own call site.

use crate::types::{
    CompileError, FlatProgram, FlatTransition, Macro, RawProgram, RawTransition, Target,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Non-fatal findings about a flat program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A metadata state (`START`, `ACCEPT` or `REJECT`) appears in no transition.
    /// The simulator still enumerates it; reaching it without a rule crashes at runtime.
    UnusedMetadataState { role: &'static str, state: String },
    /// A top-level `RETURN` has nowhere to return to and is dropped.
    TopLevelReturn { state: String, line: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnusedMetadataState { role, state } => {
                write!(f, "{role} state '{state}' does not appear in any transition")
            }
            Warning::TopLevelReturn { state, line } => write!(
                f,
                "RETURN from state '{state}' at line {line} is outside a macro and was ignored"
            ),
        }
    }
}

/// Expands the macros of a raw program into a flat program.
///
/// # Returns
///
/// * `Ok(FlatProgram)` whose transitions only jump to concrete state names.
/// * `Err(CompileError::MissingStart)` if the program has no start state.
/// * `Err(CompileError::UndefinedMacro)`, `Err(CompileError::EmptyMacro)` or
///   `Err(CompileError::NestedMacro)` if a call site cannot be expanded.
pub fn expand(program: RawProgram) -> Result<FlatProgram, CompileError> {
    expand_with_warnings(program).map(|(flat, _)| flat)
}

/// Same as [`expand`], also returning the warnings collected along the way.
pub fn expand_with_warnings(
    program: RawProgram,
) -> Result<(FlatProgram, Vec<Warning>), CompileError> {
    if program.meta.start.is_none() {
        return Err(CompileError::MissingStart);
    }

    let mut expander = Expander::new(&program.macros);
    for transition in &program.main {
        expander.visit(transition)?;
    }

    let Expander {
        transitions,
        warnings,
        instances,
        ..
    } = expander;
    log::debug!(
        "Expanded {} macro instance(s) into {} flat transition(s)",
        instances,
        transitions.len()
    );

    let flat = FlatProgram {
        meta: program.meta,
        transitions,
    };
    let mut warnings = warnings;
    warnings.extend(check_metadata_states(&flat));
    for warning in &warnings {
        log::warn!("{warning}");
    }

    Ok((flat, warnings))
}

/// Reports metadata states that no flat transition mentions as a source or a target.
pub fn check_metadata_states(program: &FlatProgram) -> Vec<Warning> {
    let referenced: HashSet<&str> = program
        .transitions
        .iter()
        .flat_map(|t| [t.src.as_str(), t.next.as_str()])
        .collect();

    [
        ("START", &program.meta.start),
        ("ACCEPT", &program.meta.accept),
        ("REJECT", &program.meta.reject),
    ]
    .into_iter()
    .filter_map(|(role, state)| state.as_ref().map(|state| (role, state)))
    .filter(|(_, state)| !referenced.contains(state.as_str()))
    .map(|(role, state)| Warning::UnusedMetadataState {
        role,
        state: state.clone(),
    })
    .collect()
}

/// Holds the state of one expansion run. The instance counter lives here, so independent
/// compilations never share ids.
struct Expander<'a> {
    macros: &'a BTreeMap<String, Macro>,
    instances: usize,
    transitions: Vec<FlatTransition>,
    warnings: Vec<Warning>,
}

impl<'a> Expander<'a> {
    fn new(macros: &'a BTreeMap<String, Macro>) -> Self {
        Self {
            macros,
            instances: 0,
            transitions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Rewrites one top-level transition.
    fn visit(&mut self, transition: &RawTransition) -> Result<(), CompileError> {
        match &transition.target {
            Target::Goto { name } => {
                self.emit(transition, transition.src.clone(), name.clone());
                Ok(())
            }
            Target::Call { name, ret } => self.inline(transition, name, ret),
            Target::Return => {
                self.warnings.push(Warning::TopLevelReturn {
                    state: transition.src.clone(),
                    line: transition.line,
                });
                Ok(())
            }
        }
    }

    /// Emits the bridge transition and a renamed copy of the macro body.
    fn inline(
        &mut self,
        call_site: &RawTransition,
        name: &str,
        ret: &str,
    ) -> Result<(), CompileError> {
        let macros = self.macros;
        let macro_def = macros
            .get(name)
            .ok_or_else(|| CompileError::UndefinedMacro(name.to_string()))?;
        let entry = macro_def
            .entry()
            .ok_or_else(|| CompileError::EmptyMacro(name.to_string()))?;

        self.instances += 1;
        let prefix = format!("{}_{}_", name, self.instances);
        log::info!("Expanding macro '{name}' as '{prefix}' (returns to '{ret}')");

        self.emit(call_site, call_site.src.clone(), format!("{prefix}{entry}"));

        for body in &macro_def.body {
            let next = match &body.target {
                Target::Goto { name } => format!("{prefix}{name}"),
                Target::Return => ret.to_string(),
                Target::Call { name: callee, .. } => {
                    return Err(CompileError::NestedMacro {
                        caller: name.to_string(),
                        callee: callee.clone(),
                        line: body.line,
                    })
                }
            };
            self.emit(body, format!("{prefix}{}", body.src), next);
        }

        Ok(())
    }

    fn emit(&mut self, transition: &RawTransition, src: String, next: String) {
        self.transitions.push(FlatTransition {
            src,
            read: transition.read,
            write: transition.write,
            dir: transition.dir,
            next,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::{Direction, Metadata};

    fn flat(src: &str, read: char, write: char, dir: Direction, next: &str) -> FlatTransition {
        FlatTransition {
            src: src.into(),
            read,
            write,
            dir,
            next: next.into(),
        }
    }

    fn program(body: &str) -> RawProgram {
        parse(&format!(
            "CONFIG: START: q0 ACCEPT: done REJECT: fail\n{body}"
        ))
        .unwrap()
    }

    #[test]
    fn test_expand_goto_only() {
        let raw = program("MAIN:\n q0, 1 -> 0, R, done");
        let flat_program = expand(raw).unwrap();

        assert_eq!(
            flat_program.transitions,
            vec![flat("q0", '1', '0', Direction::Right, "done")]
        );
        assert_eq!(flat_program.meta.start.as_deref(), Some("q0"));
    }

    #[test]
    fn test_expand_seek_blank() {
        let raw = program(
            r#"
MACROS:
    DEF seek_blank:
        q0, 0 -> 1, R, q0
        q0, _ -> _, S, RETURN
MAIN:
    q0, 1 -> 0, R, CALL seek_blank -> done
"#,
        );

        let flat_program = expand(raw).unwrap();
        assert_eq!(
            flat_program.transitions,
            vec![
                flat("q0", '1', '0', Direction::Right, "seek_blank_1_q0"),
                flat("seek_blank_1_q0", '0', '1', Direction::Right, "seek_blank_1_q0"),
                flat("seek_blank_1_q0", '_', '_', Direction::Stay, "done"),
            ]
        );
    }

    #[test]
    fn test_expand_isolates_call_sites() {
        let raw = program(
            r#"
MACROS:
    DEF walk:
        a, 0 -> 0, R, b
        b, 0 -> 0, R, a
        b, _ -> _, L, RETURN
MAIN:
    q0, 0 -> 0, S, CALL walk -> q1
    q1, 1 -> 1, S, CALL walk -> done
"#,
        );

        let transitions = expand(raw).unwrap().transitions;
        assert_eq!(transitions.len(), 8);

        let first: HashSet<_> = transitions[1..4].iter().map(|t| t.src.clone()).collect();
        let second: HashSet<_> = transitions[5..8].iter().map(|t| t.src.clone()).collect();
        assert!(first.iter().all(|s| s.starts_with("walk_1_")));
        assert!(second.iter().all(|s| s.starts_with("walk_2_")));
        assert!(first.is_disjoint(&second));

        // Bridges enter each instance at its own renamed entry state.
        assert_eq!(transitions[0].next, "walk_1_a");
        assert_eq!(transitions[4].next, "walk_2_a");
        assert_eq!(transitions[2].next, "walk_1_a");

        // Each RETURN goes back to its own call site's return state.
        assert_eq!(transitions[3].next, "q1");
        assert_eq!(transitions[7].next, "done");
    }

    #[test]
    fn test_instance_ids_are_shared_across_macros() {
        let raw = program(
            r#"
MACROS:
    DEF a:
        x, 0 -> 0, R, RETURN
    DEF b:
        x, 0 -> 0, L, RETURN
MAIN:
    q0, 0 -> 0, S, CALL b -> q1
    q1, 0 -> 0, S, CALL a -> q2
    q2, 0 -> 0, S, CALL b -> done
"#,
        );

        let transitions = expand(raw).unwrap().transitions;
        let bridges: Vec<_> = transitions.iter().step_by(2).map(|t| t.next.as_str()).collect();
        assert_eq!(bridges, vec!["b_1_x", "a_2_x", "b_3_x"]);
    }

    #[test]
    fn test_expand_leaves_no_symbolic_targets() {
        let raw = program(
            r#"
MACROS:
    DEF m:
        s, 0 -> 0, R, t
        t, _ -> _, S, RETURN
MAIN:
    q0, 0 -> 1, R, CALL m -> q1
    q1, 1 -> 1, L, done
"#,
        );
        let macro_names: Vec<_> = raw.macros.keys().cloned().collect();

        let transitions = expand(raw).unwrap().transitions;
        for t in &transitions {
            assert!(!t.next.is_empty());
            assert!(!macro_names.contains(&t.next));
        }
    }

    #[test]
    fn test_expand_is_deterministic() {
        let source = r#"
MACROS:
    DEF m:
        s, 0 -> 0, R, s
        s, _ -> _, S, RETURN
MAIN:
    q0, 0 -> 1, R, CALL m -> q1
    q1, 1 -> 1, L, CALL m -> done
"#;
        assert_eq!(expand(program(source)), expand(program(source)));
    }

    #[test]
    fn test_missing_start() {
        let mut raw = program("MAIN:\n q0, 1 -> 0, R, done");
        raw.meta.start = None;

        assert_eq!(expand(raw).unwrap_err(), CompileError::MissingStart);
    }

    #[test]
    fn test_undefined_macro() {
        let raw = program("MAIN:\n q0, 1 -> 0, R, CALL nowhere -> done");
        let error = expand(raw).unwrap_err();

        assert_eq!(error, CompileError::UndefinedMacro("nowhere".into()));
        assert!(error.to_string().contains("nowhere"));
    }

    #[test]
    fn test_nested_macro() {
        let raw = program(
            r#"
MACROS:
    DEF inner:
        s, 0 -> 0, R, RETURN
    DEF outer:
        s, 0 -> 0, R, CALL inner -> s
MAIN:
    q0, 0 -> 0, S, CALL outer -> done
"#,
        );

        assert_eq!(
            expand(raw).unwrap_err(),
            CompileError::NestedMacro {
                caller: "outer".into(),
                callee: "inner".into(),
                line: 7,
            }
        );
    }

    #[test]
    fn test_empty_macro() {
        let mut raw = program("MAIN:\n q0, 1 -> 0, R, CALL m -> done");
        raw.macros.insert(
            "m".into(),
            Macro {
                name: "m".into(),
                body: vec![],
            },
        );

        assert_eq!(
            expand(raw).unwrap_err(),
            CompileError::EmptyMacro("m".into())
        );
    }

    #[test]
    fn test_top_level_return_is_dropped() {
        let raw = program("MAIN:\n q0, 1 -> 0, R, RETURN\n q0, 0 -> 0, R, done");
        let (flat_program, warnings) = expand_with_warnings(raw).unwrap();

        assert_eq!(
            flat_program.transitions,
            vec![flat("q0", '0', '0', Direction::Right, "done")]
        );
        assert!(warnings.contains(&Warning::TopLevelReturn {
            state: "q0".into(),
            line: 3,
        }));
    }

    #[test]
    fn test_check_metadata_states() {
        let program = FlatProgram {
            meta: Metadata {
                start: Some("q0".into()),
                accept: Some("done".into()),
                reject: Some("fail".into()),
            },
            transitions: vec![flat("q0", '1', '0', Direction::Right, "done")],
        };

        let warnings = check_metadata_states(&program);
        assert_eq!(
            warnings,
            vec![Warning::UnusedMetadataState {
                role: "REJECT",
                state: "fail".into(),
            }]
        );
        assert_eq!(
            warnings[0].to_string(),
            "REJECT state 'fail' does not appear in any transition"
        );
    }
}

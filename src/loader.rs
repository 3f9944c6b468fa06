//! This module provides the `ProgramLoader` struct, responsible for reading source programs
//! from disk, compiling them, and writing the generated artifacts.

use crate::analyzer::expand;
use crate::codegen::CodegenOptions;
use crate::parser::parse;
use crate::types::{CompileError, FlatProgram, MAX_PROGRAM_SIZE};
use crate::{compile, Compilation};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of source programs.
pub const SOURCE_EXTENSION: &str = "tm";

/// Paths of the files written by [`ProgramLoader::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub c: PathBuf,
    pub dot: PathBuf,
    pub ir: Option<PathBuf>,
    pub compilation: Compilation,
}

/// `ProgramLoader` is a utility struct for loading and building source programs.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Reads a source file, refusing files larger than [`MAX_PROGRAM_SIZE`].
    pub fn read_source(path: &Path) -> Result<String, CompileError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CompileError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if content.len() > MAX_PROGRAM_SIZE {
            return Err(CompileError::FileError(format!(
                "Program {} is {} bytes, the limit is {}",
                path.display(),
                content.len(),
                MAX_PROGRAM_SIZE
            )));
        }

        Ok(content)
    }

    /// Loads a source program and expands it into the flat IR.
    ///
    /// # Returns
    ///
    /// * `Ok(FlatProgram)` if the file is read, parsed and expanded.
    /// * `Err(CompileError::FileError)` if the file cannot be read or is too large.
    /// * Any other `Err(CompileError)` from parsing or expansion.
    pub fn load_program(path: &Path) -> Result<FlatProgram, CompileError> {
        let content = Self::read_source(path)?;
        expand(parse(&content)?)
    }

    /// Compiles `path` and writes `<stem>.c`, `<stem>.dot` and, with `emit_ir`, the flat IR
    /// as `<stem>.ir.json` into `out_dir`.
    ///
    /// Every artifact is generated before the first file is written, so a failed compilation
    /// leaves `out_dir` untouched. If writing one artifact fails, the artifacts already
    /// written by this call are removed again.
    pub fn build(
        path: &Path,
        out_dir: &Path,
        options: &CodegenOptions,
        emit_ir: bool,
    ) -> Result<Artifacts, CompileError> {
        let content = Self::read_source(path)?;
        let compilation = compile(&content, options)?;

        let ir = if emit_ir {
            Some(serde_json::to_string_pretty(&compilation.program).map_err(|e| {
                CompileError::FileError(format!("Failed to serialize IR: {e}"))
            })?)
        } else {
            None
        };

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                CompileError::FileError(format!("Invalid program file name {}", path.display()))
            })?;

        fs::create_dir_all(out_dir).map_err(|e| {
            CompileError::FileError(format!(
                "Failed to create directory {}: {}",
                out_dir.display(),
                e
            ))
        })?;

        let c = out_dir.join(format!("{stem}.c"));
        let dot = out_dir.join(format!("{stem}.dot"));
        let ir = ir.map(|json| (out_dir.join(format!("{stem}.ir.json")), json));

        let mut files = vec![
            (&c, compilation.simulator.as_str()),
            (&dot, compilation.graph.as_str()),
        ];
        if let Some((ir_path, json)) = &ir {
            files.push((ir_path, json.as_str()));
        }
        write_all(&files)?;

        log::info!("Built {} into {}", path.display(), out_dir.display());

        Ok(Artifacts {
            c,
            dot,
            ir: ir.map(|(ir_path, _)| ir_path),
            compilation,
        })
    }

    /// Loads every source program (`.tm` extension) in a directory.
    ///
    /// Directories and files with other extensions are skipped. Each loaded file yields
    /// either its path and flat IR or the error that stopped it.
    pub fn load_programs(
        directory: &Path,
    ) -> Vec<Result<(PathBuf, FlatProgram), CompileError>> {
        if !directory.exists() {
            return vec![Err(CompileError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(CompileError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => results.push(Err(CompileError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }

        // read_dir order is platform dependent
        paths.sort();

        results.extend(
            paths
                .into_iter()
                .filter(|path| {
                    path.is_file()
                        && path
                            .extension()
                            .is_some_and(|ext| ext == SOURCE_EXTENSION)
                })
                .map(|path| Self::load_program(&path).map(|program| (path, program))),
        );

        results
    }
}

/// Writes every file in order. On the first failure the files written so far are removed.
fn write_all(files: &[(&PathBuf, &str)]) -> Result<(), CompileError> {
    for (i, (path, content)) in files.iter().enumerate() {
        if let Err(e) = write(path, content) {
            for (written, _) in &files[..i] {
                if let Err(cleanup) = fs::remove_file(written) {
                    log::warn!("Failed to remove {}: {}", written.display(), cleanup);
                }
            }
            return Err(e);
        }
    }

    Ok(())
}

fn write(path: &Path, content: &str) -> Result<(), CompileError> {
    fs::write(path, content).map_err(|e| {
        CompileError::FileError(format!("Failed to write file {}: {}", path.display(), e))
    })
}

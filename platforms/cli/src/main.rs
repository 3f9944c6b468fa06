use clap::{ArgAction, Args, Parser, Subcommand};
use std::error::Error;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{self, ExitCode};
use tmlang::emitter::c::{EXIT_ACCEPTED, EXIT_CRASHED, EXIT_REJECTED};
use tmlang::loader::ProgramLoader;
use tmlang::machine::TuringMachine;
use tmlang::programs::ProgramManager;
use tmlang::types::MAX_EXECUTION_STEPS;
use tmlang::{compile, CodegenOptions, Halt, RuntimeError, Simulator, Step};

/// Exit status for compile, file and runtime errors.
const EXIT_FAILED: u8 = 3;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a program into a C simulator and a Graphviz diagram
    Build {
        /// The program file to compile
        file: PathBuf,

        /// Directory the artifacts are written to
        #[clap(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Also render the diagram to SVG with Graphviz `dot`
        #[clap(long)]
        svg: bool,

        /// Also write the flat IR as JSON
        #[clap(long)]
        emit_ir: bool,

        #[clap(flatten)]
        options: OptionArgs,
    },
    /// Run a program in-process
    Run {
        /// The program file to run; read from stdin when omitted and stdin is piped
        file: Option<PathBuf>,

        /// Run one of the embedded programs instead of a file
        #[clap(short, long, conflicts_with = "file")]
        example: Option<String>,

        /// The input written on the tape
        #[clap(short, long, default_value = "")]
        input: String,

        /// Print the tape window and state after each step
        #[clap(short = 'd', long)]
        trace: bool,

        #[clap(flatten)]
        options: OptionArgs,
    },
    /// List the embedded programs
    List,
}

#[derive(Args)]
struct OptionArgs {
    /// Number of tape cells
    #[clap(long)]
    tape_size: Option<usize>,

    /// Cell the head starts on
    #[clap(long)]
    head_start: Option<usize>,

    /// Cells printed on each side of the head
    #[clap(long)]
    window: Option<usize>,
}

impl OptionArgs {
    fn resolve(&self) -> CodegenOptions {
        let defaults = CodegenOptions::default();
        CodegenOptions {
            tape_size: self.tape_size.unwrap_or(defaults.tape_size),
            head_start: self.head_start.unwrap_or(defaults.head_start),
            window: self.window.unwrap_or(defaults.window),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .parse_default_env()
        .init();

    let result = match cli.command {
        Command::Build {
            file,
            out_dir,
            svg,
            emit_ir,
            options,
        } => build(&file, &out_dir, svg, emit_ir, &options.resolve()),
        Command::Run {
            file,
            example,
            input,
            trace,
            options,
        } => run(file.as_deref(), example.as_deref(), &input, trace, &options.resolve()),
        Command::List => list(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn build(
    file: &Path,
    out_dir: &Path,
    svg: bool,
    emit_ir: bool,
    options: &CodegenOptions,
) -> Result<ExitCode, Box<dyn Error>> {
    let artifacts = ProgramLoader::build(file, out_dir, options, emit_ir)?;

    println!("Wrote {}", artifacts.c.display());
    println!("Wrote {}", artifacts.dot.display());
    if let Some(ir) = &artifacts.ir {
        println!("Wrote {}", ir.display());
    }

    if svg {
        let svg_path = artifacts.dot.with_extension("svg");
        match process::Command::new("dot")
            .arg("-Tsvg")
            .arg(&artifacts.dot)
            .arg("-o")
            .arg(&svg_path)
            .status()
        {
            Ok(status) if status.success() => println!("Wrote {}", svg_path.display()),
            Ok(status) => log::warn!("Graphviz dot exited with {status}, no SVG written"),
            Err(e) => log::warn!("Could not run Graphviz dot: {e}"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run(
    file: Option<&Path>,
    example: Option<&str>,
    input: &str,
    trace: bool,
    options: &CodegenOptions,
) -> Result<ExitCode, Box<dyn Error>> {
    let source = match (file, example) {
        (Some(path), _) => ProgramLoader::read_source(path)?,
        (None, Some(name)) => ProgramManager::get_program_text(name)?.to_string(),
        (None, None) if atty::isnt(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        (None, None) => {
            return Err("No program given: pass a file, --example or pipe one on stdin".into())
        }
    };

    let compilation = compile(&source, options)?;
    let simulator = Simulator::build(&compilation.program, *options)?;
    let mut machine = TuringMachine::new(&simulator, input)?;

    let halt = if trace {
        let print_state = |machine: &TuringMachine| {
            println!(
                "{} Head: {} State: {} ({})",
                machine.window(),
                machine.position(),
                machine.state_id(),
                machine.state()
            );
        };

        print_state(&machine);
        loop {
            match machine.step()? {
                Step::Continue => print_state(&machine),
                Step::Halt(halt) => break halt,
            }
            if machine.step_count() >= MAX_EXECUTION_STEPS {
                return Err(RuntimeError::StepLimit(MAX_EXECUTION_STEPS).into());
            }
        }
    } else {
        machine.run()?
    };

    println!("{halt}");
    println!("Tape: {}", machine.contents());

    let code = match halt {
        Halt::Accepted => EXIT_ACCEPTED,
        Halt::Rejected => EXIT_REJECTED,
        Halt::Crashed { .. } => EXIT_CRASHED,
    };
    Ok(ExitCode::from(code as u8))
}

fn list() -> Result<ExitCode, Box<dyn Error>> {
    for index in 0..ProgramManager::get_program_count() {
        let info = ProgramManager::get_program_info(index)?;
        println!(
            "{:<20} start: {:<8} states: {:<4} transitions: {}",
            info.name, info.start_state, info.state_count, info.transition_count
        );
    }

    Ok(ExitCode::SUCCESS)
}

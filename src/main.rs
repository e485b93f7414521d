//! Binary entry point for the gorefactor CLI.
//!
//! ## Usage
//!
//! ```bash
//! # List the registered refactorings
//! gorefactor list
//!
//! # Preview a rename (outputs a unified diff)
//! gorefactor rename --file shapes/area.go --pos 12:6 total
//!
//! # Extract the selected expression into a variable and write the result
//! gorefactor var --file main.go --pos 8:10-8:19 --write sum
//! ```
//!
//! Global options go before the refactoring name.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};

use gorefactor::cli::{
    failure, render_diff, render_error_json, render_json, run_refactoring, write_changes, Request,
};
use gorefactor::{DoctorError, OutputErrorCode, Registry};

// ============================================================================
// CLI Structure
// ============================================================================

/// Refactorings for Go source.
#[derive(Parser, Debug)]
#[command(name = "gorefactor", version, about = "Refactorings for Go source")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Module path prefixed to package import paths.
    #[arg(long, global = true)]
    module: Option<String>,

    /// Log level for tracing output. `RUST_LOG` takes precedence.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit tracing output as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered refactorings.
    List {
        /// Include hidden refactorings.
        #[arg(long)]
        all: bool,
    },
    /// Run a refactoring: `<name> --file F --pos P [ARGS]...`.
    #[command(external_subcommand)]
    Refactor(Vec<String>),
}

/// Arguments of a refactoring invocation.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct RefactorArgs {
    /// File holding the selection, relative to the workspace.
    #[arg(long)]
    file: String,

    /// Selection: START[,END] byte offsets or LINE:COL[-LINE:COL].
    #[arg(long)]
    pos: String,

    /// Print a JSON envelope instead of a diff.
    #[arg(long, conflicts_with = "write")]
    json: bool,

    /// Write the changes to disk.
    #[arg(long)]
    write: bool,

    /// Log what the refactoring did.
    #[arg(long, short)]
    verbose: bool,

    /// Refactoring arguments, in the order its usage lists them.
    args: Vec<String>,
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            eprintln!("error: {}", err);
            let _ = io::stderr().flush();
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), DoctorError> {
    let registry = Registry::with_defaults();
    match cli.command {
        Command::List { all } => execute_list(&registry, all),
        Command::Refactor(argv) => execute_refactor(&registry, &cli.global, argv),
    }
}

fn execute_list(registry: &Registry, all: bool) -> Result<(), DoctorError> {
    let mut stdout = io::stdout().lock();
    for (name, refactoring) in registry.iter() {
        let description = refactoring.description();
        if description.hidden && !all {
            continue;
        }
        writeln!(
            stdout,
            "{:<10} {:<36} {}",
            name, description.synopsis, description.usage
        )?;
    }
    Ok(())
}

fn execute_refactor(
    registry: &Registry,
    global: &GlobalArgs,
    argv: Vec<String>,
) -> Result<(), DoctorError> {
    let mut argv = argv.into_iter();
    let name = argv
        .next()
        .ok_or_else(|| DoctorError::invalid_args("missing refactoring name"))?;
    let args = match RefactorArgs::try_parse_from(argv) {
        Ok(args) => args,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            print!("{}", err);
            return Ok(());
        }
        Err(err) => return Err(DoctorError::invalid_args(err.to_string())),
    };

    let request = Request {
        refactoring: name,
        file: args.file,
        pos: args.pos,
        args: args.args,
        verbose: args.verbose,
    };
    let mut stdout = io::stdout().lock();
    let outcome = match run_refactoring(
        registry,
        &global.workspace,
        global.module.as_deref(),
        &request,
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            if args.json {
                writeln!(stdout, "{}", render_error_json(&err)?)?;
            }
            return Err(err);
        }
    };
    let result = &outcome.result;

    if args.json {
        writeln!(stdout, "{}", render_json(&request.refactoring, result)?)?;
    } else {
        eprint!("{}", result.log);
    }
    if let Some(err) = failure(result) {
        return Err(err);
    }

    if args.write {
        for line in write_changes(&global.workspace, &outcome)? {
            writeln!(stdout, "{}", line)?;
        }
    } else if !args.json {
        write!(stdout, "{}", render_diff(&outcome)?)?;
    }
    Ok(())
}

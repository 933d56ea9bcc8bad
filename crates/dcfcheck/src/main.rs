use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use dcfcheck::corpus::{DEFAULT_FIXTURE_SUFFIX, DEFAULT_PROGRAMS_DIR};
use dcfcheck::harness::EXIT_FATAL;
use dcfcheck::report::{write_report, InvocationInfo, RunReport};
use dcfcheck::{Assembler, Compiler, Harness, HarnessConfig};
use dcfcheck_proc::process::describe_command;
use dcfcheck_proc::ToolCommand;

#[derive(Parser)]
#[command(name = "dcfcheck")]
#[command(about = "Compile, assemble and run every fixture; compare exit codes with `// Returns:`.", long_about = None)]
struct Cli {
    #[arg(long, default_value = DEFAULT_PROGRAMS_DIR)]
    programs_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_FIXTURE_SUFFIX)]
    suffix: String,

    /// Compiler entry point [default: <git repo root>/run.sh]
    #[arg(long)]
    compiler: Option<PathBuf>,

    /// Argument placed before `-t <target> <fixture>`; repeatable.
    #[arg(long, allow_hyphen_values = true)]
    compiler_arg: Vec<OsString>,

    #[arg(long, default_value = dcfcheck::compiler::DEFAULT_TARGET)]
    target: String,

    /// Assembler/linker [default: $DCFCHECK_CC, then gcc]
    #[arg(long)]
    cc: Option<PathBuf>,

    /// Write a JSON report after a completed run.
    #[arg(long)]
    report_out: Option<PathBuf>,

    #[arg(long)]
    quiet: bool,

    /// Print each child command line to stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dcfcheck: {err:#}");
            std::process::ExitCode::from(EXIT_FATAL)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    let started_at_unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut compiler = match cli.compiler {
        Some(path) => Compiler::new(ToolCommand::new(path).with_args(cli.compiler_arg)),
        None => Compiler::in_repo_root(cli.compiler_arg),
    };
    compiler.target = cli.target;

    let config = HarnessConfig {
        programs_dir: cli.programs_dir,
        suffix: cli.suffix,
        compiler,
        assembler: Assembler::from_env(cli.cc),
        echo_commands: cli.verbose,
    };
    let harness = Harness::new(config);

    let stdout = std::io::stdout();
    let summary = harness.run(&mut stdout.lock())?;

    if !cli.quiet {
        eprintln!(
            "dcfcheck: {} passed, {} failed ({} ms)",
            summary.passed(),
            summary.failed(),
            summary.duration.as_millis()
        );
    }

    if let Some(path) = &cli.report_out {
        let config = harness.config();
        let invocation = InvocationInfo {
            argv: std::env::args_os()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            started_at_unix_ms,
            programs_dir: config.programs_dir.display().to_string(),
            compiler: config.compiler.describe(),
            assembler: describe_command(&config.assembler.command.command()),
        };
        write_report(path, &RunReport::new(&summary, invocation))?;
    }

    Ok(std::process::ExitCode::from(summary.exit_code()))
}

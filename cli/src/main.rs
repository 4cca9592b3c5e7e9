//! tcopy - Command-line interface for the transfer engine.
//!
//! Parses the command line, splits SOURCE and DEST into directory and file
//! parts, wires the keyboard up as a command source and prints one status
//! line per engine event followed by a final status line.

mod output;
mod split;
mod terminal;

use clap::Parser;
use engine::config::DEFAULT_BUFFER_SIZE;
use engine::interrupt::CommandSource;
use engine::{create_job, run_job, EngineConfig, EngineError, Mode, RunOptions, RunStats};
use output::CliProgress;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "USAGE: tcopy [--del|--mir] [-f] [-t] <src-file>|<src-dir> [<dest-file>|<dest-dir>]";

/// tcopy - Supervised, verified, throttled copy
#[derive(Parser, Debug)]
#[command(name = "tcopy")]
#[command(version)]
#[command(about = "Copy, move or mirror a file or directory tree with verification")]
#[command(
    after_help = "While running: SPACE or p pauses and resumes, v pauses after the current file, ESC or q stops."
)]
struct Args {
    /// Move: delete each source file once its copy is verified
    #[arg(long, group = "mode")]
    del: bool,

    /// Mirror: also delete destination files missing from the source
    #[arg(long, group = "mode")]
    mir: bool,

    /// Two-way sync (not implemented)
    #[arg(long, group = "mode")]
    sync: bool,

    /// Skip every throttle delay and pacing pause
    #[arg(short, long)]
    faster: bool,

    /// Report what would be done without changing anything
    #[arg(short = 't', long = "test-run")]
    test_run: bool,

    /// Enable debug logging and a closing summary
    #[arg(short, long)]
    verbose: bool,

    /// Transfer buffer size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Source file or directory
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Destination file or directory (defaults to the current directory)
    #[arg(value_name = "DEST")]
    dest: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.del {
            Mode::Move
        } else if self.mir {
            Mode::Mirror
        } else if self.sync {
            Mode::Sync
        } else {
            Mode::Copy
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = {
        let (_terminal, commands) = terminal::attach();
        run_cli(&args, commands)
    };

    println!();
    let exit_code = match result {
        Ok(_) => {
            println!("Done!");
            0
        }
        Err(e) => {
            report(&e);
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

fn report(error: &EngineError) {
    match error {
        EngineError::Usage(message) => {
            println!("ERROR: {}", message);
            println!("{}", USAGE);
        }
        EngineError::UserStop => println!("WARNING: {}", error),
        _ => println!("ERROR: {}", error),
    }
}

fn describe(dir: &Path, file: Option<&Path>) -> PathBuf {
    match file {
        Some(file) => dir.join(file),
        None => dir.to_path_buf(),
    }
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args, commands: Box<dyn CommandSource>) -> Result<RunStats, EngineError> {
    if args.mode() == Mode::Sync {
        return Err(EngineError::Unimplemented("Not Yet Implemented!".to_string()));
    }
    let source = split::split_source(&args.source)?;
    let dest = split::split_dest(args.dest.as_deref(), source.file.is_some())?;
    let job = create_job(args.mode(), source.dir, source.file, dest.dir, dest.file)?;

    println!();
    println!("Mode: {}", job.mode());
    println!("From: {}", describe(job.source_dir(), job.source_file()).display());
    println!("To:   {}", describe(job.dest_dir(), job.dest_file()).display());

    let config = EngineConfig {
        buffer_size: args.buffer_size,
        ..EngineConfig::default()
    };
    let options = RunOptions {
        faster: args.faster,
        dry_run: args.test_run,
    };
    let progress = CliProgress::new(args.verbose);

    run_job(&job, options, config, commands, Some(&progress))
}

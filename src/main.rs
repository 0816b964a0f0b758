use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use statescope::timeline::{read_log_file, write_log, LogForm};
use statescope::{util, Config};

#[derive(Parser, Debug)]
#[command(
    name = "statescope",
    version,
    about = "Inspect, replay and convert recorded state-transition logs",
    arg_required_else_help = true
)]
struct Cli {
    /// Data directory (default: $STATESCOPE_DATA_DIR or ~/.statescope).
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Log to stderr instead of the log file.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconstruct the state recorded in a log and print it.
    Replay {
        file: PathBuf,

        /// Print the state immediately before message N instead of the final state.
        #[arg(long, value_name = "N")]
        at: Option<usize>,
    },

    /// Print one summary line per recorded message.
    Inspect { file: PathBuf },

    /// Rewrite a log (legacy or current) as a version 1 document.
    Convert {
        file: PathBuf,

        /// Output file (default: stdout).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_data_dir(cli.data_dir.clone());
    let config = Config::load();
    init_logging(&config, cli.verbose)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Replay { file, at } => replay(&file, at, &mut out),
        Command::Inspect { file } => inspect(&file, &mut out),
        Command::Convert { file, output } => convert(&file, output.as_deref(), &mut out),
    }
}

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    // Initialize logging to file (~/.statescope/logs/statescope.log)
    fs::create_dir_all(util::logs_dir())
        .with_context(|| format!("creating {}", util::logs_dir().display()))?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())
        .with_context(|| format!("opening {}", util::log_file_path().display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();
    Ok(())
}

fn replay(file: &Path, at: Option<usize>, out: &mut impl Write) -> Result<()> {
    let (log, _) = read_log_file(file).with_context(|| format!("reading {}", file.display()))?;

    let state = match at {
        Some(index) => log
            .state_at(index)
            .with_context(|| format!("reconstructing state before message {index}"))?,
        None => log.final_state(),
    };
    tracing::info!(file = %file.display(), messages = log.len(), ?at, "Replayed log");

    serde_json::to_writer_pretty(&mut *out, &state)?;
    writeln!(out)?;
    Ok(())
}

fn inspect(file: &Path, out: &mut impl Write) -> Result<()> {
    let (log, form) = read_log_file(file).with_context(|| format!("reading {}", file.display()))?;

    let form = match form {
        LogForm::Versioned => "version 1",
        LogForm::Legacy => "legacy",
    };
    writeln!(out, "{} messages ({form})", log.len())?;
    for (index, message) in log.messages().iter().enumerate() {
        writeln!(out, "{index:>4} {}", message.summary())?;
    }
    Ok(())
}

fn convert(file: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let (log, form) = read_log_file(file).with_context(|| format!("reading {}", file.display()))?;
    let document = write_log(&log)?;

    match output {
        Some(path) => {
            fs::write(path, &document).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(from = %file.display(), to = %path.display(), ?form, "Converted log");
        }
        None => writeln!(out, "{document}")?,
    }
    Ok(())
}

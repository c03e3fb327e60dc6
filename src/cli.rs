use crate::archive::HourSpec;
use crate::import::{self, ImportCommand};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gharvest", version)]
#[command(
    about = "Batch importer for hourly GitHub event archives",
    long_about = "gharvest fetches gzip-compressed hourly event archives, classifies pull request, comment, and push records, and persists them idempotently into SQLite in fixed-size batches."
)]
#[command(arg_required_else_help = true)]
#[command(after_long_help = "Examples:
  gharvest import --day 2015-01-01 --hour 15
  gharvest import --day 2015-01-01 --batch-size 500 --log import.ndjson
  gharvest stats
  gharvest completion zsh > ~/.zsh/completions/_gharvest
  gharvest man > gharvest.1")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Import one archive window into the store",
        long_about = "Fetch the archive for a day (one hour or all 24 in order), classify each record, and persist actors, repos, and events in fixed-size batches. Re-importing the same window is idempotent: rows whose id already exists are ignored."
    )]
    #[command(after_long_help = "Examples:
  gharvest import
  gharvest import --day 2015-01-01 --hour 15
  gharvest import --day 2015-01-01 --batch-size 500
  gharvest import --hour all --skip-failed-hours")]
    Import {
        #[arg(
            long,
            value_name = "DATE",
            help = "Archive day as YYYY-MM-DD (default: today, UTC)"
        )]
        day: Option<NaiveDate>,
        #[arg(
            long,
            default_value = "all",
            value_name = "HOUR",
            help = "Archive hour 0-23, or `all` for the whole day"
        )]
        hour: HourSpec,
        #[arg(
            long,
            value_name = "N",
            help = "Events accumulated per flush (positive, default 100)"
        )]
        batch_size: Option<usize>,
        #[arg(
            long,
            value_name = "PATH",
            help = "Path to SQLite database (default: $XDG_DATA_HOME/gharvest/events.db)"
        )]
        db: Option<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Write NDJSON progress log to file")]
        log: Option<PathBuf>,
        #[arg(long, value_name = "URL", help = "Archive base URL override")]
        base_url: Option<String>,
        #[arg(
            long,
            help = "Skip hours whose fetch fails instead of aborting the run"
        )]
        skip_failed_hours: bool,
    },
    #[command(about = "Summarize store contents")]
    #[command(after_long_help = "Example:
  gharvest stats --db ./events.db")]
    Stats {
        #[arg(
            long,
            value_name = "PATH",
            help = "Path to SQLite database (default: $XDG_DATA_HOME/gharvest/events.db)"
        )]
        db: Option<PathBuf>,
    },
    #[command(
        about = "Generate shell completion script",
        long_about = "Generate shell completion script for your shell. Redirect output to your shell completion directory."
    )]
    #[command(arg_required_else_help = true)]
    #[command(after_long_help = "Examples:
  gharvest completion bash > ~/.local/share/bash-completion/completions/gharvest
  gharvest completion zsh > ~/.zsh/completions/_gharvest
  gharvest completion fish > ~/.config/fish/completions/gharvest.fish")]
    Completion {
        #[arg(value_enum, value_name = "SHELL", help = "Target shell")]
        shell: Shell,
    },
    #[command(
        about = "Generate a man page",
        long_about = "Generate a roff man page for gharvest."
    )]
    #[command(after_long_help = "Examples:
  gharvest man > gharvest.1
  gharvest man --output docs/gharvest.1")]
    Man {
        #[arg(
            long,
            value_name = "PATH",
            help = "Write man page to file (stdout when omitted)"
        )]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Import {
            day,
            hour,
            batch_size,
            db,
            log,
            base_url,
            skip_failed_hours,
        } => import::execute_import(ImportCommand {
            day,
            hour,
            batch_size,
            db,
            log,
            base_url,
            skip_failed_hours,
        }),
        Commands::Stats { db } => import::show_stats(db),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Man { output } => {
            let man = clap_mangen::Man::new(Cli::command());
            match output {
                Some(path) => {
                    let mut bytes = Vec::new();
                    man.render(&mut bytes)?;
                    fs::write(path, bytes)?;
                }
                None => {
                    man.render(&mut io::stdout())?;
                }
            }
            Ok(())
        }
    }
}

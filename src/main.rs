use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use takeout_merge::config::{self, MergeConfig, RunOptions};
use takeout_merge::events::Event;
use takeout_merge::orchestrator::Orchestrator;
use takeout_merge::output;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "takeout-merge")]
#[command(about = "Merge Google Takeout sidecar metadata into media files")]
#[command(long_about = "\
Merge Google Takeout sidecar metadata into media files

Two stages. Stage 1 (plan) inventories the source tree and maps every
media file to its JSON sidecar, then shows a summary. After you confirm,
Stage 2 (merge) writes each sidecar's capture time, GPS, description,
and people tags into the media file via exiftool, and sorts files into
Completed/ and Failed/ trees with a CSV report of every decision.

Destinations default to <source>/../Takeout-Results/{Completed,Failed,Logs}.
A sidecar-less file, an unparseable sidecar, or an exiftool failure sends
that one file to Failed/ — the run keeps going. To retry the tough cases,
point the source at the Failed folder and run again.")]
#[command(version = version_string())]
struct Cli {
    /// Google Takeout export directory to process
    source: PathBuf,

    /// Destination for successfully merged files
    #[arg(long)]
    completed: Option<PathBuf>,

    /// Destination for files that could not be merged
    #[arg(long)]
    failed: Option<PathBuf>,

    /// Directory for the session log and CSV report
    #[arg(long)]
    logs: Option<PathBuf>,

    /// Move files as bare names instead of recreating the source layout
    #[arg(long)]
    flat: bool,

    /// Keep exiftool's `_original` backups instead of rewriting in place
    #[arg(long)]
    keep_backups: bool,

    /// Classify and report without invoking exiftool or moving anything
    #[arg(long)]
    dry_run: bool,

    /// Exiftool command name or path (default from config or PATH)
    #[arg(long)]
    exiftool: Option<String>,

    /// Proceed into the merge stage without prompting
    #[arg(long, short = 'y')]
    yes: bool,

    /// Config file with defaults for the flags above
    #[arg(long, default_value = "merge.toml")]
    config: PathBuf,
}

fn resolve_options(cli: &Cli, config: &MergeConfig) -> RunOptions {
    let mut options = RunOptions::new(cli.source.clone(), config);
    if let Some(completed) = &cli.completed {
        options.completed = completed.clone();
    }
    if let Some(failed) = &cli.failed {
        options.failed = failed.clone();
    }
    if let Some(logs) = &cli.logs {
        options.logs = logs.clone();
    }
    if cli.flat {
        options.preserve_tree = false;
    }
    if cli.keep_backups {
        options.overwrite = false;
    }
    if let Some(exiftool) = &cli.exiftool {
        options.exiftool = exiftool.clone();
    }
    options.dry_run = cli.dry_run;
    options
}

/// Ask on stdin whether to proceed into the merge stage.
fn prompt_proceed() -> bool {
    print!("Proceed with the merge? [y/N] ");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;
    let options = resolve_options(&cli, &config);

    let (tx, rx) = mpsc::channel();
    let orchestrator = Orchestrator::start(options, tx);

    let mut fatal = false;
    for event in rx {
        output::print_event(&event);
        match &event {
            Event::ConfirmationNeeded(_) => {
                if cli.yes || prompt_proceed() {
                    orchestrator.confirm_proceed();
                } else {
                    println!("Cancelled. No files were modified.");
                    orchestrator.confirm_cancel();
                }
            }
            Event::Fatal(_) => fatal = true,
            _ => {}
        }
    }
    orchestrator.join();

    if fatal {
        std::process::exit(1);
    }
    Ok(())
}

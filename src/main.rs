//! rescan - polling directory change notifier.
//!
//! Usage:
//!   rescan [PATH]                  Watch PATH (defaults to current directory)
//!   rescan --config watch.json     Load settings from a JSON file
//!   rescan --json --initial PATH   Report existing entries first, as JSON lines
//!   rescan --help                  Show help

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use rescan_core::{Event, WatchConfig};
use rescan_scan::ScanNotifier;

#[derive(Parser)]
#[command(
    name = "rescan",
    version,
    about = "Report file system changes by periodically rescanning a directory",
    long_about = "rescan walks a directory tree on a fixed interval and prints \
                  an event for every entry that was created, modified, deleted \
                  or had its permissions changed since the previous pass."
)]
struct Cli {
    /// Directory to watch (overrides the config file root)
    path: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of workers per pass
    #[arg(short, long)]
    workers: Option<usize>,

    /// Pause between passes in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Capacity of the intake and output queues
    #[arg(short, long)]
    queue: Option<usize>,

    /// Regex of paths to drop
    #[arg(short, long)]
    exclude: Option<String>,

    /// Regex that paths must match to be reported
    #[arg(long)]
    include: Option<String>,

    /// Do not report entries that could not be read
    #[arg(long)]
    no_errors: bool,

    /// Also report entries that did not change
    #[arg(long)]
    unchanged: bool,

    #[arg(long)]
    no_create: bool,

    #[arg(long)]
    no_modify: bool,

    #[arg(long)]
    no_delete: bool,

    #[arg(long)]
    no_perm: bool,

    #[arg(long)]
    no_files: bool,

    #[arg(long)]
    no_folders: bool,

    #[arg(long)]
    no_symlinks: bool,

    /// Report directories but never descend into them
    #[arg(long)]
    no_folder_content: bool,

    /// Report everything already present as CREATE before watching
    #[arg(long)]
    initial: bool,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Merge the config file (if any) with command line overrides.
    fn watch_config(&self) -> Result<WatchConfig> {
        let mut config = match &self.config {
            Some(file) => {
                let raw = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read config {}", file.display()))?;
                serde_json::from_str::<WatchConfig>(&raw)
                    .with_context(|| format!("Invalid config {}", file.display()))?
            }
            None => WatchConfig::new(self.path.clone().unwrap_or_else(|| PathBuf::from("."))),
        };

        if let Some(path) = &self.path {
            config.root = path.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(interval) = self.interval_ms {
            config.scan_interval_ms = interval;
        }
        if let Some(queue) = self.queue {
            config.queue_capacity = queue;
        }
        if self.exclude.is_some() {
            config.exclude = self.exclude.clone();
        }
        if self.include.is_some() {
            config.include = self.include.clone();
        }

        config.ignore_errors |= self.no_errors;
        config.ignore_no_change &= !self.unchanged;
        config.ignore_create |= self.no_create;
        config.ignore_modify |= self.no_modify;
        config.ignore_delete |= self.no_delete;
        config.ignore_perm |= self.no_perm;
        config.ignore_files |= self.no_files;
        config.ignore_folders |= self.no_folders;
        config.ignore_symlinks |= self.no_symlinks;
        config.ignore_folder_content |= self.no_folder_content;

        Ok(config)
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("{level},rayon=warn")
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.watch_config()?;
    let options = config.to_options().context("Invalid options")?;
    let notifier = Arc::new(
        ScanNotifier::new(&config.root, options)
            .with_context(|| format!("Cannot watch {}", config.root.display()))?,
    );

    if cli.initial {
        notifier.flush();
    }

    eprintln!("Watching {}...", notifier.root().display());

    let events = notifier.queue();
    let json = cli.json;
    let printer = tokio::task::spawn_blocking(move || -> Result<()> {
        for event in events {
            print_event(&event, json)?;
        }
        Ok(())
    });

    let cancel = CancellationToken::new();
    let runner = Arc::clone(&notifier);
    let token = cancel.clone();
    let scanner = tokio::task::spawn_blocking(move || runner.start(&token));

    if let Some(secs) = cli.duration {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            debug!(secs, "duration elapsed");
            token.cancel();
        });
    }

    let stopper = Arc::clone(&notifier);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            if let Err(err) = stopper.stop() {
                warn!(%err, "stop request rejected");
            }
        }
    });

    scanner
        .await
        .map_err(|err| eyre!("scan loop panicked: {err}"))?
        .context("Scan loop failed")?;

    printer
        .await
        .map_err(|err| eyre!("event printer panicked: {err}"))??;

    Ok(())
}

/// Print one event to stdout.
fn print_event(event: &Event, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).context("Failed to encode event")?);
    } else {
        println!("{event}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert!(default_filter(false).starts_with("info"));
        assert!(default_filter(true).starts_with("debug"));
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from(["rescan", "/srv", "--workers", "3", "--unchanged", "--no-delete"]);
        let config = cli.watch_config().unwrap();

        assert_eq!(config.root, PathBuf::from("/srv"));
        assert_eq!(config.max_workers, 3);
        assert!(!config.ignore_no_change);
        assert!(config.ignore_delete);
        assert!(!config.ignore_create);
    }
}

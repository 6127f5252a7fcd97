//! Command-line interface for wavegate.
//!
//! Provides daemon control (`start`, `stop`, `status`) and a `config`
//! command that prints the resolved configuration.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::{MetaflacTagger, SoxConverter};
use crate::config::{Config, LogFormat};
use crate::daemon::{self, DaemonStatus, PidFile};
use crate::transfer::TransferCoordinator;
use crate::watch::WatchLoop;

/// wavegate - watches a directory for finished WAV recordings and imports
/// them: queue, convert, tag
#[derive(Parser, Debug)]
#[command(name = "wavegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config.yaml (default: next to the binary, then
    /// ~/.config/wavegate/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the watcher daemon
    Start {
        /// Run a single polling cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Ask a running daemon to stop after its current cycle
    Stop,

    /// Show daemon liveness and directory overview
    Status,

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        match self.command {
            Commands::Start { once } => execute_start(config, once).await,
            Commands::Stop => execute_stop(&config),
            Commands::Status => execute_status(&config),
            Commands::Config => execute_config(&config),
        }
    }
}

/// Start the polling loop (the only command that logs to the log file)
async fn execute_start(config: Config, once: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let _log_guard = init_logging(&config).context("Failed to open log file")?;

    // Startup failures past this point are process-fatal; per-file failures
    // inside the loop never are.
    let pidfile = PidFile::acquire(&config.pid_path)
        .context("Failed to acquire pid file")?;
    tracing::info!("Starting (pid file {})", pidfile.path().display());

    let config = Arc::new(config);
    let converter = SoxConverter::new(config.converter.program.clone());
    let coordinator = TransferCoordinator::new(config.clone(), converter, MetaflacTagger::default());
    let mut watch = WatchLoop::new(config.clone(), coordinator);

    if once {
        let report = watch.cycle().await;
        println!(
            "Cycle done: {} imported, {} deferred, {} failed",
            report.dispatched, report.deferred, report.failed
        );
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handler(shutdown.clone())?;

    watch.run(shutdown).await;

    drop(pidfile);
    Ok(())
}

/// Set the shutdown flag on SIGTERM or Ctrl+C; the loop checks it between
/// cycles so an in-flight conversion is never interrupted.
fn install_signal_handler(shutdown: Arc<AtomicBool>) -> Result<()> {
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
        tracing::info!("Stop requested, finishing current cycle");
        shutdown.store(true, Ordering::SeqCst);
    });

    Ok(())
}

fn execute_stop(config: &Config) -> Result<()> {
    let pid = daemon::stop(&config.pid_path).context("Failed to stop daemon")?;
    println!("Sent SIGTERM to pid {pid}; daemon exits after its current cycle");
    Ok(())
}

fn execute_status(config: &Config) -> Result<()> {
    println!();
    println!("wavegate status");
    println!("═══════════════════════════════════════════════");
    println!();
    println!("Watch dir:   {}", config.watch_dir.display());
    println!("Queue dir:   {}", config.queue_dir.display());
    println!("Output dir:  {}", config.output_dir.display());
    println!("Pid file:    {}", config.pid_path.display());
    println!();

    match daemon::status(&config.pid_path)? {
        DaemonStatus::Running(pid) => println!("Daemon:      running (pid {pid})"),
        DaemonStatus::Stale(pid) => {
            println!("Daemon:      not running (stale pid file, last pid {pid})")
        }
        DaemonStatus::NotRunning => println!("Daemon:      not running"),
    }

    println!();
    match count_watched_files(config) {
        Some(count) => println!("{} watched file(s) in {}", count, config.watch_dir.display()),
        None => println!("⚠️  Watch dir does not exist: {}", config.watch_dir.display()),
    }

    Ok(())
}

fn count_watched_files(config: &Config) -> Option<usize> {
    if !config.watch_dir.is_dir() {
        return None;
    }
    let snap = crate::watch::snapshot(&config.watch_dir);
    Some(
        snap.keys()
            .filter(|p| config.is_watched_extension(p))
            .count(),
    )
}

fn execute_config(config: &Config) -> Result<()> {
    println!();
    println!("wavegate configuration ({})", config.config_path.display());
    println!("═══════════════════════════════════════════════");
    println!();
    println!("Watch dir:       {}", config.watch_dir.display());
    println!("Queue dir:       {}", config.queue_dir.display());
    println!("Output dir:      {}", config.output_dir.display());
    println!("Log path:        {}", config.log_path.display());
    println!("Pid file:        {}", config.pid_path.display());
    println!("Log level:       {}", config.log_level);
    println!("Log format:      {:?}", config.log_format);
    println!("Timezone:        {}", config.timezone);
    println!("Poll interval:   {:?}", config.poll_interval);
    println!("Grace delay:     {:?}", config.grace);
    println!("Extensions:      {:?}", config.extensions);
    println!("Converter:       {}", config.converter.program);
    println!("Output ext:      {}", config.converter.output_ext);
    println!("Tag album:       {}", config.tags.album);
    println!("Tag comment:     {}", config.tags.comment);
    println!("Comment field:   {}", config.tags.comment_field);
    println!("Tag genre:       {}", config.tags.genre);
    Ok(())
}

/// File logging for the daemon. The guard must stay alive for the process
/// lifetime or buffered lines are lost.
fn init_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("Failed to open log file {}", config.log_path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Full => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            )
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
    }

    Ok(guard)
}

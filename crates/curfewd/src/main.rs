//! curfewd - The curfew daemon
//!
//! This is the main entry point for the curfew service.
//! It wires together all the components:
//! - Configuration loading
//! - Blocklists, password file and audit log
//! - Host adapter (Linux)
//! - Enforcement engine
//! - Sweep and schedule timers
//! - Interactive console

mod challenge;
mod console;
mod input;

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use clap::Parser;
use curfew_config::load_config_or_default;
use curfew_core::{Challenger, CoreEvent, EnforcementEngine};
use curfew_host_api::HostAdapter;
use curfew_host_linux::LinuxHost;
use curfew_store::{
    AuditEvent, AuditEventType, AuditStore, BlockListStore, PasswordFile, SqliteStore,
};
use curfew_util::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::challenge::{HeadlessChallenger, TerminalChallenge};
use crate::console::{Console, ConsoleView};
use crate::input::LineInput;

/// Audit entries older than this are pruned at startup
const AUDIT_RETENTION_DAYS: i64 = 30;

/// curfewd - Scheduled website and app blocking
#[derive(Parser, Debug)]
#[command(name = "curfewd")]
#[command(
    about = "Scheduled website and app blocking with a deliberately slow unblock",
    long_about = None
)]
struct Args {
    /// Configuration file path (default: ~/.config/curfew/config.toml)
    #[arg(short, long, env = "CURFEW_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set CURFEW_DATA_DIR env var)
    #[arg(short, long, env = "CURFEW_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Hosts file override
    #[arg(long)]
    hosts_file: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run without the interactive console
    #[arg(long)]
    headless: bool,
}

/// Main service state
struct Service {
    engine: Arc<EnforcementEngine>,
    audit: Arc<SqliteStore>,
    input: Option<Arc<LineInput>>,
    sweep_interval: Duration,
    schedule_interval: Duration,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let mut policy = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        if let Some(data_dir) = &args.data_dir {
            policy.service.data_dir = data_dir.clone();
        }
        if let Some(hosts_file) = &args.hosts_file {
            policy.service.hosts_file = hosts_file.clone();
        }

        info!(
            config_path = %args.config.display(),
            schedule = %policy.schedule,
            "Configuration loaded"
        );

        let data_dir = policy.service.data_dir.clone();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize audit log
        let db_path = data_dir.join("audit.db");
        let audit = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Audit log opened");

        audit.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let cutoff = curfew_util::now() - ChronoDuration::days(AUDIT_RETENTION_DAYS);
        match audit.prune_before(cutoff) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Pruned old audit entries"),
            Err(e) => warn!(error = %e, "Failed to prune audit log"),
        }

        // Initialize host adapter
        let host = Arc::new(LinuxHost::new(
            policy.service.elevate_with.clone(),
            policy.resolver.flush_command.clone(),
        ));
        if !host.is_elevated() {
            warn!("Not running as root: website changes and some app kills will fail");
        }

        let lists = Arc::new(
            BlockListStore::open(&data_dir)
                .with_context(|| format!("Failed to load blocklists from {:?}", data_dir))?,
        );
        let passwords = Arc::new(PasswordFile::in_dir(&data_dir));

        let input = (!args.headless).then(|| Arc::new(LineInput::stdin()));
        let challenger: Arc<dyn Challenger> = match &input {
            Some(input) => Arc::new(TerminalChallenge::new(input.clone(), policy.unblock.clone())),
            None => Arc::new(HeadlessChallenger),
        };

        let sweep_interval = policy.enforcement.sweep_interval;
        let schedule_interval = policy.enforcement.schedule_interval;

        let engine = Arc::new(EnforcementEngine::new(
            policy,
            lists,
            host,
            passwords,
            challenger,
            audit.clone(),
        ));

        Ok(Self {
            engine,
            audit,
            input,
            sweep_interval,
            schedule_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let engine = self.engine.clone();
        let view = Arc::new(ConsoleView::default());
        let ui = self.input.is_some().then_some(&*view);
        let (quit_tx, mut quit_rx) = mpsc::unbounded_channel::<()>();

        let starter = engine.clone();
        let now = curfew_util::now();
        let events = tokio::task::spawn_blocking(move || starter.start(now))
            .await
            .context("Engine start task failed")?;
        for event in events {
            Self::handle_core_event(&event, ui);
        }

        // The console keeps the sender; headless runs drop it here
        let console = match self.input.clone() {
            Some(input) => Some(
                Console::new(engine.clone(), input, view.clone(), quit_tx)
                    .spawn()
                    .context("Failed to start console thread")?,
            ),
            None => {
                drop(quit_tx);
                None
            }
        };

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut sweep_timer = tokio::time::interval(self.sweep_interval);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut schedule_timer = tokio::time::interval(self.schedule_interval);
        schedule_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately and start() already covered it
        schedule_timer.tick().await;

        info!(
            sweep_ms = self.sweep_interval.as_millis() as u64,
            schedule_secs = self.schedule_interval.as_secs(),
            "Service running"
        );

        loop {
            tokio::select! {
                // Signal: SIGTERM - graceful shutdown
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }

                // Signal: SIGINT - refused during the blocking period
                _ = sigint.recv() => {
                    if engine.is_enforcing(curfew_util::now()) {
                        warn!("Received SIGINT during the blocking period, ignoring");
                        continue;
                    }
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // Signal: SIGHUP - re-read blocklists
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading blocklists");
                    let reloader = engine.clone();
                    let now = curfew_util::now();
                    match tokio::task::spawn_blocking(move || reloader.reload_lists(now)).await {
                        Ok(Ok(events)) => {
                            for event in events {
                                Self::handle_core_event(&event, ui);
                            }
                        }
                        Ok(Err(e)) => warn!(error = %e, "Failed to reload blocklists"),
                        Err(e) => error!(error = %e, "Reload task failed"),
                    }
                }

                // Sweep timer - kill blocked apps
                _ = sweep_timer.tick() => {
                    let sweeper = engine.clone();
                    let now = curfew_util::now();
                    match tokio::task::spawn_blocking(move || sweeper.sweep(now)).await {
                        Ok(report) if !report.is_clean() => {
                            debug!(
                                failures = report.failures.len(),
                                enumeration_error = ?report.enumeration_error,
                                "Sweep finished with errors"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Sweep task failed"),
                    }
                }

                // Schedule timer - transitions and hosts healing
                _ = schedule_timer.tick() => {
                    let ticker = engine.clone();
                    let now = curfew_util::now();
                    match tokio::task::spawn_blocking(move || ticker.tick(now)).await {
                        Ok(events) => {
                            for event in events {
                                Self::handle_core_event(&event, ui);
                            }
                        }
                        Err(e) => error!(error = %e, "Schedule task failed"),
                    }
                }

                // Console quit request
                Some(()) = quit_rx.recv() => {
                    info!("Quit requested from console");
                    break;
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down curfewd");

        if let Err(e) = self
            .audit
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        // The console thread may be blocked on stdin; it ends with the process
        drop(console);

        info!("Shutdown complete");
        Ok(())
    }

    fn handle_core_event(event: &CoreEvent, view: Option<&ConsoleView>) {
        info!(event = %event.describe(), "Core event");

        if let Some(view) = view
            && let Some(intent) = event.ui_intent()
        {
            view.apply(&intent);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout belongs to the console
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = curfew_util::is_mock_time_active(),
        "curfewd starting"
    );

    // Create and run the service
    let service = Service::new(&args)?;
    service.run().await
}

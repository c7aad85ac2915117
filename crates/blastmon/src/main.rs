//! blastmon - VMware Blast performance counter exporter.
//!
//! Polls the Blast counter families on every scrape and serves them in the
//! Prometheus text format.

mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use blastmon_core::config::{DEFAULT_COLLECTOR_NAME, DEFAULT_NAMESPACE};
use blastmon_core::provider::{CounterProvider, FsCounterProvider, MockProvider, RealFs};
use blastmon_core::{CollectorConfig, Orchestrator};

use state::SharedState;

// ============================================================
// CLI
// ============================================================

/// VMware Blast performance counter exporter.
#[derive(Parser)]
#[command(
    name = "blastmon",
    about = "VMware Blast performance counter exporter",
    version = blastmon_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9182", env = "BLASTMON_LISTEN")]
    listen: String,

    /// Root of the counter tree (one directory per counter object).
    #[arg(long, env = "BLASTMON_COUNTERS_PATH")]
    counters_path: Option<PathBuf>,

    /// Serve a simulated Blast host instead of real counters.
    #[arg(long, conflicts_with = "counters_path")]
    demo: bool,

    /// Metric namespace (first metric name part).
    #[arg(long, default_value = DEFAULT_NAMESPACE, env = "BLASTMON_NAMESPACE")]
    namespace: String,

    /// Comma-separated list of families to collect. Default is all.
    #[arg(long, env = "BLASTMON_FAMILIES", value_delimiter = ',')]
    families: Vec<String>,

    /// Comma-separated list of families to leave out.
    #[arg(long, env = "BLASTMON_EXCLUDE_FAMILIES", value_delimiter = ',')]
    exclude_families: Vec<String>,

    /// Poll families in parallel.
    #[arg(long, env = "BLASTMON_PARALLEL")]
    parallel: bool,

    /// Warn when one family takes longer than this to poll (milliseconds).
    #[arg(long, default_value = "5000", env = "BLASTMON_SLOW_FAMILY_MS")]
    slow_family_ms: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            namespace: self.namespace.clone(),
            collector_name: DEFAULT_COLLECTOR_NAME.to_string(),
            families: self.families.clone(),
            exclude_families: self.exclude_families.clone(),
            parallel: self.parallel,
            slow_family_threshold: Duration::from_millis(self.slow_family_ms),
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["blastmon", "blastmon_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    let provider = create_provider(&args);

    let config = args.collector_config();
    let mut orchestrator = match Orchestrator::new(&config, provider) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    info!(
        version = blastmon_core::VERSION,
        families = orchestrator.len(),
        parallel = config.parallel,
        "starting"
    );

    if let Err(e) = orchestrator.build() {
        warn!(failed = e.errors().len(), error = %e, "some families unavailable");
    }

    let state = state::new_state(orchestrator);

    let app = Router::new()
        .route("/metrics", get(handlers::handle_metrics))
        .route("/api/v1/health", get(handlers::handle_health))
        .route("/api/v1/status", get(handlers::handle_status))
        .with_state(state.clone());

    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    shutdown(state).await;
}

fn create_provider(args: &Args) -> Arc<dyn CounterProvider> {
    if args.demo {
        info!("demo mode: serving a simulated Blast host");
        return Arc::new(MockProvider::typical_blast_host());
    }

    match &args.counters_path {
        Some(path) => {
            info!(path = %path.display(), "reading counter tree");
            Arc::new(FsCounterProvider::new(RealFs::new(), path.clone()))
        }
        None => {
            error!("either --counters-path or --demo is required");
            process::exit(2);
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}

/// Closes every family once, off the async runtime.
async fn shutdown(state: SharedState) {
    info!("shutting down...");
    if let Err(e) = tokio::task::spawn_blocking(move || state::close(&state)).await {
        error!(error = %e, "close task failed");
    }
    info!("shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_to_config() {
        let args = Args::parse_from([
            "blastmon",
            "--demo",
            "--families",
            "session,usb",
            "--parallel",
            "--slow-family-ms",
            "250",
        ]);
        let config = args.collector_config();

        assert_eq!(config.namespace, "windows");
        assert_eq!(config.collector_name, "vmware_blast");
        assert_eq!(config.families, vec!["session", "usb"]);
        assert!(config.parallel);
        assert_eq!(config.slow_family_threshold, Duration::from_millis(250));
    }

    #[test]
    fn test_demo_conflicts_with_counters_path() {
        let result = Args::try_parse_from(["blastmon", "--demo", "--counters-path", "/counters"]);
        assert!(result.is_err());
    }
}

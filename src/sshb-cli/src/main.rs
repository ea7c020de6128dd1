//! sshb - main entry point.

use anyhow::Result;
use clap::Parser;

use sshb_cli::cli::{Cli, dispatch_command};

/// Guard that flushes the debug log file when dropped.
struct DebugLogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize logging: stderr at the requested level, or trace-level file
/// logging when `--debug-file` is given.
fn init_logging(cli: &Cli) -> Result<Option<DebugLogGuard>> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    if let Some(path) = &cli.debug_file {
        let file = std::fs::File::create(path).map_err(|e| {
            anyhow::anyhow!("failed to create {}: {}", path.display(), e)
        })?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true);

        tracing_subscriber::registry()
            .with(EnvFilter::new("trace"))
            .with(file_layer)
            .init();

        return Ok(Some(DebugLogGuard { _guard: guard }));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(None)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("sshb: {e}");
            std::process::exit(1);
        }
    };

    match dispatch_command(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("sshb: {e:#}");
            std::process::exit(1);
        }
    }
}

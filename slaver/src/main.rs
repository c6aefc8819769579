//! Command-line entry point for the slaver half of a reverse TCP tunnel: dials a master,
//! maintains a standby pool of connections, and splices activated ones onto a target service.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use slog::{o, Drain};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

use slaver_core::{Config, PoolController};

/// Reverse TCP tunnel slaver: stands by against a master and forwards activated
/// connections to a local target service.
#[derive(Parser, Debug)]
#[command(name = "slaver", version, about)]
struct Cli {
    /// Address of the master to dial, e.g. `tunnel.example.com:10000`.
    #[arg(short = 'm', long = "master")]
    master: SocketAddr,

    /// Address of the local service to forward activated connections to.
    #[arg(short = 't', long = "target")]
    target: SocketAddr,

    /// Shared secret used to tag control frames against the master.
    #[arg(short = 'k', long = "secret-key", default_value = "shootback")]
    secret_key: String,

    /// Standby connection time-to-live, in seconds, before it is abandoned unused.
    #[arg(long = "ttl", default_value_t = slaver_core::config::DEFAULT_SPARE_SLAVER_TTL_SECS)]
    ttl: u64,

    /// Maximum number of standby connections held open against the master at once.
    #[arg(long = "max-standby", default_value_t = slaver_core::config::DEFAULT_MAX_SPARE_COUNT)]
    max_standby: usize,

    /// Emit debug-level logs.
    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all logging but warnings and errors.
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn build_logger(verbose: bool, quiet: bool) -> slog::Logger {
    let level = if verbose {
        Severity::Debug
    } else if quiet {
        Severity::Warning
    } else {
        Severity::Info
    };

    let mut builder = TerminalLoggerBuilder::new();
    builder.level(level);
    builder.destination(Destination::Stderr);

    let drain = builder
        .build()
        .expect("terminal logger destination is always valid");
    slog::Logger::root(drain.fuse(), o!())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = build_logger(cli.verbose, cli.quiet);

    let config = Config::new(cli.master, cli.target, cli.secret_key)
        .with_spare_slaver_ttl(Duration::from_secs(cli.ttl))
        .with_max_spare_count(cli.max_standby);

    slog::info!(
        logger,
        "starting slaver";
        "master" => %cli.master,
        "target" => %cli.target,
        "max_standby" => cli.max_standby,
    );

    let controller = PoolController::new(config, logger);
    controller.run().await
}

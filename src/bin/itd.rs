//! Household presence daemon: accepts Unix-socket connections, ingests
//! START/STOP lines until the literal `EOF` line, then answers presence
//! queries for the rest of the connection's lifetime.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use itd::engine::Engine;
use itd::{observability, server};

/// Household presence daemon.
#[derive(Parser)]
#[command(name = "itd")]
#[command(version)]
#[command(about = "Tracks who is present from a START/STOP event stream")]
struct Cli {
    /// Daemonize (detach from the controlling terminal).
    #[arg(short = 'd')]
    daemonize: bool,

    /// Database filename, relative to -C.
    #[arg(short = 'f', default_value = "it.db")]
    file: PathBuf,

    /// Database home directory.
    #[arg(short = 'C', default_value = "/var/lib/it")]
    db_home: PathBuf,

    /// Unix socket path to listen on.
    #[arg(short = 'S', default_value = "/tmp/it-sock")]
    socket: PathBuf,

    /// Expose Prometheus metrics on this port.
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    observability::init(cli.metrics_port);

    if cli.daemonize {
        warn!("-d (daemonize) is not yet supported when running under this runtime; continuing in the foreground");
    }

    if let Err(e) = std::fs::create_dir_all(&cli.db_home) {
        error!("creating db home {}: {e}", cli.db_home.display());
        return ExitCode::from(1);
    }
    let db_path = cli.db_home.join(&cli.file);

    let engine = match Engine::open(&db_path) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("opening database {}: {e}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let _ = std::fs::remove_file(&cli.socket);
    let listener = match UnixListener::bind(&cli.socket) {
        Ok(listener) => listener,
        Err(e) => {
            error!("bind {}: {e}", cli.socket.display());
            return ExitCode::from(4);
        }
    };
    info!("listening on {}", cli.socket.display());

    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("installing SIGTERM handler: {e}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, _addr)) => {
                        let engine = engine.clone();
                        tokio::spawn(server::handle_connection(engine, socket));
                    }
                    Err(e) => warn!("accept error: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
        }
    }

    let _ = std::fs::remove_file(&cli.socket);
    ExitCode::SUCCESS
}

//! Per-connection protocol state machine, shared by the `itd` binary and by
//! integration tests that want to drive the daemon without a subprocess.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::{error, warn};

use crate::engine::Engine;
use crate::observability;
use crate::{presence_log, query};

/// Drive one connection end to end: ingest lines until the literal `EOF`
/// line, then answer every subsequent line as a query (§4.2/§4.7). Returns
/// when the peer closes the connection; a store error is an unrecoverable
/// bug per §7 and aborts the whole daemon rather than just this connection.
pub async fn handle_connection(engine: Arc<Engine>, socket: UnixStream) {
    metrics::gauge!(observability::CONNECTIONS_ACTIVE).increment(1.0);
    metrics::counter!(observability::CONNECTIONS_TOTAL).increment(1);

    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut ingesting = true;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("connection read error: {e}");
                break;
            }
        };

        if ingesting {
            if line == "EOF" {
                ingesting = false;
                continue;
            }
            match presence_log::ingest_line(&engine, &line) {
                Ok(applied) => {
                    let status = if applied { "applied" } else { "dropped" };
                    metrics::counter!(observability::INGEST_LINES_TOTAL, "status" => status)
                        .increment(1);
                }
                Err(e) => {
                    error!("store error during ingest, aborting daemon: {e}");
                    std::process::exit(1);
                }
            }
        } else {
            let modifier = match line.chars().next() {
                Some('*') => "splits",
                Some('+') => "always",
                _ => "union",
            };
            let start = std::time::Instant::now();
            let reply = match query::dispatch(&engine, &line) {
                Ok(reply) => reply,
                Err(e) => {
                    error!("store error during query, aborting daemon: {e}");
                    std::process::exit(1);
                }
            };
            metrics::counter!(observability::QUERIES_TOTAL, "modifier" => modifier).increment(1);
            metrics::histogram!(observability::QUERY_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());

            if let Err(e) = writer.write_all(reply.as_bytes()).await {
                warn!("connection write error: {e}");
                break;
            }
        }
    }

    metrics::gauge!(observability::CONNECTIONS_ACTIVE).decrement(1.0);
}

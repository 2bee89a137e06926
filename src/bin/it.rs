//! Query/ingest client: pipes stdin to the daemon as ingest records, then
//! issues the queries given on the command line and prints each reply.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::os::unix::net::UnixStream;

use clap::Parser;

/// Talk to an `itd` daemon over its Unix socket.
#[derive(Parser)]
#[command(name = "it")]
#[command(version)]
#[command(about = "Query and feed a running itd presence daemon")]
struct Cli {
    /// Socket path to connect to.
    #[arg(short = 'S', long = "socket", default_value = "/tmp/it-sock")]
    socket: String,

    /// Always-present query (only usernames present throughout the range).
    #[arg(short = 'r', long = "always")]
    always: Vec<String>,

    /// Show-splits query (one line per presence split).
    #[arg(short = 's', long = "splits")]
    splits: Vec<String>,

    /// Default-modifier (union) queries.
    queries: Vec<String>,
}

/// Send one query and print whatever reply arrives in a single read. The
/// daemon writes its whole reply (echo line plus result lines) in one
/// `write`, so one `read` back is enough — this mirrors the original
/// client's fixed-buffer request/reply exchange rather than attempting to
/// frame an unbounded number of result lines.
fn send_query(stream: &mut UnixStream, line: &str) -> io::Result<()> {
    writeln!(stream, "{line}")?;
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf)?;
    io::stdout().write_all(&buf[..n])?;
    Ok(())
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let mut stream = match UnixStream::connect(&cli.socket) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("connect {}: {e}", cli.socket);
            std::process::exit(1);
        }
    };

    if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        let mut input = String::new();
        handle.read_to_string(&mut input)?;
        for line in input.lines() {
            writeln!(stream, "{line}")?;
        }
    }
    writeln!(stream, "EOF")?;

    for query in &cli.always {
        send_query(&mut stream, &format!("+ {query}"))?;
    }
    for query in &cli.splits {
        send_query(&mut stream, &format!("* {query}"))?;
    }
    for query in &cli.queries {
        send_query(&mut stream, query)?;
    }

    Ok(())
}

//! START/STOP event ingest (§4.3). Translates textual lines into interval
//! inserts and "finish-last-open" mutations against the `Engine`. Malformed
//! lines are silently dropped — ingest is never fallible from the caller's
//! point of view; only genuine store failures propagate as `EngineError`.

use tracing::debug;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::model::{Ts, TS_MIN, TS_MAX, USERNAME_MAX_LEN};

/// A single parsed ingest record, or `None` for blank/comment/unknown lines.
#[derive(Debug, PartialEq, Eq)]
enum Record<'a> {
    Start { ts: Ts, username: &'a str },
    Stop { ts: Ts, username: &'a str },
}

fn parse_line(line: &str) -> Option<Record<'_>> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut words = line.split_whitespace();
    let op = words.next()?;
    let ts_str = words.next()?;
    let username = words.next()?;
    if username.len() > USERNAME_MAX_LEN {
        return None;
    }
    let ts = crate::time::parse_ts(ts_str)?;

    match op {
        "START" => Some(Record::Start { ts, username }),
        "STOP" => Some(Record::Stop { ts, username }),
        _ => None,
    }
}

/// Apply one ingest line to the engine. Returns `Ok(true)` if the line was
/// recognized and applied (even as a no-op per idempotence), `Ok(false)` if
/// it was silently dropped as malformed/unknown.
pub fn ingest_line(engine: &Engine, line: &str) -> Result<bool, EngineError> {
    match parse_line(line) {
        None => {
            debug!(%line, "dropping malformed or unrecognized ingest line");
            Ok(false)
        }
        Some(Record::Start { ts, username }) => {
            process_start(engine, ts, username)?;
            Ok(true)
        }
        Some(Record::Stop { ts, username }) => {
            process_stop(engine, ts, username)?;
            Ok(true)
        }
    }
}

/// `START(t, u)`: intern the username; insert an open interval unless the
/// person is already present at `t` (idempotent).
fn process_start(engine: &Engine, ts: Ts, username: &str) -> Result<(), EngineError> {
    let id = engine.names().intern(engine.db(), username)?;
    if !engine.store().is_present_at(engine.db(), id, ts)? {
        engine.store().insert(engine.db(), id, ts, TS_MAX)?;
    }
    Ok(())
}

/// `STOP(t, u)`: if `u` was never seen, record a retroactive
/// "always-was-until-t" interval. Otherwise close the open interval if the
/// person is present at `t`; a no-op if they already left.
fn process_stop(engine: &Engine, ts: Ts, username: &str) -> Result<(), EngineError> {
    match engine.names().lookup(engine.db(), username)? {
        None => {
            let id = engine.names().intern(engine.db(), username)?;
            engine.store().insert(engine.db(), id, TS_MIN, ts)?;
        }
        Some(id) => {
            if engine.store().is_present_at(engine.db(), id, ts)? {
                engine.store().close_last_open(engine.db(), id, ts)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path().join("it.db")).unwrap();
        (dir, engine)
    }

    #[test]
    fn blank_and_comment_lines_are_dropped() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# a comment"), None);
    }

    #[test]
    fn unknown_record_type_is_dropped() {
        assert_eq!(parse_line("PAUSE 100 alice"), None);
    }

    #[test]
    fn start_then_stop_closes_interval() {
        let (_dir, engine) = test_engine();
        ingest_line(&engine, "START 100 alice").unwrap();
        assert!(engine.store().is_present_at(engine.db(), 0, 150).unwrap());
        ingest_line(&engine, "STOP 200 alice").unwrap();
        assert!(!engine.store().is_present_at(engine.db(), 0, 250).unwrap());
        assert!(engine.store().is_present_at(engine.db(), 0, 150).unwrap());
    }

    #[test]
    fn r1_duplicate_start_is_idempotent() {
        let (_dir, engine) = test_engine();
        ingest_line(&engine, "START 100 alice").unwrap();
        ingest_line(&engine, "START 100 alice").unwrap();
        let matches = engine.store().overlap(engine.db(), 100, 100).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn r2_stop_after_already_stopped_is_noop() {
        let (_dir, engine) = test_engine();
        ingest_line(&engine, "START 100 alice").unwrap();
        ingest_line(&engine, "STOP 200 alice").unwrap();
        // A second, earlier STOP shouldn't touch the now-closed interval.
        ingest_line(&engine, "STOP 150 alice").unwrap();
        assert!(!engine.store().is_present_at(engine.db(), 0, 250).unwrap());
        assert!(engine.store().is_present_at(engine.db(), 0, 150).unwrap());
    }

    #[test]
    fn scenario_4_retroactive_stop() {
        let (_dir, engine) = test_engine();
        ingest_line(&engine, "STOP 2023-06-01 carol").unwrap();
        let id = engine.names().lookup(engine.db(), "carol").unwrap().unwrap();
        let point = crate::time::parse_ts("2023-01-01").unwrap();
        assert!(engine.store().is_present_at(engine.db(), id, point).unwrap());
        let later = crate::time::parse_ts("2023-07-01").unwrap();
        assert!(!engine.store().is_present_at(engine.db(), id, later).unwrap());
    }

    #[test]
    fn username_longer_than_limit_is_dropped() {
        let long = "a".repeat(USERNAME_MAX_LEN + 1);
        let line = format!("START 100 {long}");
        assert_eq!(parse_line(&line), None);
    }
}

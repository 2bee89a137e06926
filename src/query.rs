//! Maps textual queries to core operations and formats the answer (§4.7).
//!
//! Grammar: an optional leading modifier (`*` or `+`, each followed by a
//! space), then one or two whitespace-separated timestamp tokens. The reply
//! is always prefixed with `# <original query>\n` for round-trip debugging.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::gapfill::gap_fill;
use crate::model::PersonId;
use crate::split_engine::splits_from_matches;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    /// Emit each split as `<duration> <name>...`.
    ShowSplits,
    /// Emit only the names present in *every* split of the range.
    AlwaysPresent,
    /// Emit the union of present names across all splits.
    Union,
}

/// Run one query line against `engine` and return the full reply text,
/// including the leading `# <query>\n` echo.
pub fn dispatch(engine: &Engine, query_line: &str) -> Result<String, EngineError> {
    let mut out = String::new();
    let _ = writeln!(out, "# {query_line}");

    let (modifier, rest) = match query_line.chars().next() {
        Some('*') => (Modifier::ShowSplits, query_line[1..].trim_start()),
        Some('+') => (Modifier::AlwaysPresent, query_line[1..].trim_start()),
        _ => (Modifier::Union, query_line),
    };

    let mut tokens = rest.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(out);
    };
    let Some(min) = crate::time::parse_ts(first) else {
        return Ok(out);
    };

    match tokens.next() {
        None => {
            // Point query: emit usernames whose TI overlaps that instant.
            let matches = engine.store().overlap(engine.db(), min, min)?;
            let mut names = Vec::new();
            for m in matches {
                if let Some(name) = engine.names().name_of(engine.db(), m.person_id)? {
                    names.push(name);
                }
            }
            for name in names {
                let _ = writeln!(out, "{name}");
            }
        }
        Some(second) => {
            let Some(max) = crate::time::parse_ts(second) else {
                return Ok(out);
            };
            let matches = engine.store().overlap(engine.db(), min, max)?;
            let primary = splits_from_matches(&matches);
            let splits = gap_fill(engine.store(), engine.db(), primary, min, max)?;

            match modifier {
                Modifier::ShowSplits => {
                    for split in &splits {
                        let mut line = split.duration().to_string();
                        for &person_id in &split.present {
                            if let Some(name) = engine.names().name_of(engine.db(), person_id)? {
                                line.push(' ');
                                line.push_str(&name);
                            }
                        }
                        let _ = writeln!(out, "{line}");
                    }
                }
                Modifier::Union | Modifier::AlwaysPresent => {
                    let ids = aggregate_present(&splits, modifier);
                    for id in ids {
                        if let Some(name) = engine.names().name_of(engine.db(), id)? {
                            let _ = writeln!(out, "{name}");
                        }
                    }
                }
            }
        }
    }

    Ok(out)
}

fn aggregate_present(splits: &[crate::model::Split], modifier: Modifier) -> Vec<PersonId> {
    match modifier {
        Modifier::Union => {
            let mut union: BTreeSet<PersonId> = BTreeSet::new();
            for split in splits {
                union.extend(split.present.iter().copied());
            }
            union.into_iter().collect()
        }
        Modifier::AlwaysPresent => {
            let mut iter = splits.iter();
            let Some(first) = iter.next() else {
                return Vec::new();
            };
            let mut always: BTreeSet<PersonId> = first.present.clone();
            for split in iter {
                always.retain(|id| split.present.contains(id));
            }
            always.into_iter().collect()
        }
        Modifier::ShowSplits => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path().join("it.db")).unwrap();
        for line in [
            "START 2022-01-01 alice",
            "START 2022-02-01 bob",
            "STOP  2022-03-01 alice",
            "STOP  2022-04-01 bob",
        ] {
            crate::presence_log::ingest_line(&engine, line).unwrap();
        }
        (dir, engine)
    }

    #[test]
    fn scenario_1_show_splits() {
        let (_dir, engine) = seeded_engine();
        let reply = dispatch(&engine, "* 2022-01-01 2022-04-01").unwrap();
        let mut lines = reply.lines();
        assert_eq!(lines.next().unwrap(), "# * 2022-01-01 2022-04-01");
        assert_eq!(lines.next().unwrap(), "2678400 alice");
        assert_eq!(lines.next().unwrap(), "2419200 alice bob");
        assert_eq!(lines.next().unwrap(), "2678400 bob");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn scenario_2_default_union() {
        let (_dir, engine) = seeded_engine();
        let reply = dispatch(&engine, "2022-01-01 2022-04-01").unwrap();
        let names: BTreeSet<&str> = reply.lines().skip(1).collect();
        assert_eq!(names, BTreeSet::from(["alice", "bob"]));
    }

    #[test]
    fn scenario_3_always_present() {
        let (_dir, engine) = seeded_engine();
        let reply = dispatch(&engine, "+ 2022-01-15 2022-02-15").unwrap();
        let names: Vec<&str> = reply.lines().skip(1).collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[test]
    fn scenario_6_point_query_for_open_interval() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path().join("it.db")).unwrap();
        crate::presence_log::ingest_line(&engine, "START 2022-01-01 dave").unwrap();
        let reply = dispatch(&engine, "now").unwrap();
        let names: Vec<&str> = reply.lines().skip(1).collect();
        assert_eq!(names, vec!["dave"]);
    }

    #[test]
    fn scenario_6_interval_query_still_present() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path().join("it.db")).unwrap();
        crate::presence_log::ingest_line(&engine, "START 2022-01-01 dave").unwrap();
        let reply = dispatch(&engine, "* 2022-01-01 now").unwrap();
        let mut lines = reply.lines().skip(1);
        let split_line = lines.next().unwrap();
        assert!(split_line.ends_with("dave"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn query_echo_prefix_always_present() {
        let (_dir, engine) = seeded_engine();
        let reply = dispatch(&engine, "2022-01-01").unwrap();
        assert!(reply.starts_with("# 2022-01-01\n"));
    }

    #[test]
    fn malformed_query_yields_only_echo() {
        let (_dir, engine) = seeded_engine();
        let reply = dispatch(&engine, "not-a-date").unwrap();
        assert_eq!(reply, "# not-a-date\n");
    }
}

//! Sweep-line transform of a match list into an ordered sequence of splits
//! with per-split presence sets (§4.5).

use std::collections::BTreeSet;

use crate::model::{EventKind, ISplit, Match, Split};

/// Convert a (possibly empty) list of clipped matches into maximal
/// sub-intervals over which the present set is constant.
pub fn splits_from_matches(matches: &[Match]) -> Vec<Split> {
    if matches.is_empty() {
        return Vec::new();
    }

    let mut events: Vec<ISplit> = Vec::with_capacity(matches.len() * 2);
    for m in matches {
        events.push(ISplit { ts: m.t_min, kind: EventKind::Open, person_id: m.person_id });
        events.push(ISplit { ts: m.t_max, kind: EventKind::Close, person_id: m.person_id });
    }
    // Open < Close at equal ts, so a point interval cancels itself out.
    events.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.kind.cmp(&b.kind)));

    let mut present: BTreeSet<_> = BTreeSet::new();
    let mut splits = Vec::new();

    for pair in events.windows(2) {
        let (ev, next) = (pair[0], pair[1]);
        match ev.kind {
            EventKind::Open => {
                present.insert(ev.person_id);
            }
            EventKind::Close => {
                present.remove(&ev.person_id);
            }
        }

        if ev.ts == next.ts {
            continue; // zero-width split
        }
        splits.push(Split { t_min: ev.ts, t_max: next.ts, present: present.clone() });
    }

    splits
}

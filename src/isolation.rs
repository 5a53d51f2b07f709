use std::collections::{BTreeMap, HashSet};

use crate::models::{Edge, IsolationRow, StudentRow};

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationStats {
    pub student_count: usize,
    pub isolated_in_share: f64,
    pub isolated_out_share: f64,
    pub reciprocity_share: f64,
}

/// Per-classroom isolation and reciprocity for one domain.
///
/// In-degree only counts nominations whose nominee sits in the same
/// classroom; out-degree counts every non-empty slot. Reciprocity is taken
/// over the distinct within-classroom edge set, so a duplicated nomination
/// cannot inflate the ratio. An empty classroom or a classroom without
/// edges reports 0 for the affected share rather than dividing by zero.
pub fn classroom_isolation(
    rows: &[StudentRow],
    edges: &[Edge],
    domain: &str,
) -> BTreeMap<String, IsolationStats> {
    let mut members: BTreeMap<String, HashSet<i64>> = BTreeMap::new();
    for row in rows {
        members
            .entry(row.classroom.clone())
            .or_default()
            .insert(row.student_id);
    }

    let mut stats = BTreeMap::new();
    for (classroom, students) in &members {
        let within: HashSet<(i64, i64)> = edges
            .iter()
            .filter(|e| e.classroom == *classroom && students.contains(&e.to))
            .map(|e| (e.from, e.to))
            .collect();

        let nominated: HashSet<i64> = within.iter().map(|&(_, to)| to).collect();
        let isolated_in = students.iter().filter(|s| !nominated.contains(s)).count();

        // A student is out-isolated when no row of theirs has a single
        // non-empty slot, dangling nominees included.
        let mut has_outgoing: HashSet<i64> = HashSet::new();
        for row in rows {
            if row.classroom == *classroom && row.out_degree(domain) > 0 {
                has_outgoing.insert(row.student_id);
            }
        }
        let isolated_out = students.iter().filter(|s| !has_outgoing.contains(s)).count();

        let reciprocated = within
            .iter()
            .filter(|&&(from, to)| within.contains(&(to, from)))
            .count();

        let student_count = students.len();
        let share = |count: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        stats.insert(
            classroom.clone(),
            IsolationStats {
                student_count,
                isolated_in_share: share(isolated_in, student_count),
                isolated_out_share: share(isolated_out, student_count),
                reciprocity_share: share(reciprocated, within.len()),
            },
        );
    }
    stats
}

/// Flattens per-classroom stats into serializable output rows.
pub fn isolation_rows(
    stats: &BTreeMap<String, IsolationStats>,
    domain: &str,
) -> Vec<IsolationRow> {
    stats
        .iter()
        .map(|(classroom, s)| IsolationRow {
            classroom: classroom.clone(),
            domain: domain.to_string(),
            student_count: s.student_count,
            isolated_in_share: s.isolated_in_share,
            isolated_out_share: s.isolated_out_share,
            reciprocity_share: s.reciprocity_share,
        })
        .collect()
}

use std::collections::{BTreeMap, HashMap};

use crate::ability::AbilityIndex;
use crate::models::{Ability, DegreeCounts, Edge, RosterWarning, StudentRow};

/// Expands nomination slots into a directed edge list for one domain.
///
/// Edges appear in roster order, slot by slot. Duplicates are kept as-is
/// and self-nominations are not filtered; callers that need a distinct
/// edge set dedupe themselves. Dangling nominees (ids absent from the
/// roster) are kept too, so raw out-degree counts stay honest.
pub fn build_edges(rows: &[StudentRow], domain: &str) -> Vec<Edge> {
    let mut edges = Vec::new();
    for row in rows {
        for slot in row.slots(domain).into_iter().flatten() {
            edges.push(Edge {
                from: row.student_id,
                to: slot,
                classroom: row.classroom.clone(),
            });
        }
    }
    edges
}

/// Per-classroom out-degree distributions split by ability, the sole input
/// the chance-level calculator needs. A student lands in `low[k-1]` or
/// `high[k-1]` when they sent exactly k nominations; unknown-ability
/// students and students with zero nominations are left out.
pub fn degree_counts(
    rows: &[StudentRow],
    domain: &str,
    abilities: &AbilityIndex,
) -> BTreeMap<String, DegreeCounts> {
    let mut by_classroom: BTreeMap<String, DegreeCounts> = BTreeMap::new();
    for row in rows {
        let sent = row.out_degree(domain);
        if sent == 0 {
            continue;
        }
        let counts = by_classroom.entry(row.classroom.clone()).or_default();
        match abilities.lookup(row.student_id) {
            Ability::Low => counts.low[sent - 1] += 1,
            Ability::High => counts.high[sent - 1] += 1,
            Ability::Unknown => {}
        }
    }
    by_classroom
}

/// Data-quality pass over every nomination: nominees missing from the
/// roster and nominees sitting in a different classroom. Both are
/// reported, neither is fatal.
pub fn nomination_anomalies(rows: &[StudentRow], domains: &[String]) -> Vec<RosterWarning> {
    let classroom_of: HashMap<i64, &str> = rows
        .iter()
        .map(|row| (row.student_id, row.classroom.as_str()))
        .collect();

    let mut warnings = Vec::new();
    for row in rows {
        for domain in domains {
            for nominee in row.slots(domain).into_iter().flatten() {
                match classroom_of.get(&nominee) {
                    None => warnings.push(RosterWarning::UnknownNominee {
                        student_id: row.student_id,
                        nominee_id: nominee,
                        domain: domain.clone(),
                    }),
                    Some(classroom) if *classroom != row.classroom => {
                        warnings.push(RosterWarning::CrossClassroomNomination {
                            student_id: row.student_id,
                            nominee_id: nominee,
                            domain: domain.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }
    warnings
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashMap;

    use crate::models::{Ability, StudentRow, SLOT_COUNT};

    /// Builds a roster row with one domain called "emot".
    pub fn row(
        classroom: &str,
        student_id: i64,
        ability: Ability,
        nominees: [Option<i64>; SLOT_COUNT],
    ) -> StudentRow {
        let mut nominations = HashMap::new();
        nominations.insert("emot".to_string(), nominees);
        StudentRow {
            classroom: classroom.to_string(),
            student_id,
            ability,
            nominations,
        }
    }
}

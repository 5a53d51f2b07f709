use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ability::AbilityIndex;
use crate::models::{Ability, ColemanRow, Edge, StudentHomophilyRow, StudentRow};

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Per-student same-ability contact from the nominator's perspective.
///
/// A contact is same-type only when both the student's and the nominee's
/// ability is known and equal. Nominees with unknown ability stay out of
/// both the numerator and the denominator, so the share is undefined
/// (`None`) for students whose own ability is unknown or who have no
/// known-ability nominees at all.
pub fn student_homophily(
    rows: &[StudentRow],
    domain: &str,
    abilities: &AbilityIndex,
) -> Vec<StudentHomophilyRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let own = abilities.lookup(row.student_id);
        let mut same_count = 0;
        let mut known_peer_count = 0;
        for nominee in row.slots(domain).into_iter().flatten() {
            let peer = abilities.lookup(nominee);
            if !peer.is_known() {
                continue;
            }
            known_peer_count += 1;
            if own.is_known() && peer == own {
                same_count += 1;
            }
        }
        let same_share = if own.is_known() {
            ratio(same_count, known_peer_count)
        } else {
            None
        };
        out.push(StudentHomophilyRow {
            classroom: row.classroom.clone(),
            student_id: row.student_id,
            domain: domain.to_string(),
            ability: own.label(),
            same_count,
            same_any: u8::from(same_count > 0),
            known_peer_count,
            same_share,
        });
    }
    out
}

/// The same triple from the nominee's perspective: how many same-ability
/// nominations each roster student receives, over received nominations
/// whose nominator's ability is known. One output row per distinct
/// student, in roster order.
pub fn indegree_homophily(
    rows: &[StudentRow],
    edges: &[Edge],
    domain: &str,
    abilities: &AbilityIndex,
) -> Vec<StudentHomophilyRow> {
    let mut received: HashMap<i64, (usize, usize)> = HashMap::new();
    for edge in edges {
        let nominator = abilities.lookup(edge.from);
        if !nominator.is_known() {
            continue;
        }
        let entry = received.entry(edge.to).or_insert((0, 0));
        entry.1 += 1;
        let nominee = abilities.lookup(edge.to);
        if nominee.is_known() && nominee == nominator {
            entry.0 += 1;
        }
    }

    let mut seen: HashSet<i64> = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if !seen.insert(row.student_id) {
            continue;
        }
        let own = abilities.lookup(row.student_id);
        let (same_count, known_nominators) =
            received.get(&row.student_id).copied().unwrap_or((0, 0));
        let same_share = if own.is_known() {
            ratio(same_count, known_nominators)
        } else {
            None
        };
        out.push(StudentHomophilyRow {
            classroom: row.classroom.clone(),
            student_id: row.student_id,
            domain: domain.to_string(),
            ability: own.label(),
            same_count,
            same_any: u8::from(same_count > 0),
            known_peer_count: known_nominators,
            same_share,
        });
    }
    out
}

/// Classroom-level Coleman homophily index per ability type.
///
/// For type t, `share_tt` is the fraction of within-classroom nominations
/// sent by t-students to known-ability nominees that land on t-students.
/// The index normalizes the excess over the population share:
/// `(share_tt - pop_share_t) / (1 - pop_share_t)`. It is undefined when
/// the classroom has no t-students, when t-students sent no nominations
/// with a known-ability nominee, or when `pop_share_t` is 1.
pub fn coleman(
    rows: &[StudentRow],
    edges: &[Edge],
    domain: &str,
    abilities: &AbilityIndex,
) -> Vec<ColemanRow> {
    let mut members: BTreeMap<String, HashSet<i64>> = BTreeMap::new();
    for row in rows {
        members
            .entry(row.classroom.clone())
            .or_default()
            .insert(row.student_id);
    }

    let mut out = Vec::new();
    for (classroom, students) in &members {
        let mut low_count = 0;
        let mut high_count = 0;
        for &id in students {
            match abilities.lookup(id) {
                Ability::Low => low_count += 1,
                Ability::High => high_count += 1,
                Ability::Unknown => {}
            }
        }

        // Only within-classroom nominations with a known nominee ability
        // enter the tie counts; dangling and cross-classroom edges do not.
        let mut low_low = 0;
        let mut high_high = 0;
        let mut low_known = 0;
        let mut high_known = 0;
        for edge in edges {
            if edge.classroom != *classroom || !students.contains(&edge.to) {
                continue;
            }
            let from = abilities.lookup(edge.from);
            let to = abilities.lookup(edge.to);
            if !to.is_known() {
                continue;
            }
            match from {
                Ability::Low => {
                    low_known += 1;
                    if to == Ability::Low {
                        low_low += 1;
                    }
                }
                Ability::High => {
                    high_known += 1;
                    if to == Ability::High {
                        high_high += 1;
                    }
                }
                Ability::Unknown => {}
            }
        }

        let student_count = students.len();
        let low_share = low_count as f64 / student_count as f64;
        let high_share = high_count as f64 / student_count as f64;

        let low_low_share = if low_count == 0 { None } else { ratio(low_low, low_known) };
        let high_high_share = if high_count == 0 { None } else { ratio(high_high, high_known) };

        let index = |share: Option<f64>, pop_share: f64| -> Option<f64> {
            let share = share?;
            if pop_share >= 1.0 {
                return None;
            }
            Some((share - pop_share) / (1.0 - pop_share))
        };

        out.push(ColemanRow {
            classroom: classroom.clone(),
            domain: domain.to_string(),
            student_count,
            low_count,
            high_count,
            low_share,
            high_share,
            low_low_share,
            high_high_share,
            homophily_low: index(low_low_share, low_share),
            homophily_high: index(high_high_share, high_share),
        });
    }
    out
}

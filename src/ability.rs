use std::collections::HashMap;

use crate::models::{Ability, RosterWarning, StudentRow};

/// Immutable student-id -> ability lookup for one trait, built once per run
/// from the deduplicated roster.
///
/// Duplicate rows for the same identifier must agree on the derived label:
/// the first known value wins, rows with an unknown label never conflict,
/// and a second known-but-different value demotes the identifier to
/// `Unknown` for the rest of the run.
#[derive(Debug, Clone)]
pub struct AbilityIndex {
    map: HashMap<i64, Ability>,
}

impl AbilityIndex {
    pub fn build(rows: &[StudentRow]) -> (AbilityIndex, Vec<RosterWarning>) {
        let mut map: HashMap<i64, Ability> = HashMap::new();
        let mut conflicted: Vec<i64> = Vec::new();

        for row in rows {
            match map.get(&row.student_id).copied() {
                None => {
                    map.insert(row.student_id, row.ability);
                }
                Some(Ability::Unknown) => {
                    if !conflicted.contains(&row.student_id) {
                        map.insert(row.student_id, row.ability);
                    }
                }
                Some(existing) => {
                    if row.ability.is_known() && row.ability != existing {
                        map.insert(row.student_id, Ability::Unknown);
                        if !conflicted.contains(&row.student_id) {
                            conflicted.push(row.student_id);
                        }
                    }
                }
            }
        }

        let warnings = conflicted
            .into_iter()
            .map(|student_id| RosterWarning::ConflictingTrait { student_id })
            .collect();
        (AbilityIndex { map }, warnings)
    }

    /// Total over any identifier: ids absent from the roster are `Unknown`.
    pub fn lookup(&self, student_id: i64) -> Ability {
        self.map
            .get(&student_id)
            .copied()
            .unwrap_or(Ability::Unknown)
    }

    pub fn contains(&self, student_id: i64) -> bool {
        self.map.contains_key(&student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(student_id: i64, ability: Ability) -> StudentRow {
        StudentRow {
            classroom: "101".to_string(),
            student_id,
            ability,
            nominations: HashMap::new(),
        }
    }

    #[test]
    fn first_known_value_wins() {
        let rows = vec![row(1, Ability::High), row(1, Ability::High)];
        let (index, warnings) = AbilityIndex::build(&rows);
        assert_eq!(index.lookup(1), Ability::High);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_rows_do_not_conflict() {
        let rows = vec![row(1, Ability::Unknown), row(1, Ability::Low)];
        let (index, warnings) = AbilityIndex::build(&rows);
        assert_eq!(index.lookup(1), Ability::Low);
        assert!(warnings.is_empty());
    }

    #[test]
    fn conflicting_values_demote_to_unknown() {
        let rows = vec![row(1, Ability::High), row(1, Ability::Low)];
        let (index, warnings) = AbilityIndex::build(&rows);
        assert_eq!(index.lookup(1), Ability::Unknown);
        assert_eq!(
            warnings,
            vec![RosterWarning::ConflictingTrait { student_id: 1 }]
        );
    }

    #[test]
    fn conflicted_id_stays_unknown_after_more_rows() {
        let rows = vec![
            row(1, Ability::High),
            row(1, Ability::Low),
            row(1, Ability::High),
        ];
        let (index, warnings) = AbilityIndex::build(&rows);
        assert_eq!(index.lookup(1), Ability::Unknown);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn absent_id_is_unknown_never_a_panic() {
        let (index, _) = AbilityIndex::build(&[row(1, Ability::High)]);
        assert_eq!(index.lookup(999), Ability::Unknown);
        assert!(!index.contains(999));
    }
}

use std::collections::{BTreeMap, BTreeSet};

use crate::ability::AbilityIndex;
use crate::graph::degree_counts;
use crate::models::{DegreeCounts, Edge, SegregationRow, StudentRow, SLOT_COUNT};

/// Binomial coefficient, exact. Pool sizes here are classroom-sized, far
/// from overflowing; the running product stays divisible at every step.
fn comb(n: u64, k: u64) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) as u128 / (i as u128 + 1);
    }
    result
}

/// Triangular hypergeometric table for one group: `p[i-1][j-1]` is the
/// probability that a student drawing `i` nominees without replacement
/// from a pool of `favorable` opposite-group peers and `own_others`
/// own-group peers (self already excluded) hits exactly `j` favorable
/// draws, for i = 1..3 and j = 1..i. Cells where the pool is smaller than
/// the draw are 0.
fn contact_table(favorable: u64, own_others: u64) -> [[f64; SLOT_COUNT]; SLOT_COUNT] {
    let mut p = [[0.0; SLOT_COUNT]; SLOT_COUNT];
    for i in 1..=SLOT_COUNT as u64 {
        let den = comb(favorable + own_others, i);
        if den == 0 {
            continue;
        }
        for j in 1..=i {
            let num = comb(favorable, j) * comb(own_others, i - j);
            p[(i - 1) as usize][(j - 1) as usize] = num as f64 / den as f64;
        }
    }
    p
}

/// Chance-level expected share of nominations landing on the opposite
/// ability group, given only how many nominations each group sent.
///
/// Defined only when both groups have at least one student with at least
/// one nomination; otherwise there is no mixing to expect and the result
/// is `None` rather than 0.
pub fn expected_cross_share(counts: &DegreeCounts) -> Option<f64> {
    let total_low: u64 = counts.low.iter().sum();
    let total_high: u64 = counts.high.iter().sum();
    if total_low == 0 || total_high == 0 {
        return None;
    }

    let p_low = contact_table(total_high, total_low - 1);
    let p_high = contact_table(total_low, total_high - 1);

    let mut num = 0.0;
    for x in 1..=SLOT_COUNT {
        for y in 1..=x {
            num += counts.low[x - 1] as f64 * p_low[x - 1][y - 1] * y as f64;
            num += counts.high[x - 1] as f64 * p_high[x - 1][y - 1] * y as f64;
        }
    }

    let mut den = 0.0;
    for k in 1..=SLOT_COUNT {
        den += k as f64 * (counts.low[k - 1] + counts.high[k - 1]) as f64;
    }
    Some(num / den)
}

/// Observed cross-ability contact per nominator classroom: nominations
/// where both endpoints' ability is known and the labels differ, over all
/// known-pair nominations.
pub fn observed_cross(
    edges: &[Edge],
    abilities: &AbilityIndex,
) -> BTreeMap<String, (usize, usize)> {
    let mut by_classroom: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for edge in edges {
        let from = abilities.lookup(edge.from);
        let to = abilities.lookup(edge.to);
        if !from.is_known() || !to.is_known() {
            continue;
        }
        let entry = by_classroom.entry(edge.classroom.clone()).or_insert((0, 0));
        entry.1 += 1;
        if from != to {
            entry.0 += 1;
        }
    }
    by_classroom
}

/// One output row per classroom: the degree-distribution vectors, the
/// chance-level index mu, and the observed cross-ability share to compare
/// it against.
pub fn classroom_segregation(
    rows: &[StudentRow],
    edges: &[Edge],
    domain: &str,
    abilities: &AbilityIndex,
) -> Vec<SegregationRow> {
    let counts = degree_counts(rows, domain, abilities);
    let observed = observed_cross(edges, abilities);

    let classrooms: BTreeSet<&str> = rows.iter().map(|r| r.classroom.as_str()).collect();

    let mut out = Vec::new();
    for classroom in classrooms {
        let c = counts.get(classroom).cloned().unwrap_or_default();
        let (cross_count, known_pair_count) =
            observed.get(classroom).copied().unwrap_or((0, 0));
        let observed_cross_share = if known_pair_count == 0 {
            None
        } else {
            Some(cross_count as f64 / known_pair_count as f64)
        };
        out.push(SegregationRow {
            classroom: classroom.to_string(),
            domain: domain.to_string(),
            low_1: c.low[0],
            low_2: c.low[1],
            low_3: c.low[2],
            high_1: c.high[0],
            high_2: c.high[1],
            high_3: c.high[2],
            mu: expected_cross_share(&c),
            cross_count,
            known_pair_count,
            observed_cross_share,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityIndex;
    use crate::graph::build_edges;
    use crate::graph::fixtures::row;
    use crate::models::Ability;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn binomial_coefficients() {
        assert_eq!(comb(5, 0), 1);
        assert_eq!(comb(5, 2), 10);
        assert_eq!(comb(5, 5), 1);
        assert_eq!(comb(3, 4), 0);
        assert_eq!(comb(40, 20), 137_846_528_820);
    }

    #[test]
    fn table_is_triangular_and_hypergeometric() {
        // 2 favorable, 1 own-group peer: drawing one nominee from a pool
        // of 3 hits the opposite group with probability 2/3.
        let p = contact_table(2, 1);
        assert!((p[0][0] - 2.0 / 3.0).abs() < TOLERANCE);
        assert_eq!(p[0][1], 0.0);
        assert_eq!(p[0][2], 0.0);
        assert_eq!(p[1][2], 0.0);
        // Drawing two from the pool of 3: exactly one favorable is
        // C(2,1)C(1,1)/C(3,2) = 2/3, both favorable C(2,2)/C(3,2) = 1/3.
        assert!((p[1][0] - 2.0 / 3.0).abs() < TOLERANCE);
        assert!((p[1][1] - 1.0 / 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn draws_larger_than_pool_yield_zero_cells() {
        // One opposite peer, no own-group peers: only a single draw is
        // possible, the i = 2 and i = 3 rows stay zero.
        let p = contact_table(1, 0);
        assert!((p[0][0] - 1.0).abs() < TOLERANCE);
        assert_eq!(p[1][0], 0.0);
        assert_eq!(p[1][1], 0.0);
        assert_eq!(p[2][2], 0.0);
    }

    #[test]
    fn two_against_two_single_nominations() {
        // 2 low and 2 high students, each sending one nomination:
        // num = 2*(2/3) + 2*(2/3) = 8/3, den = 4, mu = 2/3.
        let counts = DegreeCounts {
            low: [2, 0, 0],
            high: [2, 0, 0],
        };
        let mu = expected_cross_share(&counts).unwrap();
        assert!((mu - 2.0 / 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn undefined_when_a_group_sent_nothing() {
        let counts = DegreeCounts {
            low: [0, 0, 0],
            high: [2, 1, 0],
        };
        assert_eq!(expected_cross_share(&counts), None);
        assert_eq!(expected_cross_share(&DegreeCounts::default()), None);
    }

    #[test]
    fn lone_minority_student_meets_an_all_opposite_pool() {
        // 1 low student among 3 high students, everyone nominating once.
        // The low student's pool is entirely opposite-group: p = 1.
        // Each high student draws from 1 low + 2 high: p = 1/3.
        // num = 1*1 + 3*(1/3) = 2, den = 4, mu = 1/2.
        let counts = DegreeCounts {
            low: [1, 0, 0],
            high: [3, 0, 0],
        };
        let mu = expected_cross_share(&counts).unwrap();
        assert!((mu - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn three_nomination_rows_use_the_full_triangle() {
        // 3 low + 3 high, everyone sending all 3 nominations. For either
        // group: E[favorable draws] = (3*1 + 6*2 + 1*3)/10 = 1.8, so
        // num = 6*1.8 = 10.8 and den = 18, mu = 0.6.
        let counts = DegreeCounts {
            low: [0, 0, 3],
            high: [0, 0, 3],
        };
        let mu = expected_cross_share(&counts).unwrap();
        assert!((mu - 0.6).abs() < TOLERANCE);
    }

    #[test]
    fn segregation_rows_combine_mu_with_observed_cross_share() {
        // Four students, one nomination each, every nomination crossing
        // the ability line: observed share 1, mu 2/3.
        let rows = vec![
            row("101", 1, Ability::Low, [Some(3), None, None]),
            row("101", 2, Ability::Low, [Some(4), None, None]),
            row("101", 3, Ability::High, [Some(1), None, None]),
            row("101", 4, Ability::High, [Some(2), None, None]),
        ];
        let (abilities, _) = AbilityIndex::build(&rows);
        let edges = build_edges(&rows, "emot");
        let result = classroom_segregation(&rows, &edges, "emot", &abilities);
        assert_eq!(result.len(), 1);
        let r = &result[0];
        assert_eq!((r.low_1, r.low_2, r.low_3), (2, 0, 0));
        assert_eq!((r.high_1, r.high_2, r.high_3), (2, 0, 0));
        assert!((r.mu.unwrap() - 2.0 / 3.0).abs() < TOLERANCE);
        assert_eq!(r.cross_count, 4);
        assert_eq!(r.known_pair_count, 4);
        assert!((r.observed_cross_share.unwrap() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn classroom_without_nominations_still_gets_a_row() {
        let rows = vec![
            row("101", 1, Ability::Low, [None, None, None]),
            row("101", 2, Ability::High, [None, None, None]),
        ];
        let (abilities, _) = AbilityIndex::build(&rows);
        let edges = build_edges(&rows, "emot");
        let result = classroom_segregation(&rows, &edges, "emot", &abilities);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].mu, None);
        assert_eq!(result[0].observed_cross_share, None);
    }

    #[test]
    fn dangling_nominee_counts_toward_degree_but_not_observed_pairs() {
        let rows = vec![
            row("101", 1, Ability::Low, [Some(999), None, None]),
            row("101", 2, Ability::High, [Some(1), None, None]),
        ];
        let (abilities, _) = AbilityIndex::build(&rows);
        let edges = build_edges(&rows, "emot");
        let r = &classroom_segregation(&rows, &edges, "emot", &abilities)[0];
        // Both students sent one nomination, so both vectors see them.
        assert_eq!(r.low_1, 1);
        assert_eq!(r.high_1, 1);
        // Only 2 -> 1 has both abilities known.
        assert_eq!(r.known_pair_count, 1);
        assert_eq!(r.cross_count, 1);
    }
}

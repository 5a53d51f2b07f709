use std::fmt::Write;

use chrono::NaiveDate;

use crate::ability::AbilityIndex;
use crate::graph::build_edges;
use crate::homophily;
use crate::isolation;
use crate::models::{RosterWarning, StudentRow};
use crate::segregation;

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "undefined".to_string(),
    }
}

/// Builds a markdown summary across all classrooms and domains: isolation,
/// reciprocity, Coleman homophily, and the chance-level segregation
/// baseline next to the observed cross-ability share.
pub fn build_report(
    generated_on: NaiveDate,
    rows: &[StudentRow],
    domains: &[String],
    abilities: &AbilityIndex,
    warnings: &[RosterWarning],
) -> String {
    let mut output = String::new();

    let classroom_count = {
        let mut classrooms: Vec<&str> = rows.iter().map(|r| r.classroom.as_str()).collect();
        classrooms.sort_unstable();
        classrooms.dedup();
        classrooms.len()
    };

    let _ = writeln!(output, "# Classroom Network Report");
    let _ = writeln!(
        output,
        "Generated on {} from {} roster rows across {} classrooms.",
        generated_on,
        rows.len(),
        classroom_count
    );

    for domain in domains {
        let edges = build_edges(rows, domain);

        let _ = writeln!(output);
        let _ = writeln!(output, "## Domain: {domain}");
        let _ = writeln!(output);
        let _ = writeln!(output, "### Isolation and Reciprocity");

        let stats = isolation::classroom_isolation(rows, &edges, domain);
        if stats.is_empty() {
            let _ = writeln!(output, "No classrooms in the roster.");
        }
        for (classroom, s) in &stats {
            let _ = writeln!(
                output,
                "- classroom {}: {} students, isolated in {:.3}, isolated out {:.3}, reciprocity {:.3}",
                classroom,
                s.student_count,
                s.isolated_in_share,
                s.isolated_out_share,
                s.reciprocity_share
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Coleman Homophily");
        for r in homophily::coleman(rows, &edges, domain, abilities) {
            let _ = writeln!(
                output,
                "- classroom {}: low {} high {}, homophily low {}, homophily high {}",
                r.classroom,
                r.low_count,
                r.high_count,
                fmt_opt(r.homophily_low),
                fmt_opt(r.homophily_high)
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Segregation Baseline");
        for r in segregation::classroom_segregation(rows, &edges, domain, abilities) {
            let _ = writeln!(
                output,
                "- classroom {}: chance-level cross share {}, observed cross share {}",
                r.classroom,
                fmt_opt(r.mu),
                fmt_opt(r.observed_cross_share)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    if warnings.is_empty() {
        let _ = writeln!(output, "No data-quality findings.");
    } else {
        for warning in warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::row;
    use crate::models::Ability;

    #[test]
    fn report_covers_every_section() {
        let rows = vec![
            row("101", 1, Ability::Low, [Some(2), None, None]),
            row("101", 2, Ability::High, [Some(1), None, None]),
        ];
        let (abilities, warnings) = AbilityIndex::build(&rows);
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(date, &rows, &["emot".to_string()], &abilities, &warnings);

        assert!(report.contains("# Classroom Network Report"));
        assert!(report.contains("Generated on 2026-03-01"));
        assert!(report.contains("## Domain: emot"));
        assert!(report.contains("### Isolation and Reciprocity"));
        assert!(report.contains("### Coleman Homophily"));
        assert!(report.contains("### Segregation Baseline"));
        assert!(report.contains("No data-quality findings."));
    }

    #[test]
    fn undefined_statistics_are_spelled_out() {
        // Single-type classroom: the chance-level index has no meaning.
        let rows = vec![
            row("101", 1, Ability::High, [Some(2), None, None]),
            row("101", 2, Ability::High, [None, None, None]),
        ];
        let (abilities, warnings) = AbilityIndex::build(&rows);
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(date, &rows, &["emot".to_string()], &abilities, &warnings);
        assert!(report.contains("chance-level cross share undefined"));
    }

    #[test]
    fn warnings_surface_in_the_report() {
        let rows = vec![
            row("101", 1, Ability::High, [Some(2), None, None]),
            row("101", 1, Ability::Low, [None, None, None]),
            row("101", 2, Ability::Low, [None, None, None]),
        ];
        let (abilities, warnings) = AbilityIndex::build(&rows);
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(date, &rows, &["emot".to_string()], &abilities, &warnings);
        assert!(report.contains("conflicting trait values"));
    }
}

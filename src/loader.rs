use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::models::{Ability, DomainSpec, RosterWarning, StudentRow, SLOT_COUNT};

/// Column selection for a roster file. Defaults match the follow-up survey
/// export; every name can be overridden from the CLI.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub classroom_col: String,
    pub student_col: String,
    pub trait_col: String,
    pub domains: Vec<DomainSpec>,
}

/// Outcome of coercing one identifier cell.
enum IdCell {
    Empty,
    Malformed,
    Id(i64),
}

/// Identifier cells arrive as integers, floats ("103.0" after a spreadsheet
/// round-trip), or junk. Blank and NA-style cells are empty slots; anything
/// else that fails coercion is malformed.
fn parse_id_cell(cell: &str) -> IdCell {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan") {
        return IdCell::Empty;
    }
    if let Ok(id) = trimmed.parse::<i64>() {
        return IdCell::Id(id);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => IdCell::Id(value as i64),
        _ => IdCell::Malformed,
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> anyhow::Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("roster file has no column named {name:?}"))
}

/// Reads a roster from any CSV source. Rows whose own student id cannot be
/// coerced are skipped with a warning; everything else is kept.
pub fn read_roster<R: Read>(
    reader: R,
    config: &RosterConfig,
) -> anyhow::Result<(Vec<StudentRow>, Vec<RosterWarning>)> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let classroom_idx = column_index(&headers, &config.classroom_col)?;
    let student_idx = column_index(&headers, &config.student_col)?;
    let trait_idx = column_index(&headers, &config.trait_col)?;

    let mut slot_indices: Vec<(String, Vec<(String, usize)>)> = Vec::new();
    for domain in &config.domains {
        let mut indices = Vec::new();
        for slot in &domain.slots {
            indices.push((slot.clone(), column_index(&headers, slot)?));
        }
        slot_indices.push((domain.name.clone(), indices));
    }

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let student_cell = record.get(student_idx).unwrap_or("");
        let student_id = match parse_id_cell(student_cell) {
            IdCell::Id(id) => id,
            _ => {
                warnings.push(RosterWarning::MalformedStudentId {
                    line,
                    value: student_cell.to_string(),
                });
                continue;
            }
        };

        let classroom = record.get(classroom_idx).unwrap_or("").trim().to_string();
        let ability = Ability::parse(record.get(trait_idx));

        let mut nominations = HashMap::new();
        for (domain_name, indices) in &slot_indices {
            let mut slots = [None; SLOT_COUNT];
            for (slot_position, (column, idx)) in indices.iter().enumerate() {
                let cell = record.get(*idx).unwrap_or("");
                match parse_id_cell(cell) {
                    IdCell::Id(id) => slots[slot_position] = Some(id),
                    IdCell::Empty => {}
                    IdCell::Malformed => {
                        warnings.push(RosterWarning::MalformedIdentifier {
                            student_id,
                            column: column.clone(),
                            value: cell.to_string(),
                        });
                    }
                }
            }
            nominations.insert(domain_name.clone(), slots);
        }

        rows.push(StudentRow {
            classroom,
            student_id,
            ability,
            nominations,
        });
    }

    Ok((rows, warnings))
}

pub fn load_roster(
    path: &Path,
    config: &RosterConfig,
) -> anyhow::Result<(Vec<StudentRow>, Vec<RosterWarning>)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open roster file {}", path.display()))?;
    read_roster(file, config)
}

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Number of nominee slots per relationship domain in this survey family.
pub const SLOT_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    Low,
    High,
    Unknown,
}

impl Ability {
    /// Parses a trait cell. The survey encodes ability as yes/no, some
    /// exports carry 1/0 instead.
    pub fn parse(raw: Option<&str>) -> Ability {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("yes") | Some("1") => Ability::High,
            Some("no") | Some("0") => Ability::Low,
            _ => Ability::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Ability::Unknown)
    }

    pub fn label(self) -> &'static str {
        match self {
            Ability::Low => "low",
            Ability::High => "high",
            Ability::Unknown => "unknown",
        }
    }
}

/// A relationship domain and the roster columns holding its nominee slots.
#[derive(Debug, Clone)]
pub struct DomainSpec {
    pub name: String,
    pub slots: Vec<String>,
}

impl DomainSpec {
    /// Parses a `name=col_1,col_2,col_3` flag value.
    pub fn parse(raw: &str) -> anyhow::Result<DomainSpec> {
        let (name, cols) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("domain must look like name=col_1,col_2,col_3: {raw}"))?;
        let slots: Vec<String> = cols
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if slots.is_empty() || slots.len() > SLOT_COUNT {
            anyhow::bail!("domain {name} must list between 1 and {SLOT_COUNT} slot columns");
        }
        Ok(DomainSpec {
            name: name.trim().to_string(),
            slots,
        })
    }
}

/// One roster row after column selection and identifier coercion.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub classroom: String,
    pub student_id: i64,
    pub ability: Ability,
    /// Domain name -> nominee slots. Unparseable or blank cells are `None`.
    pub nominations: HashMap<String, [Option<i64>; SLOT_COUNT]>,
}

impl StudentRow {
    pub fn slots(&self, domain: &str) -> [Option<i64>; SLOT_COUNT] {
        self.nominations
            .get(domain)
            .copied()
            .unwrap_or([None; SLOT_COUNT])
    }

    /// Raw out-degree in a domain: non-empty slots, dangling nominees included.
    pub fn out_degree(&self, domain: &str) -> usize {
        self.slots(domain).iter().filter(|s| s.is_some()).count()
    }
}

/// A directed nomination within one domain. `to` may reference a student
/// that never appears in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: i64,
    pub to: i64,
    /// The nominator's classroom.
    pub classroom: String,
}

/// Out-degree distribution of one classroom, split by ability. `low[k]`
/// counts low-ability students who sent exactly k+1 nominations; students
/// with no nominations or unknown ability appear in neither vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeCounts {
    pub low: [u64; SLOT_COUNT],
    pub high: [u64; SLOT_COUNT],
}

/// Non-fatal data-quality findings. None of these stop an analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterWarning {
    ConflictingTrait {
        student_id: i64,
    },
    MalformedIdentifier {
        student_id: i64,
        column: String,
        value: String,
    },
    MalformedStudentId {
        line: u64,
        value: String,
    },
    CrossClassroomNomination {
        student_id: i64,
        nominee_id: i64,
        domain: String,
    },
    UnknownNominee {
        student_id: i64,
        nominee_id: i64,
        domain: String,
    },
}

impl fmt::Display for RosterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterWarning::ConflictingTrait { student_id } => write!(
                f,
                "student {student_id} has duplicate rows with conflicting trait values; treated as unknown"
            ),
            RosterWarning::MalformedIdentifier {
                student_id,
                column,
                value,
            } => write!(
                f,
                "student {student_id}: cannot read nominee id {value:?} in column {column}; slot treated as empty"
            ),
            RosterWarning::MalformedStudentId { line, value } => write!(
                f,
                "line {line}: cannot read student id {value:?}; row skipped"
            ),
            RosterWarning::CrossClassroomNomination {
                student_id,
                nominee_id,
                domain,
            } => write!(
                f,
                "student {student_id} nominated {nominee_id} ({domain}) from another classroom"
            ),
            RosterWarning::UnknownNominee {
                student_id,
                nominee_id,
                domain,
            } => write!(
                f,
                "student {student_id} nominated {nominee_id} ({domain}) who is not on the roster"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IsolationRow {
    pub classroom: String,
    pub domain: String,
    pub student_count: usize,
    pub isolated_in_share: f64,
    pub isolated_out_share: f64,
    pub reciprocity_share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentHomophilyRow {
    pub classroom: String,
    pub student_id: i64,
    pub domain: String,
    pub ability: &'static str,
    pub same_count: usize,
    pub same_any: u8,
    pub known_peer_count: usize,
    pub same_share: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColemanRow {
    pub classroom: String,
    pub domain: String,
    pub student_count: usize,
    pub low_count: usize,
    pub high_count: usize,
    pub low_share: f64,
    pub high_share: f64,
    pub low_low_share: Option<f64>,
    pub high_high_share: Option<f64>,
    pub homophily_low: Option<f64>,
    pub homophily_high: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegregationRow {
    pub classroom: String,
    pub domain: String,
    pub low_1: u64,
    pub low_2: u64,
    pub low_3: u64,
    pub high_1: u64,
    pub high_2: u64,
    pub high_3: u64,
    /// Chance-level expected cross-ability contact share.
    pub mu: Option<f64>,
    pub cross_count: usize,
    pub known_pair_count: usize,
    pub observed_cross_share: Option<f64>,
}

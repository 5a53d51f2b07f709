use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod ability;
mod graph;
mod homophily;
mod isolation;
mod loader;
mod models;
mod report;
mod segregation;

use ability::AbilityIndex;
use loader::RosterConfig;
use models::{Ability, DomainSpec, RosterWarning, StudentRow};

#[derive(Parser)]
#[command(name = "classroom-network-analysis")]
#[command(about = "Nomination-network statistics for classroom roster surveys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RosterArgs {
    /// Roster survey CSV file
    #[arg(long)]
    csv: PathBuf,
    #[arg(long, default_value = "fs_classroom")]
    classroom_col: String,
    #[arg(long, default_value = "fs_student_id")]
    student_col: String,
    /// Binary ability trait column (yes/no or 1/0)
    #[arg(long, default_value = "high_math")]
    trait_col: String,
    /// Relationship domain as name=col_1,col_2,col_3; repeatable.
    /// Defaults to the survey's academic and emotional support domains.
    #[arg(long = "domain", value_parser = DomainSpec::parse)]
    domains: Vec<DomainSpec>,
}

impl RosterArgs {
    fn config(&self) -> RosterConfig {
        let domains = if self.domains.is_empty() {
            ["academic", "emot"]
                .into_iter()
                .map(|name| DomainSpec {
                    name: name.to_string(),
                    slots: (1..=3).map(|n| format!("{name}_{n}")).collect(),
                })
                .collect()
        } else {
            self.domains.clone()
        };
        RosterConfig {
            classroom_col: self.classroom_col.clone(),
            student_col: self.student_col.clone(),
            trait_col: self.trait_col.clone(),
            domains,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check roster data quality without computing statistics
    Validate {
        #[command(flatten)]
        roster: RosterArgs,
    },
    /// Per-classroom isolation and reciprocity shares
    Isolation {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "isolation.csv")]
        out: PathBuf,
        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Per-student same-ability contact from the nominator's side
    Homophily {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "homophily.csv")]
        out: PathBuf,
        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Per-student same-ability contact from the nominee's side
    Indegree {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "indegree.csv")]
        out: PathBuf,
        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Classroom-level Coleman homophily indices
    Coleman {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "coleman.csv")]
        out: PathBuf,
        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Chance-level segregation baseline per classroom
    Segregation {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "segregation.csv")]
        out: PathBuf,
        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report across all statistics
    Report {
        #[command(flatten)]
        roster: RosterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

struct LoadedRoster {
    rows: Vec<StudentRow>,
    domains: Vec<String>,
    abilities: AbilityIndex,
    warnings: Vec<RosterWarning>,
}

fn load(args: &RosterArgs) -> anyhow::Result<LoadedRoster> {
    let config = args.config();
    let (rows, mut warnings) = loader::load_roster(&args.csv, &config)?;
    let (abilities, conflicts) = AbilityIndex::build(&rows);
    warnings.extend(conflicts);
    let domains = config.domains.iter().map(|d| d.name.clone()).collect();
    Ok(LoadedRoster {
        rows,
        domains,
        abilities,
        warnings,
    })
}

fn print_warnings(warnings: &[RosterWarning]) {
    for warning in warnings {
        println!("warning: {warning}");
    }
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T], json: bool) -> anyhow::Result<usize> {
    if json {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        serde_json::to_writer_pretty(file, rows)?;
    } else {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    Ok(rows.len())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { roster } => {
            let loaded = load(&roster)?;
            let students: HashSet<i64> =
                loaded.rows.iter().map(|r| r.student_id).collect();
            let classrooms: HashSet<&str> =
                loaded.rows.iter().map(|r| r.classroom.as_str()).collect();
            let known = students
                .iter()
                .filter(|&&id| loaded.abilities.lookup(id).is_known())
                .count();
            let high = students
                .iter()
                .filter(|&&id| loaded.abilities.lookup(id) == Ability::High)
                .count();

            println!(
                "{} rows, {} distinct students, {} classrooms.",
                loaded.rows.len(),
                students.len(),
                classrooms.len()
            );
            println!(
                "Ability known for {} students ({} high, {} low).",
                known,
                high,
                known - high
            );

            let anomalies = graph::nomination_anomalies(&loaded.rows, &loaded.domains);
            print_warnings(&loaded.warnings);
            print_warnings(&anomalies);
            if loaded.warnings.is_empty() && anomalies.is_empty() {
                println!("No data-quality findings.");
            } else {
                println!(
                    "{} data-quality findings.",
                    loaded.warnings.len() + anomalies.len()
                );
            }
        }
        Commands::Isolation { roster, out, json } => {
            let loaded = load(&roster)?;
            print_warnings(&loaded.warnings);
            let mut output = Vec::new();
            for domain in &loaded.domains {
                let edges = graph::build_edges(&loaded.rows, domain);
                let stats = isolation::classroom_isolation(&loaded.rows, &edges, domain);
                output.extend(isolation::isolation_rows(&stats, domain));
            }
            let written = write_rows(&out, &output, json)?;
            println!("Wrote {written} classroom rows to {}.", out.display());
        }
        Commands::Homophily { roster, out, json } => {
            let loaded = load(&roster)?;
            print_warnings(&loaded.warnings);
            let mut output = Vec::new();
            for domain in &loaded.domains {
                output.extend(homophily::student_homophily(
                    &loaded.rows,
                    domain,
                    &loaded.abilities,
                ));
            }
            let written = write_rows(&out, &output, json)?;
            println!("Wrote {written} student rows to {}.", out.display());
        }
        Commands::Indegree { roster, out, json } => {
            let loaded = load(&roster)?;
            print_warnings(&loaded.warnings);
            let mut output = Vec::new();
            for domain in &loaded.domains {
                let edges = graph::build_edges(&loaded.rows, domain);
                output.extend(homophily::indegree_homophily(
                    &loaded.rows,
                    &edges,
                    domain,
                    &loaded.abilities,
                ));
            }
            let written = write_rows(&out, &output, json)?;
            println!("Wrote {written} student rows to {}.", out.display());
        }
        Commands::Coleman { roster, out, json } => {
            let loaded = load(&roster)?;
            print_warnings(&loaded.warnings);
            let mut output = Vec::new();
            for domain in &loaded.domains {
                let edges = graph::build_edges(&loaded.rows, domain);
                output.extend(homophily::coleman(
                    &loaded.rows,
                    &edges,
                    domain,
                    &loaded.abilities,
                ));
            }
            let written = write_rows(&out, &output, json)?;
            println!("Wrote {written} classroom rows to {}.", out.display());
        }
        Commands::Segregation { roster, out, json } => {
            let loaded = load(&roster)?;
            print_warnings(&loaded.warnings);
            let mut output = Vec::new();
            for domain in &loaded.domains {
                let edges = graph::build_edges(&loaded.rows, domain);
                output.extend(segregation::classroom_segregation(
                    &loaded.rows,
                    &edges,
                    domain,
                    &loaded.abilities,
                ));
            }
            let written = write_rows(&out, &output, json)?;
            println!("Wrote {written} classroom rows to {}.", out.display());
        }
        Commands::Report { roster, out } => {
            let loaded = load(&roster)?;
            let report = report::build_report(
                chrono::Utc::now().date_naive(),
                &loaded.rows,
                &loaded.domains,
                &loaded.abilities,
                &loaded.warnings,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

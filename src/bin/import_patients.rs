//! Batch import of patient intakes from newline-delimited JSON.
//!
//! Each non-blank line is one `PatientIntake` object. Lines go through the
//! same validation and assessment as the intake form, so derived values in
//! the input (if any) are ignored and recomputed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin import_patients -- --db apneascreen.db --input patients.ndjson
//! ```
//!
//! Exits with status 1 when any line was rejected.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use apneascreen::adapters::sanitize::SanitizingMakeWriter;
use apneascreen::adapters::sqlite::SqliteStorage;
use apneascreen::application::PatientService;
use apneascreen::PatientIntake;

const USAGE: &str = "Usage: import_patients --db <path> --input <file.ndjson>";

struct Args {
    db: PathBuf,
    input: PathBuf,
}

fn usage_exit() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut db: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    usage_exit();
                }
                db = Some(PathBuf::from(p));
            }
            "--input" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    usage_exit();
                }
                input = Some(PathBuf::from(p));
            }
            "-h" | "--help" => {
                println!(
                    "{USAGE}\n\nReads one JSON patient intake per line and stores each through the screening engine. Rejected lines are reported with their line number."
                );
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown arg: {arg}");
                usage_exit();
            }
        }
    }

    match (db, input) {
        (Some(db), Some(input)) => Args { db, input },
        _ => usage_exit(),
    }
}

#[derive(Debug, Default)]
struct ImportReport {
    imported: usize,
    /// 1-based line number and reason
    failures: Vec<(usize, String)>,
}

fn import_lines<R: BufRead>(
    service: &PatientService<SqliteStorage>,
    reader: R,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("reading line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let intake: PatientIntake = match serde_json::from_str(&line) {
            Ok(intake) => intake,
            Err(e) => {
                report.failures.push((line_no, format!("Invalid JSON: {e}")));
                continue;
            }
        };

        match service.intake(intake) {
            Ok(record) => {
                tracing::debug!(
                    line = line_no,
                    tier = %record.risk_tier(),
                    "Imported patient"
                );
                report.imported += 1;
            }
            Err(e) => report.failures.push((line_no, e.to_string())),
        }
    }

    Ok(report)
}

fn main() -> Result<()> {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(SanitizingMakeWriter::new(std::io::stderr))
        .init();

    let storage = SqliteStorage::new(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let service = PatientService::new(Arc::new(storage));

    let file = File::open(&args.input)
        .with_context(|| format!("opening input {}", args.input.display()))?;
    let report = import_lines(&service, BufReader::new(file))?;

    for (line, reason) in &report.failures {
        eprintln!("line {line}: {reason}");
    }
    println!(
        "Imported {} patient(s), rejected {}",
        report.imported,
        report.failures.len()
    );
    tracing::info!(
        imported = report.imported,
        rejected = report.failures.len(),
        "Import finished"
    );

    if !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const INPUT: &str = r#"{"id":"A-1","age":55,"height_m":1.70,"weight_kg":110.0,"neck_circumference_cm":42.0,"sex":"F","snores_loudly":true,"tired_during_day":false,"observed_apnea":true,"treated_hypertension":false}

{"id":"A-2","snores_loudly":false,"tired_during_day":false,"observed_apnea":false,"treated_hypertension":false}
not json
{"id":"A-1","snores_loudly":true,"tired_during_day":true,"observed_apnea":true,"treated_hypertension":true}
{"id":"A-3","snores_loudly":true}
"#;

    #[test]
    fn test_import_reports_rejected_lines() {
        let service = PatientService::new(Arc::new(
            SqliteStorage::in_memory().expect("Should create db"),
        ));

        let report = import_lines(&service, Cursor::new(INPUT)).expect("Should read input");
        assert_eq!(report.imported, 2);

        let lines: Vec<usize> = report.failures.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![4, 5, 6]);
        assert!(report.failures[0].1.starts_with("Invalid JSON"));
        assert!(report.failures[1].1.contains("already registered"));

        let record = service.lookup("A-1").expect("Should load");
        assert_eq!(record.stop_bang_score(), 5);
        assert_eq!(record.bmi(), Some(38.06));
    }

    #[test]
    fn test_import_into_file_database() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let db = dir.path().join("import.db");

        {
            let service = PatientService::new(Arc::new(
                SqliteStorage::new(&db).expect("Should open db"),
            ));
            let line = r#"{"id":"B-7","snores_loudly":false,"tired_during_day":true,"observed_apnea":false,"treated_hypertension":false}"#;
            let report = import_lines(&service, Cursor::new(line)).expect("Should read input");
            assert_eq!(report.imported, 1);
        }

        let service = PatientService::new(Arc::new(
            SqliteStorage::new(&db).expect("Should reopen db"),
        ));
        assert_eq!(service.count().expect("Should count"), 1);
    }
}

//! Apply scripts to a database, resolving ordering problems by retrying
//!
//! Scripts are executed in input order. Those that fail are retried in
//! further rounds for as long as each round fails strictly fewer scripts than
//! the one before. Once the failure count stops dropping, whatever is still
//! failing is reported as unresolved.

pub mod batch;
pub mod deploy;
pub mod mssql;

use tracing::{debug, info};

use crate::error::{BatchError, ScriptFailure, UnresolvedFailures};

pub use batch::{split_batches, Batch};
pub use deploy::{deploy, DataFile, DataImporter, DeployPlan, DeployReport, SkipDataImporter};
pub use mssql::{ConnectionSettings, MssqlConnection};

/// A blocking connection able to run one batch at a time.
///
/// Errors carry the 1-based line within the batch when the engine reports one.
pub trait Connection {
    fn execute(&mut self, batch: &str) -> Result<(), BatchError>;
}

/// A script to apply, identified by where it came from (file path, step label)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub id: String,
    pub sql: String,
}

impl Script {
    pub fn new(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
        }
    }
}

/// Outcome of [`apply_scripts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Scripts that executed successfully
    pub applied: usize,
    /// Rounds executed
    pub rounds: usize,
    /// Failures of each round, in order
    pub failure_counts: Vec<usize>,
    /// Failures from the last round, empty on full success
    pub unresolved: Vec<ScriptFailure>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Execute every batch of `sql` in order, stopping at the first failure.
///
/// A reported error line is translated from batch-relative to
/// script-relative.
pub fn execute_script(conn: &mut dyn Connection, sql: &str) -> Result<(), BatchError> {
    for batch in split_batches(sql) {
        conn.execute(batch.content).map_err(|err| BatchError {
            line: err.line.map(|line| batch.script_line(line)),
            message: err.message,
        })?;
    }
    Ok(())
}

/// Execute one script, tagging a failure with the script's identifier.
pub fn run_script(conn: &mut dyn Connection, script: &Script) -> Result<(), ScriptFailure> {
    execute_script(conn, &script.sql).map_err(|err| ScriptFailure {
        id: script.id.clone(),
        message: err.message,
        line: err.line,
    })
}

/// Apply scripts with the fixed-point retry strategy.
///
/// The first round always runs; every later round runs only if the previous
/// round failed strictly fewer scripts than the one before it. This bounds
/// the number of rounds by the number of scripts.
pub fn apply_scripts(scripts: Vec<Script>, conn: &mut dyn Connection) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut remaining = scripts;
    let mut failures: Vec<ScriptFailure> = Vec::new();
    let mut previous: Option<usize> = None;

    while !remaining.is_empty() && previous.map_or(true, |prev| failures.len() < prev) {
        if !failures.is_empty() {
            previous = Some(failures.len());
            info!("{} errors occurred, retrying...", failures.len());
        }
        failures.clear();
        report.rounds += 1;

        let total = remaining.len();
        let mut pending = Vec::new();
        for (index, script) in remaining.into_iter().enumerate() {
            debug!("Executing script {} of {}: {}", index + 1, total, script.id);
            match run_script(conn, &script) {
                Ok(()) => report.applied += 1,
                Err(failure) => {
                    debug!("{}", failure);
                    failures.push(failure);
                    pending.push(script);
                }
            }
        }
        report.failure_counts.push(failures.len());
        remaining = pending;
    }

    if previous.is_some() {
        if failures.is_empty() {
            info!("All errors resolved, were probably dependency issues...");
        } else {
            info!("{} errors unresolved", failures.len());
        }
    }
    report.unresolved = failures;
    report
}

/// Apply scripts and fail with every unresolved script if any remain.
///
/// Returns the number of scripts applied.
pub fn apply(
    scripts: Vec<Script>,
    conn: &mut dyn Connection,
) -> Result<usize, UnresolvedFailures> {
    let report = apply_scripts(scripts, conn);
    if report.unresolved.is_empty() {
        Ok(report.applied)
    } else {
        Err(UnresolvedFailures {
            failures: report.unresolved,
        })
    }
}

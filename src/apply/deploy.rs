//! Create a database's objects from a full snapshot
//!
//! Phases, in order:
//! 1. database properties (fail fast)
//! 2. schemas (fail fast)
//! 3. all other objects, with the fixed-point retry
//! 4. table data
//! 5. after-data scripts, once each
//! 6. foreign keys, once each
//!
//! Failures from phases 3 to 6 are collected and reported together.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{BatchError, Result, ScriptFailure, SnapshotError, UnresolvedFailures};
use crate::model::ObjectName;

use super::{apply_scripts, execute_script, run_script, Connection, Script};

/// A table data file waiting to be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub table: ObjectName,
    pub path: PathBuf,
}

/// Imports row data for one table.
///
/// A failure's `line` is the 1-based line in the data file.
pub trait DataImporter {
    fn import(
        &mut self,
        conn: &mut dyn Connection,
        file: &DataFile,
    ) -> std::result::Result<(), BatchError>;
}

/// Importer used when row data is not being loaded
#[derive(Debug, Default)]
pub struct SkipDataImporter;

impl DataImporter for SkipDataImporter {
    fn import(
        &mut self,
        _conn: &mut dyn Connection,
        file: &DataFile,
    ) -> std::result::Result<(), BatchError> {
        warn!(
            "Skipping data file {} for table {}",
            file.path.display(),
            file.table
        );
        Ok(())
    }
}

/// Scripts of a full snapshot, grouped by deployment phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    pub props: Option<Script>,
    pub schemas: Option<Script>,
    pub objects: Vec<Script>,
    pub data: Vec<DataFile>,
    pub after_data: Vec<Script>,
    pub foreign_keys: Vec<Script>,
}

/// Outcome of a successful [`deploy`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Object scripts applied, including after-data and foreign key scripts
    pub applied: usize,
    /// Rounds the object phase needed
    pub rounds: usize,
    pub data_files: usize,
}

fn run_precondition(conn: &mut dyn Connection, script: &Script) -> Result<()> {
    execute_script(conn, &script.sql).map_err(|source| SnapshotError::PreconditionFailed {
        id: script.id.clone(),
        source,
    })
}

/// Run every phase of `plan` against `conn`.
pub fn deploy(
    plan: DeployPlan,
    conn: &mut dyn Connection,
    importer: &mut dyn DataImporter,
) -> Result<DeployReport> {
    let mut report = DeployReport::default();

    if let Some(props) = &plan.props {
        debug!("Setting database properties...");
        run_precondition(conn, props)?;
    }
    if let Some(schemas) = &plan.schemas {
        debug!("Creating database schemas...");
        run_precondition(conn, schemas)?;
    }

    info!("Creating database objects...");
    let objects = apply_scripts(plan.objects, conn);
    report.applied = objects.applied;
    report.rounds = objects.rounds;
    let mut failures = objects.unresolved;

    if !plan.data.is_empty() {
        info!("Importing data...");
        for file in &plan.data {
            debug!("Importing data for table {}...", file.table);
            match importer.import(conn, file) {
                Ok(()) => report.data_files += 1,
                Err(err) => failures.push(ScriptFailure {
                    id: file.path.display().to_string(),
                    message: err.message,
                    line: err.line,
                }),
            }
        }
    }

    if !plan.after_data.is_empty() {
        debug!("Executing after-data scripts...");
    }
    for script in &plan.after_data {
        match run_script(conn, script) {
            Ok(()) => report.applied += 1,
            Err(failure) => failures.push(failure),
        }
    }

    if !plan.foreign_keys.is_empty() {
        info!("Adding foreign key constraints...");
    }
    for script in &plan.foreign_keys {
        match run_script(conn, script) {
            Ok(()) => report.applied += 1,
            Err(failure) => failures.push(failure),
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(UnresolvedFailures { failures }.into())
    }
}

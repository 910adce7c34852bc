//! rust-sqlsnap: SQL Server schema snapshots
//!
//! This library captures a database's structure as a [`model::Database`],
//! compares two models, renders the difference (or a whole model) as T-SQL,
//! and applies scripts to a server with a retry loop that absorbs ordering
//! problems between objects.

pub mod apply;
pub mod compare;
pub mod error;
pub mod model;
pub mod script;
pub mod snapshot;
mod util;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use apply::{ConnectionSettings, DeployReport, MssqlConnection, SkipDataImporter};
pub use error::SnapshotError;

/// Options for comparing two saved models
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Model describing the desired state
    pub source: PathBuf,
    /// Model describing the current state
    pub target: PathBuf,
    /// Write the synchronization script here
    pub output: Option<PathBuf>,
    /// List object names under each summary line
    pub include_names: bool,
}

/// Result of [`compare_models`]
#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub is_diff: bool,
    pub summary: String,
    /// Script that brings the target in line with the source
    pub script: String,
}

/// Compare two saved models and render the synchronization script.
pub fn compare_models(options: &CompareOptions) -> Result<CompareOutcome> {
    let source = snapshot::json::load_model(&options.source)
        .with_context(|| format!("Loading source model {}", options.source.display()))?;
    let target = snapshot::json::load_model(&options.target)
        .with_context(|| format!("Loading target model {}", options.target.display()))?;

    let diff = compare::compare(&source, &target);
    let outcome = CompareOutcome {
        is_diff: diff.is_diff(),
        summary: compare::report::summarize_changes(&diff, options.include_names),
        script: script::script_diff(&diff).render(),
    };

    if let Some(output) = &options.output {
        fs::write(output, &outcome.script)
            .with_context(|| format!("Writing script to {}", output.display()))?;
        info!("Wrote synchronization script to {}", output.display());
    }
    Ok(outcome)
}

/// Options for scripting a saved model to a snapshot directory
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub model: PathBuf,
    pub dir: PathBuf,
    /// Replace an existing snapshot directory
    pub overwrite: bool,
}

/// Script a saved model to a snapshot directory, returning the file count.
pub fn script_model(options: &ScriptOptions) -> Result<usize> {
    let db = snapshot::json::load_model(&options.model)
        .with_context(|| format!("Loading model {}", options.model.display()))?;
    let count = snapshot::write_snapshot_dir(&db, &options.dir, options.overwrite)?;
    Ok(count)
}

/// Options for creating a database from a snapshot directory
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub dir: PathBuf,
    pub database: String,
    pub connection: ConnectionSettings,
    /// Drop the database first if it already exists
    pub overwrite: bool,
}

/// Create a database on a server from a snapshot directory.
///
/// Fails before touching the server when the directory is missing, and
/// before creating anything when the database exists without `overwrite`.
pub fn create_database(options: &CreateOptions) -> Result<DeployReport> {
    let plan = snapshot::read_snapshot_dir(&options.dir)?;

    let mut master = MssqlConnection::connect_master(&options.connection)?;
    if master.database_exists(&options.database)? {
        if !options.overwrite {
            return Err(SnapshotError::DatabaseExists {
                server: master.server().to_string(),
                database: options.database.clone(),
            }
            .into());
        }
        info!("Dropping existing database {}...", options.database);
        master
            .drop_database(&options.database)
            .with_context(|| format!("Dropping database {}", options.database))?;
    }

    info!("Creating database {}...", options.database);
    master
        .create_database(&options.database)
        .with_context(|| format!("Creating database {}", options.database))?;
    drop(master);

    let mut conn = MssqlConnection::connect(&options.connection, &options.database)?;
    let report = apply::deploy(plan, &mut conn, &mut SkipDataImporter)?;
    info!(
        "Created {} with {} scripts in {} rounds",
        options.database, report.applied, report.rounds
    );
    Ok(report)
}

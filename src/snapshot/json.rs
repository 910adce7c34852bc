//! JSON model snapshots

use std::fs;
use std::path::Path;

use crate::error::{Result, SnapshotError};
use crate::model::{Database, DatabaseSnapshot};

use super::read_text_file;

/// Load a model saved with [`save_model`].
///
/// Identity and parent checks run while loading, so a hand-edited file with
/// duplicate objects is rejected.
pub fn load_model(path: &Path) -> Result<Database> {
    let text = read_text_file(path)?;
    let snapshot: DatabaseSnapshot =
        serde_json::from_str(&text).map_err(|source| SnapshotError::SnapshotParseError {
            path: path.to_path_buf(),
            source,
        })?;
    Database::try_from(snapshot)
}

pub fn save_model(db: &Database, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(db).map_err(|source| {
        SnapshotError::SnapshotParseError {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, text).map_err(|source| SnapshotError::FileWriteError {
        path: path.to_path_buf(),
        source,
    })
}

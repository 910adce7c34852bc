//! On-disk snapshot directories
//!
//! A snapshot directory holds one `.sql` file per object, grouped into one
//! sub-directory per object kind, plus `props.sql` and `schemas.sql` at the
//! root. Reading a directory yields a [`DeployPlan`]; writing one renders a
//! [`Database`].

pub mod json;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::apply::{DataFile, DeployPlan, Script};
use crate::error::{Result, SnapshotError};
use crate::model::{Database, ObjectName, RoutineKind, DEFAULT_SCHEMA};
use crate::script::{
    script_assembly_create, script_foreign_key_create, script_prop_list, script_role_create,
    script_routine_create, script_schema_create, script_synonym_create, script_table_create,
    script_user_create, script_view_index_create, BATCH_SEPARATOR,
};

pub const PROPS_FILE: &str = "props.sql";
pub const SCHEMAS_FILE: &str = "schemas.sql";
pub const FOREIGN_KEYS_DIR: &str = "foreign_keys";
pub const DATA_DIR: &str = "data";
pub const AFTER_DATA_DIR: &str = "after_data";

/// Object directories applied by the retry loop, in the order they are read
pub const OBJECT_DIRS: &[&str] = &[
    "table_types",
    "tables",
    "xmlschemacollections",
    "assemblies",
    "functions",
    "views",
    "procedures",
    "triggers",
    "synonyms",
    "roles",
    "users",
];

/// First line of every generated file
pub const HEADER_COMMENT: &str = "-- Scripted by sqlsnap; regenerated on every script run";

const TYPE_PREFIX: &str = "TYPE_";

/// Characters not allowed in file names on common file systems
const INVALID_FILE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// File name for an object: `schema.name.sql`, with the default schema
/// omitted and invalid characters replaced by `-`. Table types are prefixed
/// so they cannot collide with a table of the same name.
pub fn object_file_name(name: &ObjectName, is_type: bool) -> String {
    let mut file = String::new();
    if is_type {
        file.push_str(TYPE_PREFIX);
    }
    if name.schema != DEFAULT_SCHEMA {
        file.push_str(&name.schema);
        file.push('.');
    }
    file.push_str(&name.name);
    let mut file: String = file
        .chars()
        .map(|c| if INVALID_FILE_CHARS.contains(&c) { '-' } else { c })
        .collect();
    file.push_str(".sql");
    file
}

/// Table identity encoded in a data file name (`schema.table.tsv` or `table.tsv`)
pub fn table_from_data_file(path: &Path) -> Option<ObjectName> {
    let stem = path.file_stem()?.to_str()?;
    match stem.split_once('.') {
        Some((schema, table)) => Some(ObjectName::new(schema, table)),
        None => Some(ObjectName::new(DEFAULT_SCHEMA, stem)),
    }
}

/// Read a text file, honouring a byte order mark and falling back to
/// Windows-1252 when the content is not valid UTF-8.
pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| SnapshotError::FileReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some((encoding, bom_len)) = Encoding::for_bom(&bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return Ok(text.into_owned());
    }
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let (text, _, _) = WINDOWS_1252.decode(err.as_bytes());
            Ok(text.into_owned())
        }
    }
}

/// `.sql` files directly inside `dir`, sorted by file name
fn sql_files(dir: &Path) -> Vec<PathBuf> {
    list_files(dir)
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
        })
        .collect()
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn load_script(path: &Path) -> Result<Script> {
    Ok(Script::new(path.display().to_string(), read_text_file(path)?))
}

fn load_scripts(dir: &Path) -> Result<Vec<Script>> {
    sql_files(dir).iter().map(|p| load_script(p)).collect()
}

/// Read a snapshot directory into deployment phases.
pub fn read_snapshot_dir(dir: &Path) -> Result<DeployPlan> {
    if !dir.is_dir() {
        return Err(SnapshotError::SnapshotDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let optional_file = |name: &str| -> Result<Option<Script>> {
        let path = dir.join(name);
        if path.is_file() {
            load_script(&path).map(Some)
        } else {
            Ok(None)
        }
    };

    let mut plan = DeployPlan {
        props: optional_file(PROPS_FILE)?,
        schemas: optional_file(SCHEMAS_FILE)?,
        ..DeployPlan::default()
    };
    for sub in OBJECT_DIRS {
        plan.objects.extend(load_scripts(&dir.join(sub))?);
    }
    plan.data = list_files(&dir.join(DATA_DIR))
        .into_iter()
        .filter_map(|path| {
            table_from_data_file(&path).map(|table| DataFile { table, path })
        })
        .collect();
    plan.after_data = load_scripts(&dir.join(AFTER_DATA_DIR))?;
    plan.foreign_keys = load_scripts(&dir.join(FOREIGN_KEYS_DIR))?;

    debug!(
        "Read {} object scripts, {} data files, {} foreign key scripts from {}",
        plan.objects.len(),
        plan.data.len(),
        plan.foreign_keys.len(),
        dir.display()
    );
    Ok(plan)
}

/// Files of one snapshot, keyed by path relative to the snapshot root.
///
/// Several objects can share a file (foreign keys of one table, a view and
/// its indexes); their scripts are appended in model order.
#[derive(Debug, Default)]
struct SnapshotFiles {
    files: BTreeMap<PathBuf, String>,
}

impl SnapshotFiles {
    fn append(&mut self, path: PathBuf, script: &str) {
        let text = self
            .files
            .entry(path)
            .or_insert_with(|| format!("{}\n", HEADER_COMMENT));
        text.push_str(script.trim_end());
        text.push('\n');
        text.push_str(BATCH_SEPARATOR);
        text.push_str("\n\n");
    }
}

/// Render every object of `db` to its snapshot file, in memory.
fn render_files(db: &Database) -> SnapshotFiles {
    let mut files = SnapshotFiles::default();

    files.append(PathBuf::from(PROPS_FILE), &script_prop_list(db.props()));
    let schemas: String = db.schemas().map(script_schema_create).collect();
    if !schemas.is_empty() {
        files.append(PathBuf::from(SCHEMAS_FILE), &schemas);
    }

    for table in db.tables() {
        files.append(
            Path::new("tables").join(object_file_name(&table.object_name(), false)),
            &script_table_create(table),
        );
    }
    for table_type in db.table_types() {
        files.append(
            Path::new("table_types").join(object_file_name(&table_type.object_name(), true)),
            &script_table_create(table_type),
        );
    }
    for fk in db.foreign_keys() {
        files.append(
            Path::new(FOREIGN_KEYS_DIR).join(object_file_name(&fk.table, false)),
            &script_foreign_key_create(fk),
        );
    }
    for routine in db.routines() {
        files.append(
            Path::new(routine.kind.dir_name())
                .join(object_file_name(&routine.object_name(), false)),
            &script_routine_create(routine, db),
        );
    }
    for view_index in db.view_indexes() {
        files.append(
            Path::new(RoutineKind::View.dir_name())
                .join(object_file_name(&view_index.view, false)),
            &script_view_index_create(view_index),
        );
    }
    for assembly in db.assemblies() {
        files.append(
            Path::new("assemblies").join(object_file_name(
                &ObjectName::new(DEFAULT_SCHEMA, &assembly.name),
                false,
            )),
            &script_assembly_create(assembly),
        );
    }
    for role in db.roles() {
        files.append(
            Path::new("roles").join(object_file_name(
                &ObjectName::new(DEFAULT_SCHEMA, &role.name),
                false,
            )),
            &script_role_create(role),
        );
    }
    for user in db.users() {
        files.append(
            Path::new("users").join(object_file_name(
                &ObjectName::new(DEFAULT_SCHEMA, &user.name),
                false,
            )),
            &script_user_create(user),
        );
    }
    for synonym in db.synonyms() {
        files.append(
            Path::new("synonyms").join(object_file_name(&synonym.object_name(), false)),
            &script_synonym_create(synonym),
        );
    }
    files
}

/// Remove files a previous run generated, leaving data and after-data
/// scripts alone.
fn clear_generated(dir: &Path) -> Result<()> {
    for file in [PROPS_FILE, SCHEMAS_FILE] {
        let path = dir.join(file);
        if path.is_file() {
            fs::remove_file(&path)
                .map_err(|source| SnapshotError::FileWriteError { path, source })?;
        }
    }
    for sub in OBJECT_DIRS.iter().chain([FOREIGN_KEYS_DIR].iter()) {
        let path = dir.join(sub);
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .map_err(|source| SnapshotError::FileWriteError { path, source })?;
        }
    }
    Ok(())
}

/// Write `db` as a snapshot directory.
///
/// An existing directory is only replaced when `overwrite` is set; data and
/// after-data files in it are kept.
pub fn write_snapshot_dir(db: &Database, dir: &Path, overwrite: bool) -> Result<usize> {
    if dir.exists() {
        if !overwrite {
            return Err(SnapshotError::SnapshotDirExists {
                path: dir.to_path_buf(),
            });
        }
        clear_generated(dir)?;
    }

    let files = render_files(db);
    for (relative, text) in &files.files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::FileWriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, text).map_err(|source| SnapshotError::FileWriteError { path, source })?;
    }

    info!("Scripted {} files to {}", files.files.len(), dir.display());
    Ok(files.files.len())
}

//! Compare two schema models object by object
//!
//! Objects are matched on their natural identity (name, or schema + name).
//! Matched pairs are then checked with a per-kind equality predicate; most
//! kinds compare their rendered creation script, routines compare trimmed
//! definition text.

pub mod report;
mod table;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::debug;

use crate::model::{Database, ObjectName, Table};
use crate::script::{
    script_assembly_create, script_foreign_key_create, script_prop, script_user_create,
    script_view_index_create,
};

pub use table::compare_table;
pub use types::{ColumnDiff, DatabaseDiff, ObjectDiff, TableDiff};

/// Compare `source` (desired state) against `target` (current state).
///
/// Added means present in source only, deleted means present in target only.
pub fn compare<'a>(source: &'a Database, target: &'a Database) -> DatabaseDiff<'a> {
    let mut diff = DatabaseDiff::empty(source, target);

    debug!("Comparing database properties...");
    for prop in source.props() {
        if let Some(other) = target.prop(&prop.name) {
            if script_prop(prop) != script_prop(other) {
                diff.props_changed.push(prop);
            }
        }
    }

    debug!("Comparing schemas...");
    diff.schemas = diff_objects(
        source.schemas(),
        target.schemas(),
        |s| s.name.clone(),
        |a, b| a.owner == b.owner,
    );

    debug!("Comparing tables...");
    for table in source.tables() {
        match target.table(&table.object_name()) {
            Some(other) => {
                let table_diff = compare_table(table, other);
                if table_diff.is_diff() {
                    diff.tables_diff.push(table_diff);
                }
            }
            None => diff.tables_added.push(table),
        }
    }
    diff.tables_deleted = target
        .tables()
        .filter(|t| source.table(&t.object_name()).is_none())
        .collect();

    debug!("Comparing table types...");
    for table_type in source.table_types() {
        match target.table_type(&table_type.object_name()) {
            Some(other) => {
                if compare_table(table_type, other).is_diff()
                    || !same_column_order(table_type, other)
                {
                    diff.table_types_diff.push(table_type);
                }
            }
            None => diff.table_types_added.push(table_type),
        }
    }
    diff.table_types_deleted = target
        .table_types()
        .filter(|t| source.table_type(&t.object_name()).is_none())
        .collect();

    debug!("Comparing foreign keys...");
    diff.foreign_keys = diff_objects(
        source.foreign_keys(),
        target.foreign_keys(),
        |fk| fk.key(),
        |a, b| script_foreign_key_create(a) == script_foreign_key_create(b),
    );

    debug!("Comparing routines...");
    diff.routines = diff_objects(
        source.routines(),
        target.routines(),
        |r| r.object_name(),
        |a, b| a.text.trim() == b.text.trim(),
    );

    debug!("Comparing assemblies...");
    diff.assemblies = diff_objects(
        source.assemblies(),
        target.assemblies(),
        |a| a.name.clone(),
        |a, b| script_assembly_create(a) == script_assembly_create(b),
    );

    debug!("Comparing users...");
    diff.users = diff_objects(
        source.users(),
        target.users(),
        |u| u.name.clone(),
        |a, b| script_user_create(a) == script_user_create(b),
    );

    debug!("Comparing roles...");
    diff.roles = diff_objects(
        source.roles(),
        target.roles(),
        |r| r.name.clone(),
        |a, b| a.script.trim() == b.script.trim(),
    );

    debug!("Comparing view indexes...");
    diff.view_indexes = diff_objects(
        source.view_indexes(),
        target.view_indexes(),
        |vi| vi.key(),
        |a, b| script_view_index_create(a) == script_view_index_create(b),
    );

    debug!("Comparing synonyms...");
    diff.synonyms = diff_objects(
        source.synonyms(),
        target.synonyms(),
        |s| ObjectName::new(&s.schema, &s.name),
        |a, b| a.base_object_name == b.base_object_name,
    );

    diff
}

/// Partition two collections of one kind into added / deleted / changed.
///
/// Bucket order follows the order of the collection each object came from.
/// Table types are created with their columns in declaration order, so a
/// reordering needs a recreate.
fn same_column_order(a: &Table, b: &Table) -> bool {
    a.columns.iter().map(|c| c.name.as_str()).eq(b.columns.iter().map(|c| c.name.as_str()))
}

fn diff_objects<'a, T, K, S, G>(
    source: S,
    target: G,
    key: impl Fn(&T) -> K,
    same: impl Fn(&T, &T) -> bool,
) -> ObjectDiff<'a, T>
where
    T: 'a,
    K: Eq + Hash,
    S: Iterator<Item = &'a T>,
    G: Iterator<Item = &'a T>,
{
    let target: Vec<&'a T> = target.collect();
    let target_by_key: HashMap<K, &'a T> = target.iter().map(|t| (key(*t), *t)).collect();
    let mut seen = HashSet::new();
    let mut diff = ObjectDiff::default();

    for object in source {
        let k = key(object);
        match target_by_key.get(&k) {
            Some(other) => {
                if !same(object, *other) {
                    diff.changed.push(object);
                }
            }
            None => diff.added.push(object),
        }
        seen.insert(k);
    }
    diff.deleted = target
        .into_iter()
        .filter(|t| !seen.contains(&key(*t)))
        .collect();
    diff
}

//! Per-table column and constraint comparison

use std::collections::HashMap;

use crate::model::Table;

use super::types::{ColumnDiff, TableDiff};

/// Compare two versions of a table (or table type).
///
/// Columns and constraints are matched by name. Column position is not
/// compared.
pub fn compare_table<'a>(source: &'a Table, target: &'a Table) -> TableDiff<'a> {
    let mut diff = TableDiff {
        source,
        target,
        columns_added: Vec::new(),
        columns_deleted: Vec::new(),
        columns_diff: Vec::new(),
        constraints_added: Vec::new(),
        constraints_deleted: Vec::new(),
        constraints_changed: Vec::new(),
    };

    let target_columns: HashMap<&str, _> = target
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();
    for column in &source.columns {
        match target_columns.get(column.name.as_str()) {
            Some(other) => {
                let column_diff = ColumnDiff {
                    source: column,
                    target: other,
                };
                if column_diff.is_diff() {
                    diff.columns_diff.push(column_diff);
                }
            }
            None => diff.columns_added.push(column),
        }
    }
    diff.columns_deleted = target
        .columns
        .iter()
        .filter(|c| source.column(&c.name).is_none())
        .collect();

    let target_constraints: HashMap<&str, _> = target
        .constraints
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();
    for constraint in &source.constraints {
        match target_constraints.get(constraint.name.as_str()) {
            Some(other) => {
                if constraint != *other {
                    diff.constraints_changed.push(constraint);
                }
            }
            None => diff.constraints_added.push(constraint),
        }
    }
    diff.constraints_deleted = target
        .constraints
        .iter()
        .filter(|c| source.constraint(&c.name).is_none())
        .collect();

    diff
}

//! Attach catalog rows onto tables already present in a model
//!
//! Catalog readers return tables first and their columns and constraints as
//! separate row sets. Each row names its parent; a row whose parent is not in
//! the model is an error rather than being silently dropped.

use crate::error::{Result, SnapshotError};

use super::{Column, Constraint, Database, ObjectName, Table};

/// A column read from the catalog, tagged with its owning table or table type
#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub table: ObjectName,
    pub is_type: bool,
    pub column: Column,
}

/// A constraint or index read from the catalog, tagged with its owner
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub table: ObjectName,
    pub is_type: bool,
    pub constraint: Constraint,
}

fn parent_mut<'a>(
    db: &'a mut Database,
    table: &ObjectName,
    is_type: bool,
    kind: &'static str,
    name: &str,
) -> Result<&'a mut Table> {
    let parent = if is_type {
        db.table_type_mut(table)
    } else {
        db.table_mut(table)
    };
    parent.ok_or_else(|| SnapshotError::MissingParent {
        kind,
        name: name.to_string(),
        parent: table.to_string(),
    })
}

/// Attach columns to their tables, then order each touched table's columns
/// by ordinal position.
pub fn attach_columns(db: &mut Database, rows: Vec<ColumnRow>) -> Result<()> {
    let mut touched: Vec<(ObjectName, bool)> = Vec::new();
    for row in rows {
        let table = parent_mut(db, &row.table, row.is_type, "column", &row.column.name)?;
        if table.column(&row.column.name).is_some() {
            return Err(SnapshotError::DuplicateObject {
                kind: "column",
                name: format!("{}.{}", row.table, row.column.name),
            });
        }
        table.columns.push(row.column);
        if !touched.contains(&(row.table.clone(), row.is_type)) {
            touched.push((row.table, row.is_type));
        }
    }
    for (name, is_type) in touched {
        let table = parent_mut(db, &name, is_type, "column", "")?;
        table.columns.sort_by_key(|c| c.position);
    }
    Ok(())
}

/// Attach constraints and indexes to their tables.
pub fn attach_constraints(db: &mut Database, rows: Vec<ConstraintRow>) -> Result<()> {
    for row in rows {
        let table = parent_mut(
            db,
            &row.table,
            row.is_type,
            "constraint",
            &row.constraint.name,
        )?;
        if table.constraint(&row.constraint.name).is_some() {
            return Err(SnapshotError::DuplicateObject {
                kind: "constraint",
                name: format!("{}.{}", row.table, row.constraint.name),
            });
        }
        table.constraints.push(row.constraint);
    }
    Ok(())
}

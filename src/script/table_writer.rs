//! Table, column, constraint and foreign key DDL rendering.

use std::fmt::Write;

use crate::compare::{ColumnDiff, TableDiff};
use crate::model::{
    Column, Constraint, ConstraintKind, ForeignKey, ObjectName, ReferentialAction, Table,
};
use crate::util::quote_ident;

/// Types whose declaration carries a length, `-1` rendering as `max`
const LENGTH_TYPES: &[&str] = &["binary", "char", "nchar", "nvarchar", "varbinary", "varchar"];

/// Types whose declaration carries precision and scale
const PRECISION_TYPES: &[&str] = &["decimal", "numeric"];

/// Types whose declaration carries fractional-second scale only
const SCALE_TYPES: &[&str] = &["datetime2", "datetimeoffset", "time"];

/// `[type](len)`, `[type](p,s)` or `[type]` depending on the type family.
///
/// Unknown types (user-defined, CLR) render as the bare quoted name.
pub fn script_data_type(column: &Column) -> String {
    let ty = column.data_type.to_ascii_lowercase();
    let quoted = quote_ident(&column.data_type);
    if LENGTH_TYPES.contains(&ty.as_str()) {
        return match column.length {
            Some(-1) => format!("{}(max)", quoted),
            Some(len) => format!("{}({})", quoted, len),
            None => quoted,
        };
    }
    if PRECISION_TYPES.contains(&ty.as_str()) {
        return match (column.precision, column.scale) {
            (Some(p), Some(s)) => format!("{}({},{})", quoted, p, s),
            (Some(p), None) => format!("{}({})", quoted, p),
            _ => quoted,
        };
    }
    if SCALE_TYPES.contains(&ty.as_str()) {
        if let Some(s) = column.scale {
            return format!("{}({})", quoted, s);
        }
    }
    quoted
}

/// Column type and nullability, as used by `ALTER COLUMN`.
pub fn script_column_definition(column: &Column) -> String {
    if let Some(expr) = &column.computed {
        return format!("{} AS {}", quote_ident(&column.name), expr);
    }
    format!(
        "{} {} {}",
        quote_ident(&column.name),
        script_data_type(column),
        if column.is_nullable { "NULL" } else { "NOT NULL" }
    )
}

/// Full column declaration inside `CREATE TABLE` / `ADD`.
pub fn script_column(column: &Column) -> String {
    let mut text = script_column_definition(column);
    if column.computed.is_some() {
        return text;
    }
    if let Some(identity) = &column.identity {
        let _ = write!(text, " IDENTITY ({},{})", identity.seed, identity.increment);
    }
    if let Some(default) = &column.default {
        let _ = write!(
            text,
            " CONSTRAINT {} DEFAULT {}",
            quote_ident(&default.name),
            default.expression
        );
    }
    if column.is_rowguid {
        text.push_str(" ROWGUIDCOL");
    }
    text
}

fn script_key_columns(constraint: &Constraint) -> String {
    constraint
        .columns
        .iter()
        .map(|c| {
            if c.descending {
                format!("{} DESC", quote_ident(&c.name))
            } else {
                quote_ident(&c.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn clustered_keyword(constraint: &Constraint) -> &'static str {
    if constraint.clustered {
        "CLUSTERED"
    } else {
        "NONCLUSTERED"
    }
}

/// Constraint clause as it appears inside `CREATE TABLE` or after `ADD`.
///
/// Indexes are not constraints; see [`script_index_create`].
pub fn script_constraint_clause(constraint: &Constraint) -> String {
    match constraint.kind {
        ConstraintKind::Check => format!(
            "CONSTRAINT {} CHECK {}{}",
            quote_ident(&constraint.name),
            if constraint.not_for_replication {
                "NOT FOR REPLICATION "
            } else {
                ""
            },
            constraint.check_expression.as_deref().unwrap_or_default()
        ),
        ConstraintKind::Index => format!(
            "INDEX {} {}{} ({})",
            quote_ident(&constraint.name),
            if constraint.unique { "UNIQUE " } else { "" },
            clustered_keyword(constraint),
            script_key_columns(constraint)
        ),
        ConstraintKind::PrimaryKey | ConstraintKind::Unique => format!(
            "CONSTRAINT {} {} {} ({})",
            quote_ident(&constraint.name),
            constraint.kind.as_sql(),
            clustered_keyword(constraint),
            script_key_columns(constraint)
        ),
    }
}

/// `CREATE INDEX` on a table or view
pub fn script_index_create(owner: &ObjectName, index: &Constraint) -> String {
    let mut text = format!(
        "CREATE {}{} INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        clustered_keyword(index),
        quote_ident(&index.name),
        owner.quoted(),
        script_key_columns(index)
    );
    if !index.included_columns.is_empty() {
        let included: Vec<String> = index.included_columns.iter().map(|c| quote_ident(c)).collect();
        let _ = write!(text, " INCLUDE ({})", included.join(", "));
    }
    if let Some(filter) = &index.filter {
        let _ = write!(text, " WHERE {}", filter);
    }
    text
}

/// Add a constraint or create an index on an existing table
pub fn script_constraint_create(table: &ObjectName, constraint: &Constraint) -> String {
    match constraint.kind {
        ConstraintKind::Index => script_index_create(table, constraint),
        _ => format!(
            "ALTER TABLE {} ADD {}",
            table.quoted(),
            script_constraint_clause(constraint)
        ),
    }
}

pub fn script_constraint_drop(table: &ObjectName, constraint: &Constraint) -> String {
    match constraint.kind {
        ConstraintKind::Index => format!(
            "DROP INDEX {} ON {}",
            quote_ident(&constraint.name),
            table.quoted()
        ),
        _ => format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            table.quoted(),
            quote_ident(&constraint.name)
        ),
    }
}

/// `CREATE TABLE` (or `CREATE TYPE ... AS TABLE`) with inline keys and checks.
///
/// Table indexes follow as separate `CREATE INDEX` statements; table types
/// declare them inline since a type cannot be indexed afterwards.
pub fn script_table_create(table: &Table) -> String {
    let name = table.object_name();
    let mut text = if table.is_type {
        format!("CREATE TYPE {} AS TABLE (\n", name.quoted())
    } else {
        format!("CREATE TABLE {} (\n", name.quoted())
    };

    let mut lines: Vec<String> = table.columns.iter().map(script_column).collect();
    lines.extend(
        table
            .constraints
            .iter()
            .filter(|c| table.is_type || c.kind != ConstraintKind::Index)
            .map(script_constraint_clause),
    );
    text.push_str(
        &lines
            .iter()
            .map(|l| format!("   {}", l))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    text.push_str("\n)\n");

    if !table.is_type {
        for index in table
            .constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::Index)
        {
            text.push_str(&script_index_create(&name, index));
            text.push('\n');
        }
    }
    text
}

pub fn script_table_drop(table: &Table) -> String {
    let keyword = if table.is_type { "TYPE" } else { "TABLE" };
    format!("DROP {} {}\n", keyword, table.object_name().quoted())
}

fn fk_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`, followed by a
/// `NOCHECK` statement when the key is disabled.
pub fn script_foreign_key_create(fk: &ForeignKey) -> String {
    let table = fk.table.quoted();
    let mut text = format!(
        "ALTER TABLE {} WITH {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        table,
        if fk.check { "CHECK" } else { "NOCHECK" },
        quote_ident(&fk.name),
        fk_columns(&fk.columns),
        fk.ref_table.quoted(),
        fk_columns(&fk.ref_columns)
    );
    if fk.on_update != ReferentialAction::NoAction {
        let _ = write!(text, " ON UPDATE {}", fk.on_update.as_sql());
    }
    if fk.on_delete != ReferentialAction::NoAction {
        let _ = write!(text, " ON DELETE {}", fk.on_delete.as_sql());
    }
    text.push('\n');
    if !fk.check {
        let _ = writeln!(
            text,
            "ALTER TABLE {} NOCHECK CONSTRAINT {}",
            table,
            quote_ident(&fk.name)
        );
    }
    text
}

pub fn script_foreign_key_drop(fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}\n",
        fk.table.quoted(),
        quote_ident(&fk.name)
    )
}

fn script_default_create(table: &ObjectName, column: &Column) -> Option<String> {
    column.default.as_ref().map(|d| {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
            table.quoted(),
            quote_ident(&d.name),
            d.expression,
            quote_ident(&column.name)
        )
    })
}

fn script_default_drop(table: &ObjectName, column: &Column) -> Option<String> {
    column.default.as_ref().map(|d| {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            table.quoted(),
            quote_ident(&d.name)
        )
    })
}

fn is_rebuilt(column_diff: &ColumnDiff<'_>) -> bool {
    column_diff.computed_is_diff()
}

/// In-place alteration of an existing table.
///
/// Statement order: drop removed/changed constraints, drop affected
/// defaults, drop columns, add columns, alter columns, re-add defaults, then
/// add new/changed constraints.
pub fn script_table_diff(diff: &TableDiff<'_>) -> String {
    let table = diff.source.object_name();
    let mut statements: Vec<String> = Vec::new();

    for constraint in diff.constraints_deleted.iter() {
        statements.push(script_constraint_drop(&table, constraint));
    }
    for constraint in diff.constraints_changed.iter() {
        let existing = diff.target.constraint(&constraint.name).unwrap_or(*constraint);
        statements.push(script_constraint_drop(&table, existing));
    }

    for column_diff in &diff.columns_diff {
        if column_diff.default_is_diff() || is_rebuilt(column_diff) {
            statements.extend(script_default_drop(&table, column_diff.target));
        }
    }
    for column in &diff.columns_deleted {
        statements.extend(script_default_drop(&table, column));
    }

    for column in &diff.columns_deleted {
        statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            table.quoted(),
            quote_ident(&column.name)
        ));
    }
    for column_diff in diff.columns_diff.iter().filter(|cd| is_rebuilt(cd)) {
        statements.push(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            table.quoted(),
            quote_ident(&column_diff.target.name)
        ));
    }

    for column in &diff.columns_added {
        statements.push(format!(
            "ALTER TABLE {} ADD {}",
            table.quoted(),
            script_column(column)
        ));
    }
    for column_diff in diff.columns_diff.iter().filter(|cd| is_rebuilt(cd)) {
        statements.push(format!(
            "ALTER TABLE {} ADD {}",
            table.quoted(),
            script_column(column_diff.source)
        ));
    }

    for column_diff in &diff.columns_diff {
        if is_rebuilt(column_diff) || column_diff.only_default_is_diff() {
            continue;
        }
        if column_diff.definition_is_diff() {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {}",
                table.quoted(),
                script_column_definition(column_diff.source)
            ));
        }
    }

    for column_diff in &diff.columns_diff {
        if column_diff.default_is_diff() && !is_rebuilt(column_diff) {
            statements.extend(script_default_create(&table, column_diff.source));
        }
    }

    for constraint in diff
        .constraints_changed
        .iter()
        .chain(diff.constraints_added.iter())
    {
        statements.push(script_constraint_create(&table, constraint));
    }

    let mut text = statements.join("\n");
    text.push('\n');
    text
}

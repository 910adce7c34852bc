//! Core types for schema comparison

use crate::model::{
    Assembly, Column, Constraint, Database, DbProp, ForeignKey, Role, Routine, Schema, Synonym,
    Table, User, ViewIndex,
};

/// Added / deleted / changed buckets for one object kind.
///
/// `added` and `changed` hold the source-side object, `deleted` the
/// target-side object.
#[derive(Debug)]
pub struct ObjectDiff<'a, T> {
    pub added: Vec<&'a T>,
    pub deleted: Vec<&'a T>,
    pub changed: Vec<&'a T>,
}

impl<T> Default for ObjectDiff<'_, T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            deleted: Vec::new(),
            changed: Vec::new(),
        }
    }
}

impl<T> ObjectDiff<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    /// Total number of objects across the three buckets
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.changed.len()
    }
}

/// A column present on both sides of a table comparison
#[derive(Debug)]
pub struct ColumnDiff<'a> {
    pub source: &'a Column,
    pub target: &'a Column,
}

impl ColumnDiff<'_> {
    /// True when the default expression was added, removed or changed
    pub fn default_is_diff(&self) -> bool {
        self.source.default.as_ref().map(|d| &d.expression)
            != self.target.default.as_ref().map(|d| &d.expression)
    }

    /// True when any field other than the default differs
    pub fn definition_is_diff(&self) -> bool {
        let (s, t) = (self.source, self.target);
        s.data_type != t.data_type
            || s.is_nullable != t.is_nullable
            || s.length != t.length
            || s.precision != t.precision
            || s.scale != t.scale
            || s.identity != t.identity
            || s.is_rowguid != t.is_rowguid
            || s.computed != t.computed
    }

    pub fn is_diff(&self) -> bool {
        self.default_is_diff() || self.definition_is_diff()
    }

    /// Only the default differs; the column itself can stay as it is
    pub fn only_default_is_diff(&self) -> bool {
        self.default_is_diff() && !self.definition_is_diff()
    }

    /// Computed columns cannot be altered; a change means drop and re-add
    pub fn computed_is_diff(&self) -> bool {
        (self.source.computed.is_some() || self.target.computed.is_some())
            && self.definition_is_diff()
    }
}

/// Differences between two versions of the same table
#[derive(Debug)]
pub struct TableDiff<'a> {
    pub source: &'a Table,
    pub target: &'a Table,
    pub columns_added: Vec<&'a Column>,
    pub columns_deleted: Vec<&'a Column>,
    pub columns_diff: Vec<ColumnDiff<'a>>,
    pub constraints_added: Vec<&'a Constraint>,
    pub constraints_deleted: Vec<&'a Constraint>,
    /// Source-side definition of constraints whose definition changed
    pub constraints_changed: Vec<&'a Constraint>,
}

impl TableDiff<'_> {
    pub fn is_diff(&self) -> bool {
        !self.columns_added.is_empty()
            || !self.columns_deleted.is_empty()
            || !self.columns_diff.is_empty()
            || !self.constraints_added.is_empty()
            || !self.constraints_deleted.is_empty()
            || !self.constraints_changed.is_empty()
    }

    pub fn display_name(&self) -> String {
        format!("{}.{}", self.source.schema, self.source.name)
    }
}

/// Structured result of comparing a source model against a target model.
///
/// Borrows both models; rendering it into a script needs target-side
/// definitions (e.g. dropped constraints and defaults).
#[derive(Debug)]
pub struct DatabaseDiff<'a> {
    pub source: &'a Database,
    pub target: &'a Database,
    /// Source-side values of properties whose rendered form differs
    pub props_changed: Vec<&'a DbProp>,
    pub schemas: ObjectDiff<'a, Schema>,
    pub tables_added: Vec<&'a Table>,
    pub tables_deleted: Vec<&'a Table>,
    pub tables_diff: Vec<TableDiff<'a>>,
    pub table_types_added: Vec<&'a Table>,
    pub table_types_deleted: Vec<&'a Table>,
    /// Source-side definitions of table types that must be dropped and recreated
    pub table_types_diff: Vec<&'a Table>,
    pub foreign_keys: ObjectDiff<'a, ForeignKey>,
    pub routines: ObjectDiff<'a, Routine>,
    pub assemblies: ObjectDiff<'a, Assembly>,
    pub users: ObjectDiff<'a, User>,
    pub roles: ObjectDiff<'a, Role>,
    pub view_indexes: ObjectDiff<'a, ViewIndex>,
    pub synonyms: ObjectDiff<'a, Synonym>,
}

impl<'a> DatabaseDiff<'a> {
    pub(crate) fn empty(source: &'a Database, target: &'a Database) -> Self {
        Self {
            source,
            target,
            props_changed: Vec::new(),
            schemas: ObjectDiff::default(),
            tables_added: Vec::new(),
            tables_deleted: Vec::new(),
            tables_diff: Vec::new(),
            table_types_added: Vec::new(),
            table_types_deleted: Vec::new(),
            table_types_diff: Vec::new(),
            foreign_keys: ObjectDiff::default(),
            routines: ObjectDiff::default(),
            assemblies: ObjectDiff::default(),
            users: ObjectDiff::default(),
            roles: ObjectDiff::default(),
            view_indexes: ObjectDiff::default(),
            synonyms: ObjectDiff::default(),
        }
    }

    /// True when applying the diff would change the target
    pub fn is_diff(&self) -> bool {
        !self.props_changed.is_empty()
            || !self.schemas.is_empty()
            || !self.tables_added.is_empty()
            || !self.tables_deleted.is_empty()
            || !self.tables_diff.is_empty()
            || !self.table_types_added.is_empty()
            || !self.table_types_deleted.is_empty()
            || !self.table_types_diff.is_empty()
            || !self.foreign_keys.is_empty()
            || !self.routines.is_empty()
            || !self.assemblies.is_empty()
            || !self.users.is_empty()
            || !self.roles.is_empty()
            || !self.view_indexes.is_empty()
            || !self.synonyms.is_empty()
    }
}

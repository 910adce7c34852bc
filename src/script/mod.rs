//! Render diffs and full models as ordered T-SQL batches
//!
//! Emission order is fixed per object kind so that the common dependency
//! directions (schemas before tables, tables before foreign keys and
//! routines) hold without a dependency graph. Anything the order misses is
//! left to the apply engine's retry loop.

mod other_writers;
mod routine_writer;
mod table_writer;

use tracing::debug;

use crate::apply::Script;
use crate::compare::DatabaseDiff;
use crate::model::Database;
use crate::util::quote_ident;

pub use other_writers::{
    script_assembly_create, script_assembly_drop, script_prop, script_prop_list,
    script_role_create, script_role_drop, script_schema_create, script_schema_drop,
    script_schema_owner,
    script_synonym_create, script_synonym_drop, script_user_create, script_user_drop,
    script_view_index_create, script_view_index_drop,
};
pub use routine_writer::{script_routine_alter, script_routine_create, script_routine_drop};
pub use table_writer::{
    script_column, script_column_definition, script_constraint_create, script_constraint_drop,
    script_data_type, script_foreign_key_create, script_foreign_key_drop, script_index_create,
    script_table_create, script_table_diff, script_table_drop,
};

/// Batch separator line
pub const BATCH_SEPARATOR: &str = "GO";

/// One labelled unit of a rendered script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    /// What the step does, e.g. `create table dbo.Orders`
    pub label: String,
    pub sql: String,
}

/// Ordered steps of a rendered script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlScript {
    pub steps: Vec<ScriptStep>,
}

impl SqlScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, sql: impl Into<String>) {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return;
        }
        self.steps.push(ScriptStep {
            label: label.into(),
            sql,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Full script text, each step terminated by a `GO` line.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for step in &self.steps {
            text.push_str(step.sql.trim_end());
            text.push('\n');
            text.push_str(BATCH_SEPARATOR);
            text.push_str("\n\n");
        }
        text
    }

    /// One apply-engine script per step, identified by its label.
    pub fn into_scripts(self) -> Vec<Script> {
        self.steps
            .into_iter()
            .map(|step| Script::new(step.label, step.sql))
            .collect()
    }
}

/// Render a diff as the script that moves the target to the source state.
pub fn script_diff(diff: &DatabaseDiff<'_>) -> SqlScript {
    let mut script = SqlScript::new();

    // 1. properties
    if !diff.props_changed.is_empty() {
        script.push(
            "alter database properties",
            script_prop_list(diff.props_changed.iter().copied()),
        );
    }

    if !diff.schemas.added.is_empty() {
        let sql: String = diff
            .schemas
            .added
            .iter()
            .map(|s| script_schema_create(s))
            .collect();
        script.push("create schemas", sql);
    }
    if !diff.schemas.changed.is_empty() {
        let sql: String = diff
            .schemas
            .changed
            .iter()
            .map(|s| script_schema_owner(s))
            .collect();
        script.push("alter schemas", sql);
    }

    // 2. drop deleted and changed foreign keys
    let fk_drops: String = diff
        .foreign_keys
        .deleted
        .iter()
        .chain(diff.foreign_keys.changed.iter())
        .map(|fk| script_foreign_key_drop(fk))
        .collect();
    script.push("drop foreign keys", fk_drops);

    // 3. drop deleted tables and changed table types
    let table_drops: String = diff
        .tables_deleted
        .iter()
        .chain(diff.table_types_deleted.iter())
        .chain(diff.table_types_diff.iter())
        .map(|t| script_table_drop(t))
        .collect();
    script.push("drop tables", table_drops);

    // 4. alter tables in place
    let alters: String = diff.tables_diff.iter().map(script_table_diff).collect();
    script.push("alter tables", alters);

    // 5. create added tables and recreate changed table types
    let creates: String = diff
        .tables_added
        .iter()
        .chain(diff.table_types_added.iter())
        .chain(diff.table_types_diff.iter())
        .map(|t| script_table_create(t))
        .collect();
    script.push("create tables", creates);

    // 6. add new and changed foreign keys
    let fk_creates: String = diff
        .foreign_keys
        .added
        .iter()
        .chain(diff.foreign_keys.changed.iter())
        .map(|fk| script_foreign_key_create(fk))
        .collect();
    script.push("create foreign keys", fk_creates);

    // 7. routines
    for routine in &diff.routines.added {
        script.push(
            format!("create {} {}", routine.kind, routine.object_name()),
            script_routine_create(routine, diff.source),
        );
    }
    for routine in &diff.routines.changed {
        let label = format!("alter {} {}", routine.kind, routine.object_name());
        match script_routine_alter(routine, diff.target) {
            Some(sql) => script.push(label, sql),
            None => {
                debug!("No ALTER form for {}, dropping and recreating", label);
                script.push(label.clone(), script_routine_drop(routine));
                script.push(label, script_routine_create(routine, diff.source));
            }
        }
    }
    for routine in &diff.routines.deleted {
        script.push(
            format!("drop {} {}", routine.kind, routine.object_name()),
            script_routine_drop(routine),
        );
    }

    // 8. synonyms
    for synonym in &diff.synonyms.added {
        script.push(
            format!("create synonym {}", synonym.object_name()),
            script_synonym_create(synonym),
        );
    }
    for synonym in &diff.synonyms.changed {
        let label = format!("alter synonym {}", synonym.object_name());
        script.push(label.clone(), script_synonym_drop(synonym));
        script.push(label, script_synonym_create(synonym));
    }
    for synonym in &diff.synonyms.deleted {
        script.push(
            format!("drop synonym {}", synonym.object_name()),
            script_synonym_drop(synonym),
        );
    }

    // 9. view indexes
    for view_index in diff
        .view_indexes
        .deleted
        .iter()
        .chain(diff.view_indexes.changed.iter())
    {
        script.push(
            format!("drop view index {}", view_index.key()),
            script_view_index_drop(view_index),
        );
    }
    for view_index in diff
        .view_indexes
        .added
        .iter()
        .chain(diff.view_indexes.changed.iter())
    {
        script.push(
            format!("create view index {}", view_index.key()),
            script_view_index_create(view_index),
        );
    }

    // 10. assemblies
    for assembly in diff
        .assemblies
        .deleted
        .iter()
        .chain(diff.assemblies.changed.iter())
    {
        script.push(
            format!("drop assembly {}", assembly.name),
            script_assembly_drop(assembly),
        );
    }
    for assembly in diff
        .assemblies
        .added
        .iter()
        .chain(diff.assemblies.changed.iter())
    {
        script.push(
            format!("create assembly {}", assembly.name),
            script_assembly_create(assembly),
        );
    }

    // 11. roles
    for role in diff.roles.deleted.iter().chain(diff.roles.changed.iter()) {
        script.push(format!("drop role {}", role.name), script_role_drop(role));
    }
    for role in diff.roles.added.iter().chain(diff.roles.changed.iter()) {
        script.push(
            format!("create role {}", role.name),
            script_role_create(role),
        );
    }

    // 12. users
    for user in diff.users.deleted.iter().chain(diff.users.changed.iter()) {
        script.push(format!("drop user {}", user.name), script_user_drop(user));
    }
    for user in diff.users.added.iter().chain(diff.users.changed.iter()) {
        script.push(
            format!("create user {}", user.name),
            script_user_create(user),
        );
    }

    if !diff.schemas.deleted.is_empty() {
        let sql: String = diff
            .schemas
            .deleted
            .iter()
            .map(|s| script_schema_drop(s))
            .collect();
        script.push("drop schemas", sql);
    }

    debug!("Rendered diff as {} steps", script.steps.len());
    script
}

/// Options for rendering a complete model
#[derive(Debug, Clone, Default)]
pub struct CreateScriptOptions {
    /// Prefix the script with `CREATE DATABASE` and `USE` steps
    pub create_database: bool,
}

/// Render a complete model as a from-scratch creation script, one step per
/// object.
pub fn script_create(db: &Database, options: &CreateScriptOptions) -> SqlScript {
    let mut script = SqlScript::new();

    if options.create_database {
        script.push(
            format!("create database {}", db.name),
            format!("CREATE DATABASE {}", quote_ident(&db.name)),
        );
        script.push(
            format!("use database {}", db.name),
            format!("USE {}", quote_ident(&db.name)),
        );
    }

    script.push("database properties", script_prop_list(db.props()));

    for schema in db.schemas() {
        script.push(
            format!("create schema {}", schema.name),
            script_schema_create(schema),
        );
    }
    for table in db.tables().chain(db.table_types()) {
        let kind = if table.is_type { "table type" } else { "table" };
        script.push(
            format!("create {} {}", kind, table.object_name()),
            script_table_create(table),
        );
    }
    for fk in db.foreign_keys() {
        script.push(
            format!("create foreign key {}", fk.key()),
            script_foreign_key_create(fk),
        );
    }
    for routine in db.routines() {
        script.push(
            format!("create {} {}", routine.kind, routine.object_name()),
            script_routine_create(routine, db),
        );
    }
    for assembly in db.assemblies() {
        script.push(
            format!("create assembly {}", assembly.name),
            script_assembly_create(assembly),
        );
    }
    for role in db.roles() {
        script.push(
            format!("create role {}", role.name),
            script_role_create(role),
        );
    }
    for user in db.users() {
        script.push(
            format!("create user {}", user.name),
            script_user_create(user),
        );
    }
    for view_index in db.view_indexes() {
        script.push(
            format!("create view index {}", view_index.key()),
            script_view_index_create(view_index),
        );
    }
    for synonym in db.synonyms() {
        script.push(
            format!("create synonym {}", synonym.object_name()),
            script_synonym_create(synonym),
        );
    }

    debug!("Rendered {} as {} steps", db.name, script.steps.len());
    script
}

//! Human-readable change summary

use std::fmt::Write;

use super::types::{DatabaseDiff, ObjectDiff};

fn summarize(out: &mut String, include_names: bool, names: Vec<String>, caption: &str) {
    if names.is_empty() {
        return;
    }
    let _ = write!(out, "{}x {}", names.len(), caption);
    if include_names {
        for name in &names {
            let _ = write!(out, "\n\t{}", name);
        }
    }
    out.push('\n');
}

fn summarize_kind<T>(
    out: &mut String,
    include_names: bool,
    diff: &ObjectDiff<'_, T>,
    label: &str,
    name: impl Fn(&T) -> String,
) {
    let names = |objects: &[&T]| objects.iter().map(|o| name(*o)).collect::<Vec<_>>();
    summarize(
        out,
        include_names,
        names(&diff.added),
        &format!("{} in source but not in target", label),
    );
    summarize(
        out,
        include_names,
        names(&diff.deleted),
        &format!("{} not in source but in target", label),
    );
    summarize(
        out,
        include_names,
        names(&diff.changed),
        &format!("{} altered", label),
    );
}

/// One line per non-empty bucket, e.g. `2x tables altered`, optionally
/// followed by the tab-indented object names.
pub fn summarize_changes(diff: &DatabaseDiff<'_>, include_names: bool) -> String {
    let mut out = String::new();
    let two_part = |schema: &str, name: &str| format!("{}.{}", schema, name);

    summarize_kind(&mut out, include_names, &diff.assemblies, "assemblies", |a| {
        a.name.clone()
    });
    summarize_kind(&mut out, include_names, &diff.foreign_keys, "foreign keys", |fk| {
        fk.name.clone()
    });
    summarize(
        &mut out,
        include_names,
        diff.props_changed.iter().map(|p| p.name.clone()).collect(),
        "properties changed",
    );
    summarize_kind(&mut out, include_names, &diff.routines, "routines", |r| {
        format!("{} {}", r.kind, two_part(&r.schema, &r.name))
    });
    summarize_kind(&mut out, include_names, &diff.schemas, "schemas", |s| {
        s.name.clone()
    });
    summarize(
        &mut out,
        include_names,
        diff.tables_added
            .iter()
            .map(|t| two_part(&t.schema, &t.name))
            .collect(),
        "tables in source but not in target",
    );
    summarize(
        &mut out,
        include_names,
        diff.tables_deleted
            .iter()
            .map(|t| two_part(&t.schema, &t.name))
            .collect(),
        "tables not in source but in target",
    );
    summarize(
        &mut out,
        include_names,
        diff.tables_diff.iter().map(|t| t.display_name()).collect(),
        "tables altered",
    );
    summarize(
        &mut out,
        include_names,
        diff.table_types_added
            .iter()
            .map(|t| two_part(&t.schema, &t.name))
            .collect(),
        "table types in source but not in target",
    );
    summarize(
        &mut out,
        include_names,
        diff.table_types_deleted
            .iter()
            .map(|t| two_part(&t.schema, &t.name))
            .collect(),
        "table types not in source but in target",
    );
    summarize(
        &mut out,
        include_names,
        diff.table_types_diff
            .iter()
            .map(|t| two_part(&t.schema, &t.name))
            .collect(),
        "table types altered",
    );
    summarize_kind(&mut out, include_names, &diff.roles, "roles", |r| {
        r.name.clone()
    });
    summarize_kind(&mut out, include_names, &diff.users, "users", |u| {
        u.name.clone()
    });
    summarize_kind(&mut out, include_names, &diff.view_indexes, "view indexes", |vi| {
        vi.index.name.clone()
    });
    summarize_kind(&mut out, include_names, &diff.synonyms, "synonyms", |s| {
        two_part(&s.schema, &s.name)
    });
    out
}

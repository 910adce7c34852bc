//! Routine DDL rendering (procedures, functions, triggers, views, XML schema collections)
//!
//! Routine definitions are opaque text. Creation emits the text as stored;
//! alteration rewrites only the leading `CREATE` keyword.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Database, Routine, RoutineKind};
use crate::util::quote_ident;

/// Leading whitespace and comments followed by the `CREATE` keyword
static LEADING_CREATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\A(?:\s+|--[^\n]*(?:\n|\z)|/\*.*?\*/)*(CREATE)\b").expect("Invalid regex")
});

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

/// Wrap a routine body with `SET` statements for any session option that
/// differs from the database default, restoring the default afterwards.
fn wrap_set_options(routine: &Routine, db: &Database, body: &str) -> String {
    let mut before = String::new();
    let mut after = String::new();
    let quoted_default = db.quoted_identifier_default();
    if routine.quoted_identifier != quoted_default {
        before.push_str(&format!(
            "SET QUOTED_IDENTIFIER {}\nGO\n",
            on_off(routine.quoted_identifier)
        ));
        after.push_str(&format!(
            "GO\nSET QUOTED_IDENTIFIER {}\n",
            on_off(quoted_default)
        ));
    }
    let ansi_default = db.ansi_nulls_default();
    if routine.ansi_nulls != ansi_default {
        before.push_str(&format!("SET ANSI_NULLS {}\nGO\n", on_off(routine.ansi_nulls)));
        after.push_str(&format!("GO\nSET ANSI_NULLS {}\n", on_off(ansi_default)));
    }

    let mut text = before;
    text.push_str(body.trim_end());
    text.push('\n');
    if let Some(trigger) = routine.trigger.as_ref().filter(|t| t.disabled) {
        text.push_str(&format!(
            "GO\nDISABLE TRIGGER {}.{} ON {}\n",
            quote_ident(&routine.schema),
            quote_ident(&routine.name),
            trigger.table.quoted()
        ));
    }
    text.push_str(&after);
    text
}

/// Creation script for a routine, evaluated against `db`'s session defaults.
pub fn script_routine_create(routine: &Routine, db: &Database) -> String {
    wrap_set_options(routine, db, &routine.text)
}

/// `ALTER` form of a routine's definition, when one exists.
///
/// XML schema collections have no `ALTER` equivalent, and a definition with
/// no recognisable leading `CREATE` cannot be rewritten; both return `None`
/// and must be dropped and recreated instead.
pub fn script_routine_alter(routine: &Routine, db: &Database) -> Option<String> {
    if routine.kind == RoutineKind::XmlSchemaCollection {
        return None;
    }
    let keyword = LEADING_CREATE_RE.captures(&routine.text)?.get(1)?;
    let mut body = String::with_capacity(routine.text.len());
    body.push_str(&routine.text[..keyword.start()]);
    body.push_str("ALTER");
    body.push_str(&routine.text[keyword.end()..]);
    Some(wrap_set_options(routine, db, &body))
}

pub fn script_routine_drop(routine: &Routine) -> String {
    format!(
        "DROP {} {}.{}\n",
        routine.kind.drop_keyword(),
        quote_ident(&routine.schema),
        quote_ident(&routine.name)
    )
}

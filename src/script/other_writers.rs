//! DDL rendering for database properties, schemas, assemblies, users, roles,
//! synonyms and view indexes.

use std::fmt::Write;

use crate::model::{Assembly, DbProp, Role, Schema, Synonym, User, ViewIndex};
use crate::util::{quote_ident, quote_literal};

use super::table_writer::script_index_create;

/// Statement setting one property on the current database, or an empty
/// string when the property has no value.
///
/// Expects `@DB` to hold the database name (see [`script_prop_list`]).
pub fn script_prop(prop: &DbProp) -> String {
    if prop.value.is_empty() {
        return String::new();
    }
    match prop.name.to_ascii_uppercase().as_str() {
        "COLLATE" => format!(
            "EXEC('ALTER DATABASE [' + @DB + '] COLLATE {}')",
            prop.value
        ),
        "COMPATIBILITY_LEVEL" => format!(
            "EXEC('ALTER DATABASE [' + @DB + '] SET COMPATIBILITY_LEVEL = {}')",
            prop.value
        ),
        _ => format!(
            "EXEC('ALTER DATABASE [' + @DB + '] SET {} {}')",
            prop.name, prop.value
        ),
    }
}

/// Property statements prefixed with the `@DB` declaration they rely on.
pub fn script_prop_list<'a>(props: impl IntoIterator<Item = &'a DbProp>) -> String {
    let mut text = String::from("DECLARE @DB VARCHAR(255)\nSET @DB = DB_NAME()\n");
    for line in props.into_iter().map(script_prop).filter(|s| !s.is_empty()) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Idempotent schema creation; skipped when the schema already exists or the
/// owner is missing.
pub fn script_schema_create(schema: &Schema) -> String {
    format!(
        "IF NOT EXISTS (SELECT s.schema_id FROM sys.schemas s WHERE s.name = {name_lit}) \
         AND EXISTS (SELECT p.principal_id FROM sys.database_principals p WHERE p.name = {owner_lit})\n\
         BEGIN\n\
         \tEXEC sp_executesql N'CREATE SCHEMA {name} AUTHORIZATION {owner}'\n\
         END\n",
        name_lit = quote_literal(&schema.name),
        owner_lit = quote_literal(&schema.owner),
        name = quote_ident(&schema.name).replace('\'', "''"),
        owner = quote_ident(&schema.owner).replace('\'', "''"),
    )
}

/// Transfer an existing schema to its recorded owner
pub fn script_schema_owner(schema: &Schema) -> String {
    format!(
        "ALTER AUTHORIZATION ON SCHEMA::{} TO {}\n",
        quote_ident(&schema.name),
        quote_ident(&schema.owner)
    )
}

pub fn script_schema_drop(schema: &Schema) -> String {
    format!("DROP SCHEMA {}\n", quote_ident(&schema.name))
}

/// `CREATE ASSEMBLY` from the first file's bytes, with any further files
/// added by `ALTER ASSEMBLY ... ADD FILE`.
pub fn script_assembly_create(assembly: &Assembly) -> String {
    let name = quote_ident(&assembly.name);
    let mut files = assembly.files.iter();
    let mut text = String::new();
    if let Some(main) = files.next() {
        let _ = writeln!(
            text,
            "CREATE ASSEMBLY {}\nFROM 0x{}\nWITH PERMISSION_SET = {}",
            name,
            hex::encode_upper(&main.content),
            assembly.permission_set
        );
    }
    for file in files {
        let _ = writeln!(
            text,
            "ALTER ASSEMBLY {}\nADD FILE FROM 0x{}\nAS N{}",
            name,
            hex::encode_upper(&file.content),
            quote_literal(&file.name)
        );
    }
    text
}

pub fn script_assembly_drop(assembly: &Assembly) -> String {
    format!("DROP ASSEMBLY {}\n", quote_ident(&assembly.name))
}

/// User creation, preceded by its SQL login when a password hash is known
/// and followed by its role memberships.
pub fn script_user_create(user: &User) -> String {
    let name = quote_ident(&user.name);
    let mut text = String::new();
    if let Some(hash) = &user.password_hash {
        let _ = writeln!(
            text,
            "IF SUSER_ID({}) IS NULL\n\tBEGIN CREATE LOGIN {} WITH PASSWORD = 0x{} HASHED END",
            quote_literal(&user.name),
            name,
            hex::encode_upper(hash)
        );
    }
    let _ = write!(text, "CREATE USER {}", name);
    if user.password_hash.is_some() {
        let _ = write!(text, " FOR LOGIN {}", name);
    }
    if let Some(schema) = &user.default_schema {
        let _ = write!(text, " WITH DEFAULT_SCHEMA = {}", quote_ident(schema));
    }
    text.push('\n');
    for role in &user.roles {
        let _ = writeln!(
            text,
            "EXEC sp_addrolemember {}, {}",
            quote_literal(role),
            quote_literal(&user.name)
        );
    }
    text
}

pub fn script_user_drop(user: &User) -> String {
    format!("DROP USER {}\n", quote_ident(&user.name))
}

pub fn script_role_create(role: &Role) -> String {
    format!("{}\n", role.script.trim_end())
}

pub fn script_role_drop(role: &Role) -> String {
    format!("DROP ROLE {}\n", quote_ident(&role.name))
}

pub fn script_synonym_create(synonym: &Synonym) -> String {
    format!(
        "CREATE SYNONYM {} FOR {}\n",
        synonym.object_name().quoted(),
        synonym.base_object_name
    )
}

pub fn script_synonym_drop(synonym: &Synonym) -> String {
    format!("DROP SYNONYM {}\n", synonym.object_name().quoted())
}

pub fn script_view_index_create(view_index: &ViewIndex) -> String {
    let mut text = script_index_create(&view_index.view, &view_index.index);
    text.push('\n');
    text
}

pub fn script_view_index_drop(view_index: &ViewIndex) -> String {
    format!(
        "DROP INDEX {} ON {}\n",
        quote_ident(&view_index.index.name),
        view_index.view.quoted()
    )
}

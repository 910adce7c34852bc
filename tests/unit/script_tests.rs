//! Unit tests for DDL rendering and script ordering

use pretty_assertions::assert_eq;

use rust_sqlsnap::compare::{compare, compare_table};
use rust_sqlsnap::model::{
    Assembly, AssemblyFile, Column, Constraint, ConstraintColumn, Database, DbProp, ForeignKey,
    ReferentialAction, Routine, RoutineKind, Schema, Table, TriggerTarget, User,
};
use rust_sqlsnap::script::{
    script_assembly_create, script_column, script_create, script_data_type, script_diff,
    script_foreign_key_create, script_prop, script_routine_create, script_schema_create,
    script_table_create, script_table_diff, script_user_create, CreateScriptOptions, SqlScript,
};

use crate::common::{name, sample_db, simple_table};

/// Position of the first occurrence of `needle` in `text`
fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in:\n{text}"))
}

// ============================================================================
// Column and Table Rendering
// ============================================================================

#[test]
fn test_data_type_rendering() {
    assert_eq!(
        script_data_type(&Column::new("c", "varchar", true).with_length(50)),
        "[varchar](50)"
    );
    assert_eq!(
        script_data_type(&Column::new("c", "nvarchar", true).with_length(-1)),
        "[nvarchar](max)"
    );
    assert_eq!(
        script_data_type(&Column::new("c", "decimal", true).with_precision(18, 4)),
        "[decimal](18,4)"
    );
    let mut time = Column::new("c", "datetime2", true);
    time.scale = Some(3);
    assert_eq!(script_data_type(&time), "[datetime2](3)");
    assert_eq!(script_data_type(&Column::new("c", "int", true)), "[int]");
    assert_eq!(
        script_data_type(&Column::new("c", "geography", true)),
        "[geography]"
    );
}

#[test]
fn test_column_with_identity_and_default() {
    let column = Column::new("id", "int", false)
        .with_identity(100, 5)
        .with_default("DF_T_id", "((0))");
    assert_eq!(
        script_column(&column),
        "[id] [int] NOT NULL IDENTITY (100,5) CONSTRAINT [DF_T_id] DEFAULT ((0))"
    );
}

#[test]
fn test_computed_column() {
    let column = Column::new("total", "int", true).with_computed("([a]+[b])");
    assert_eq!(script_column(&column), "[total] AS ([a]+[b])");
}

#[test]
fn test_create_table_with_index() {
    let table = Table::new("sales", "Orders")
        .with_column(Column::new("id", "int", false))
        .with_column(Column::new("ref", "varchar", true).with_length(20))
        .with_constraint(Constraint::primary_key(
            "PK_Orders",
            vec![ConstraintColumn::asc("id")],
        ))
        .with_constraint(Constraint {
            included_columns: vec!["id".to_string()],
            filter: Some("([ref] IS NOT NULL)".to_string()),
            ..Constraint::index("IX_Orders_ref", vec![ConstraintColumn::desc("ref")])
        });

    assert_eq!(
        script_table_create(&table),
        "CREATE TABLE [sales].[Orders] (\n\
         \x20  [id] [int] NOT NULL,\n\
         \x20  [ref] [varchar](20) NULL,\n\
         \x20  CONSTRAINT [PK_Orders] PRIMARY KEY CLUSTERED ([id])\n\
         )\n\
         CREATE NONCLUSTERED INDEX [IX_Orders_ref] ON [sales].[Orders] ([ref] DESC) \
         INCLUDE ([id]) WHERE ([ref] IS NOT NULL)\n"
    );
}

#[test]
fn test_create_table_type_declares_indexes_inline() {
    let table = Table::new_type("dbo", "Ids")
        .with_column(Column::new("id", "int", false))
        .with_constraint(Constraint::index("IX_Ids", vec![ConstraintColumn::asc("id")]));
    let sql = script_table_create(&table);
    assert!(sql.starts_with("CREATE TYPE [dbo].[Ids] AS TABLE ("));
    assert!(sql.contains("INDEX [IX_Ids] NONCLUSTERED ([id])"));
    assert!(!sql.contains("CREATE NONCLUSTERED INDEX"));
}

#[test]
fn test_foreign_key_rendering() {
    let mut fk = ForeignKey::new(
        "FK_A_B",
        name("dbo", "A"),
        vec!["b_id".to_string()],
        name("dbo", "B"),
        vec!["id".to_string()],
    );
    fk.on_delete = ReferentialAction::SetNull;
    fk.check = false;

    assert_eq!(
        script_foreign_key_create(&fk),
        "ALTER TABLE [dbo].[A] WITH NOCHECK ADD CONSTRAINT [FK_A_B] FOREIGN KEY ([b_id]) \
         REFERENCES [dbo].[B] ([id]) ON DELETE SET NULL\n\
         ALTER TABLE [dbo].[A] NOCHECK CONSTRAINT [FK_A_B]\n"
    );
}

// ============================================================================
// Table Alteration
// ============================================================================

#[test]
fn test_alter_nullability() {
    let source = Table::new("dbo", "T1").with_column(Column::new("id", "int", false));
    let target = Table::new("dbo", "T1").with_column(Column::new("id", "int", true));
    assert_eq!(
        script_table_diff(&compare_table(&source, &target)),
        "ALTER TABLE [dbo].[T1] ALTER COLUMN [id] [int] NOT NULL\n"
    );
}

#[test]
fn test_alter_default_only() {
    let source = Table::new("dbo", "T")
        .with_column(Column::new("n", "int", false).with_default("DF_T_n", "((1))"));
    let target = Table::new("dbo", "T")
        .with_column(Column::new("n", "int", false).with_default("DF_T_n", "((0))"));
    assert_eq!(
        script_table_diff(&compare_table(&source, &target)),
        "ALTER TABLE [dbo].[T] DROP CONSTRAINT [DF_T_n]\n\
         ALTER TABLE [dbo].[T] ADD CONSTRAINT [DF_T_n] DEFAULT ((1)) FOR [n]\n"
    );
}

#[test]
fn test_alter_statement_order() {
    let source = Table::new("dbo", "T")
        .with_column(Column::new("id", "int", false))
        .with_column(Column::new("added", "int", true))
        .with_constraint(Constraint::primary_key("PK_T", vec![ConstraintColumn::asc("id")]));
    let target = Table::new("dbo", "T")
        .with_column(Column::new("id", "int", false))
        .with_column(Column::new("removed", "int", true).with_default("DF_T_removed", "((0))"))
        .with_constraint(Constraint::unique("UQ_T", vec![ConstraintColumn::asc("removed")]));

    let sql = script_table_diff(&compare_table(&source, &target));
    let drop_constraint = position(&sql, "DROP CONSTRAINT [UQ_T]");
    let drop_default = position(&sql, "DROP CONSTRAINT [DF_T_removed]");
    let drop_column = position(&sql, "DROP COLUMN [removed]");
    let add_column = position(&sql, "ADD [added]");
    let add_constraint = position(&sql, "ADD CONSTRAINT [PK_T]");

    assert!(drop_constraint < drop_default);
    assert!(drop_default < drop_column);
    assert!(drop_column < add_column);
    assert!(add_column < add_constraint);
}

#[test]
fn test_changed_constraint_dropped_then_recreated() {
    let source = Table::new("dbo", "T")
        .with_constraint(Constraint::check("CK_T", "([a]>(1))"));
    let target = Table::new("dbo", "T")
        .with_constraint(Constraint::check("CK_T", "([a]>(0))"));
    assert_eq!(
        script_table_diff(&compare_table(&source, &target)),
        "ALTER TABLE [dbo].[T] DROP CONSTRAINT [CK_T]\n\
         ALTER TABLE [dbo].[T] ADD CONSTRAINT [CK_T] CHECK ([a]>(1))\n"
    );
}

#[test]
fn test_changed_computed_column_is_rebuilt() {
    let source = Table::new("dbo", "T")
        .with_column(Column::new("c", "int", true).with_computed("([a]*(2))"));
    let target = Table::new("dbo", "T")
        .with_column(Column::new("c", "int", true).with_computed("([a]*(3))"));
    let sql = script_table_diff(&compare_table(&source, &target));
    assert!(sql.contains("DROP COLUMN [c]"));
    assert!(sql.contains("ADD [c] AS ([a]*(2))"));
    assert!(!sql.contains("ALTER COLUMN"));
}

// ============================================================================
// Other Objects
// ============================================================================

#[test]
fn test_prop_rendering() {
    assert_eq!(
        script_prop(&DbProp::new("RECOVERY", "SIMPLE")),
        "EXEC('ALTER DATABASE [' + @DB + '] SET RECOVERY SIMPLE')"
    );
    assert_eq!(
        script_prop(&DbProp::new("COMPATIBILITY_LEVEL", "150")),
        "EXEC('ALTER DATABASE [' + @DB + '] SET COMPATIBILITY_LEVEL = 150')"
    );
    assert_eq!(
        script_prop(&DbProp::new("COLLATE", "Latin1_General_CI_AS")),
        "EXEC('ALTER DATABASE [' + @DB + '] COLLATE Latin1_General_CI_AS')"
    );
    assert_eq!(script_prop(&DbProp::new("RECOVERY", "")), "");
}

#[test]
fn test_schema_creation_is_idempotent() {
    let sql = script_schema_create(&Schema {
        name: "app".to_string(),
        owner: "dbo".to_string(),
    });
    assert!(sql.starts_with("IF NOT EXISTS (SELECT s.schema_id FROM sys.schemas s WHERE s.name = 'app')"));
    assert!(sql.contains("EXEC sp_executesql N'CREATE SCHEMA [app] AUTHORIZATION [dbo]'"));
}

#[test]
fn test_user_with_login_and_roles() {
    let mut user = User::new("svc");
    user.password_hash = Some(vec![0x02, 0x00, 0xfe]);
    user.default_schema = Some("app".to_string());
    user.roles.insert("db_datawriter".to_string());
    user.roles.insert("db_datareader".to_string());

    assert_eq!(
        script_user_create(&user),
        "IF SUSER_ID('svc') IS NULL\n\tBEGIN CREATE LOGIN [svc] WITH PASSWORD = 0x0200FE HASHED END\n\
         CREATE USER [svc] FOR LOGIN [svc] WITH DEFAULT_SCHEMA = [app]\n\
         EXEC sp_addrolemember 'db_datareader', 'svc'\n\
         EXEC sp_addrolemember 'db_datawriter', 'svc'\n"
    );
}

#[test]
fn test_assembly_with_extra_files() {
    let assembly = Assembly {
        name: "Clr".to_string(),
        permission_set: "SAFE".to_string(),
        files: vec![
            AssemblyFile {
                name: "Clr.dll".to_string(),
                content: vec![0xca, 0xfe],
            },
            AssemblyFile {
                name: "Clr.pdb".to_string(),
                content: vec![0x01],
            },
        ],
    };
    assert_eq!(
        script_assembly_create(&assembly),
        "CREATE ASSEMBLY [Clr]\nFROM 0xCAFE\nWITH PERMISSION_SET = SAFE\n\
         ALTER ASSEMBLY [Clr]\nADD FILE FROM 0x01\nAS N'Clr.pdb'\n"
    );
}

#[test]
fn test_disabled_trigger_is_disabled_after_create() {
    let mut db = Database::new("T");
    db.add_table(simple_table("T1")).unwrap();
    let mut trigger = Routine::new(
        "dbo",
        "trT1",
        RoutineKind::Trigger,
        "CREATE TRIGGER [dbo].[trT1] ON [dbo].[T1] AFTER UPDATE AS SELECT 1",
    );
    trigger.trigger = Some(TriggerTarget {
        table: name("dbo", "T1"),
        disabled: true,
    });

    let sql = script_routine_create(&trigger, &db);
    assert!(sql.ends_with("GO\nDISABLE TRIGGER [dbo].[trT1] ON [dbo].[T1]\n"));
}

#[test]
fn test_session_option_reset_uses_database_default() {
    let mut db = Database::new("Ansi");
    db.set_prop("ANSI_NULLS", "OFF");
    let routine = Routine::new("dbo", "p", RoutineKind::Procedure, "CREATE PROCEDURE dbo.p AS SELECT 1");

    let sql = script_routine_create(&routine, &db);
    assert_eq!(
        sql,
        "SET ANSI_NULLS ON\nGO\nCREATE PROCEDURE dbo.p AS SELECT 1\nGO\nSET ANSI_NULLS OFF\n"
    );
}

// ============================================================================
// Script Ordering
// ============================================================================

#[test]
fn test_added_table_script_has_no_alter_or_drop() {
    let mut source = Database::new("A");
    source
        .add_table(Table::new("dbo", "T1").with_column(Column::new("id", "int", true)))
        .unwrap();
    let target = Database::new("A");

    let text = script_diff(&compare(&source, &target)).render();
    assert!(text.contains("CREATE TABLE [dbo].[T1]"));
    assert!(!text.contains("ALTER TABLE"), "Unexpected ALTER in:\n{text}");
    assert!(!text.contains("DROP "), "Unexpected DROP in:\n{text}");
}

#[test]
fn test_foreign_key_created_after_tables() {
    let mut source = Database::new("C");
    source.add_table(simple_table("T1")).unwrap();
    source.add_table(simple_table("T2")).unwrap();
    source
        .add_foreign_key(ForeignKey::new(
            "FK1",
            name("dbo", "T1"),
            vec!["id".to_string()],
            name("dbo", "T2"),
            vec!["id".to_string()],
        ))
        .unwrap();
    let target = Database::new("C");

    let text = script_diff(&compare(&source, &target)).render();
    let fk = position(&text, "ADD CONSTRAINT [FK1] FOREIGN KEY");
    assert!(position(&text, "CREATE TABLE [dbo].[T1]") < fk);
    assert!(position(&text, "CREATE TABLE [dbo].[T2]") < fk);
}

#[test]
fn test_diff_step_order() {
    let mut source = sample_db();
    source.set_prop("RECOVERY", "FULL");
    let mut target = sample_db();
    target
        .add_table(Table::new("dbo", "Legacy").with_column(Column::new("id", "int", false)))
        .unwrap();

    let diff = compare(&source, &target);
    let labels: Vec<String> = script_diff(&diff)
        .steps
        .into_iter()
        .map(|s| s.label)
        .collect();
    assert_eq!(labels, vec!["alter database properties", "drop tables"]);
}

#[test]
fn test_schema_owner_change_transfers_authorization() {
    let schema = |owner: &str| Schema {
        name: "sales".to_string(),
        owner: owner.to_string(),
    };
    let mut source = Database::new("S");
    source.add_schema(schema("alice")).unwrap();
    source
        .add_schema(Schema {
            name: "audit".to_string(),
            owner: "dbo".to_string(),
        })
        .unwrap();
    let mut target = Database::new("S");
    target.add_schema(schema("bob")).unwrap();

    let script = script_diff(&compare(&source, &target));
    let labels: Vec<&str> = script.steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["create schemas", "alter schemas"]);
    assert_eq!(
        script.steps[1].sql,
        "ALTER AUTHORIZATION ON SCHEMA::[sales] TO [alice]\n"
    );
}

#[test]
fn test_changed_routine_uses_alter() {
    let mut source = Database::new("R");
    source
        .add_routine(Routine::new(
            "dbo",
            "p",
            RoutineKind::Procedure,
            "CREATE PROCEDURE [dbo].[p] AS SELECT 2",
        ))
        .unwrap();
    let mut target = Database::new("R");
    target
        .add_routine(Routine::new(
            "dbo",
            "p",
            RoutineKind::Procedure,
            "CREATE PROCEDURE [dbo].[p] AS SELECT 1",
        ))
        .unwrap();

    let script = script_diff(&compare(&source, &target));
    assert_eq!(script.steps.len(), 1);
    assert_eq!(script.steps[0].label, "alter Procedure dbo.p");
    assert_eq!(script.steps[0].sql, "ALTER PROCEDURE [dbo].[p] AS SELECT 2\n");
}

#[test]
fn test_changed_xml_schema_collection_drops_and_creates() {
    let routine = |text: &str| {
        Routine::new("dbo", "Shapes", RoutineKind::XmlSchemaCollection, text)
    };
    let mut source = Database::new("X");
    source
        .add_routine(routine("CREATE XML SCHEMA COLLECTION [dbo].[Shapes] AS N'<b/>'"))
        .unwrap();
    let mut target = Database::new("X");
    target
        .add_routine(routine("CREATE XML SCHEMA COLLECTION [dbo].[Shapes] AS N'<a/>'"))
        .unwrap();

    let script = script_diff(&compare(&source, &target));
    let sql: Vec<&str> = script.steps.iter().map(|s| s.sql.as_str()).collect();
    assert_eq!(
        sql,
        vec![
            "DROP XML SCHEMA COLLECTION [dbo].[Shapes]\n",
            "CREATE XML SCHEMA COLLECTION [dbo].[Shapes] AS N'<b/>'\n",
        ]
    );
}

#[test]
fn test_create_script_order() {
    let db = sample_db();
    let script = script_create(
        &db,
        &CreateScriptOptions {
            create_database: true,
        },
    );
    let labels: Vec<&str> = script.steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "create database Shop",
            "use database Shop",
            "database properties",
            "create schema sales",
            "create table dbo.Customers",
            "create table sales.Orders",
            "create table type dbo.IdList",
            "create foreign key sales.FK_Orders_Customers",
            "create View dbo.CustomerOrders",
            "create Procedure dbo.GetCustomer",
            "create Function dbo.OrderCount",
            "create Trigger sales.trOrders",
            "create role reporting",
            "create user report_user",
            "create view index IX_CustomerOrders on dbo.CustomerOrders",
            "create synonym dbo.Clients",
        ]
    );
}

#[test]
fn test_render_separates_steps_with_go() {
    let mut script = SqlScript::new();
    script.push("one", "SELECT 1\n");
    script.push("empty", "  \n");
    script.push("two", "SELECT 2");
    assert_eq!(script.steps.len(), 2, "Blank steps are skipped");
    assert_eq!(script.render(), "SELECT 1\nGO\n\nSELECT 2\nGO\n\n");
}

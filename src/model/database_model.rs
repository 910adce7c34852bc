//! Database model representation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

use super::{
    Assembly, DbProp, ForeignKey, ObjectName, Role, Routine, RoutineKind, Schema, Synonym, Table,
    User, ViewIndex, ViewIndexKey,
};

/// Engine properties every model tracks, in scripting order
pub const KNOWN_PROPS: [&str; 26] = [
    "COMPATIBILITY_LEVEL",
    "COLLATE",
    "AUTO_CLOSE",
    "AUTO_SHRINK",
    "ALLOW_SNAPSHOT_ISOLATION",
    "READ_COMMITTED_SNAPSHOT",
    "RECOVERY",
    "PAGE_VERIFY",
    "AUTO_CREATE_STATISTICS",
    "AUTO_UPDATE_STATISTICS",
    "AUTO_UPDATE_STATISTICS_ASYNC",
    "ANSI_NULL_DEFAULT",
    "ANSI_NULLS",
    "ANSI_PADDING",
    "ANSI_WARNINGS",
    "ARITHABORT",
    "CONCAT_NULL_YIELDS_NULL",
    "NUMERIC_ROUNDABORT",
    "QUOTED_IDENTIFIER",
    "RECURSIVE_TRIGGERS",
    "CURSOR_CLOSE_ON_COMMIT",
    "CURSOR_DEFAULT",
    "TRUSTWORTHY",
    "DB_CHAINING",
    "PARAMETERIZATION",
    "DATE_CORRELATION_OPTIMIZATION",
];

/// The complete schema model of one database.
///
/// Every collection is keyed by the object's natural identity and keeps
/// insertion order. Identities are unique within a collection; the `add_*`
/// methods reject duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatabaseSnapshot", into = "DatabaseSnapshot")]
pub struct Database {
    pub name: String,
    props: Vec<DbProp>,
    schemas: IndexMap<String, Schema>,
    tables: IndexMap<ObjectName, Table>,
    table_types: IndexMap<ObjectName, Table>,
    foreign_keys: IndexMap<ObjectName, ForeignKey>,
    routines: IndexMap<ObjectName, Routine>,
    assemblies: IndexMap<String, Assembly>,
    users: IndexMap<String, User>,
    roles: IndexMap<String, Role>,
    synonyms: IndexMap<ObjectName, Synonym>,
    view_indexes: IndexMap<ViewIndexKey, ViewIndex>,
}

impl Database {
    /// An empty model carrying the known engine properties with no values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: KNOWN_PROPS.iter().map(|p| DbProp::new(*p, "")).collect(),
            schemas: IndexMap::new(),
            tables: IndexMap::new(),
            table_types: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            routines: IndexMap::new(),
            assemblies: IndexMap::new(),
            users: IndexMap::new(),
            roles: IndexMap::new(),
            synonyms: IndexMap::new(),
            view_indexes: IndexMap::new(),
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn props(&self) -> &[DbProp] {
        &self.props
    }

    /// Property lookup is case-insensitive on the property name.
    pub fn prop(&self, name: &str) -> Option<&DbProp> {
        self.props.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Set a property value, adding the property if it is not already tracked.
    pub fn set_prop(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .props
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(prop) => prop.value = value,
            None => self.props.push(DbProp::new(name, value)),
        }
    }

    /// Database default for `ANSI_NULLS`, `ON` unless explicitly `OFF`
    pub fn ansi_nulls_default(&self) -> bool {
        !self
            .prop("ANSI_NULLS")
            .is_some_and(|p| p.value.eq_ignore_ascii_case("OFF"))
    }

    /// Database default for `QUOTED_IDENTIFIER`, `ON` unless explicitly `OFF`
    pub fn quoted_identifier_default(&self) -> bool {
        !self
            .prop("QUOTED_IDENTIFIER")
            .is_some_and(|p| p.value.eq_ignore_ascii_case("OFF"))
    }

    // ========================================================================
    // Schemas, tables and table types
    // ========================================================================

    pub fn add_schema(&mut self, schema: Schema) -> Result<()> {
        insert_unique(&mut self.schemas, schema.name.clone(), schema, "schema")
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    /// Add a table or, when `is_type` is set, a table type.
    ///
    /// Tables and table types are separate namespaces.
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let key = table.object_name();
        if table.is_type {
            insert_unique(&mut self.table_types, key, table, "table type")
        } else {
            insert_unique(&mut self.tables, key, table, "table")
        }
    }

    pub fn table(&self, name: &ObjectName) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &ObjectName) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_type(&self, name: &ObjectName) -> Option<&Table> {
        self.table_types.get(name)
    }

    pub fn table_type_mut(&mut self, name: &ObjectName) -> Option<&mut Table> {
        self.table_types.get_mut(name)
    }

    pub fn table_types(&self) -> impl Iterator<Item = &Table> {
        self.table_types.values()
    }

    // ========================================================================
    // Foreign keys
    // ========================================================================

    /// Add a foreign key. Both tables must already be in the model and the
    /// column lists must pair up one to one.
    pub fn add_foreign_key(&mut self, fk: ForeignKey) -> Result<()> {
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(SnapshotError::ForeignKeyColumnMismatch {
                name: fk.name.clone(),
                columns: fk.columns.len(),
                ref_columns: fk.ref_columns.len(),
            });
        }
        for parent in [&fk.table, &fk.ref_table] {
            if !self.tables.contains_key(parent) {
                return Err(SnapshotError::MissingParent {
                    kind: "foreign key",
                    name: fk.name.clone(),
                    parent: parent.to_string(),
                });
            }
        }
        insert_unique(&mut self.foreign_keys, fk.key(), fk, "foreign key")
    }

    pub fn foreign_key(&self, key: &ObjectName) -> Option<&ForeignKey> {
        self.foreign_keys.get(key)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.values()
    }

    /// Foreign keys owned by `table`, in model order
    pub fn foreign_keys_for<'a>(
        &'a self,
        table: &'a ObjectName,
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys.values().filter(move |fk| &fk.table == table)
    }

    // ========================================================================
    // Routines
    // ========================================================================

    pub fn add_routine(&mut self, routine: Routine) -> Result<()> {
        if let Some(target) = &routine.trigger {
            if !self.tables.contains_key(&target.table) && !self.is_view(&target.table) {
                return Err(SnapshotError::MissingParent {
                    kind: "trigger",
                    name: routine.object_name().to_string(),
                    parent: target.table.to_string(),
                });
            }
        }
        insert_unique(
            &mut self.routines,
            routine.object_name(),
            routine,
            "routine",
        )
    }

    pub fn routine(&self, name: &ObjectName) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    fn is_view(&self, name: &ObjectName) -> bool {
        self.routines
            .get(name)
            .is_some_and(|r| r.kind == RoutineKind::View)
    }

    // ========================================================================
    // Assemblies, users, roles, synonyms, view indexes
    // ========================================================================

    pub fn add_assembly(&mut self, assembly: Assembly) -> Result<()> {
        insert_unique(
            &mut self.assemblies,
            assembly.name.clone(),
            assembly,
            "assembly",
        )
    }

    pub fn assembly(&self, name: &str) -> Option<&Assembly> {
        self.assemblies.get(name)
    }

    pub fn assemblies(&self) -> impl Iterator<Item = &Assembly> {
        self.assemblies.values()
    }

    pub fn add_user(&mut self, user: User) -> Result<()> {
        insert_unique(&mut self.users, user.name.clone(), user, "user")
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn add_role(&mut self, role: Role) -> Result<()> {
        insert_unique(&mut self.roles, role.name.clone(), role, "role")
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn add_synonym(&mut self, synonym: Synonym) -> Result<()> {
        insert_unique(
            &mut self.synonyms,
            synonym.object_name(),
            synonym,
            "synonym",
        )
    }

    pub fn synonym(&self, name: &ObjectName) -> Option<&Synonym> {
        self.synonyms.get(name)
    }

    pub fn synonyms(&self) -> impl Iterator<Item = &Synonym> {
        self.synonyms.values()
    }

    /// Add an index to a view. The view must already be in the model.
    pub fn add_view_index(&mut self, view_index: ViewIndex) -> Result<()> {
        if !self.is_view(&view_index.view) {
            return Err(SnapshotError::MissingParent {
                kind: "view index",
                name: view_index.index.name.clone(),
                parent: view_index.view.to_string(),
            });
        }
        insert_unique(
            &mut self.view_indexes,
            view_index.key(),
            view_index,
            "view index",
        )
    }

    pub fn view_index(&self, key: &ViewIndexKey) -> Option<&ViewIndex> {
        self.view_indexes.get(key)
    }

    pub fn view_indexes(&self) -> impl Iterator<Item = &ViewIndex> {
        self.view_indexes.values()
    }

    /// Indexes defined on `view`, in model order
    pub fn view_indexes_for<'a>(
        &'a self,
        view: &'a ObjectName,
    ) -> impl Iterator<Item = &'a ViewIndex> + 'a {
        self.view_indexes.values().filter(move |vi| &vi.view == view)
    }
}

fn insert_unique<K, V>(
    map: &mut IndexMap<K, V>,
    key: K,
    value: V,
    kind: &'static str,
) -> Result<()>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    if map.contains_key(&key) {
        return Err(SnapshotError::DuplicateObject {
            kind,
            name: key.to_string(),
        });
    }
    map.insert(key, value);
    Ok(())
}

/// Serialized form of a [`Database`]: plain ordered lists.
///
/// Loading goes back through the `add_*` methods so identity and parent
/// checks apply to snapshots read from disk too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DatabaseSnapshot {
    name: String,
    #[serde(default)]
    props: Vec<DbProp>,
    #[serde(default)]
    schemas: Vec<Schema>,
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    routines: Vec<Routine>,
    #[serde(default)]
    assemblies: Vec<Assembly>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    synonyms: Vec<Synonym>,
    #[serde(default)]
    view_indexes: Vec<ViewIndex>,
}

impl TryFrom<DatabaseSnapshot> for Database {
    type Error = SnapshotError;

    fn try_from(snapshot: DatabaseSnapshot) -> Result<Self> {
        let mut db = Database::new(snapshot.name);
        for prop in snapshot.props {
            db.set_prop(&prop.name, prop.value);
        }
        for schema in snapshot.schemas {
            db.add_schema(schema)?;
        }
        for table in snapshot.tables {
            db.add_table(table)?;
        }
        for fk in snapshot.foreign_keys {
            db.add_foreign_key(fk)?;
        }
        // Views first so triggers and indexes on views resolve their parent.
        let (views, others): (Vec<_>, Vec<_>) = snapshot
            .routines
            .into_iter()
            .partition(|r| r.kind == RoutineKind::View);
        for routine in views.into_iter().chain(others) {
            db.add_routine(routine)?;
        }
        for assembly in snapshot.assemblies {
            db.add_assembly(assembly)?;
        }
        for user in snapshot.users {
            db.add_user(user)?;
        }
        for role in snapshot.roles {
            db.add_role(role)?;
        }
        for synonym in snapshot.synonyms {
            db.add_synonym(synonym)?;
        }
        for view_index in snapshot.view_indexes {
            db.add_view_index(view_index)?;
        }
        Ok(db)
    }
}

impl From<Database> for DatabaseSnapshot {
    fn from(db: Database) -> Self {
        Self {
            name: db.name,
            props: db.props,
            schemas: db.schemas.into_values().collect(),
            tables: db
                .tables
                .into_values()
                .chain(db.table_types.into_values())
                .collect(),
            foreign_keys: db.foreign_keys.into_values().collect(),
            routines: db.routines.into_values().collect(),
            assemblies: db.assemblies.into_values().collect(),
            users: db.users.into_values().collect(),
            roles: db.roles.into_values().collect(),
            synonyms: db.synonyms.into_values().collect(),
            view_indexes: db.view_indexes.into_values().collect(),
        }
    }
}

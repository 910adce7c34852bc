//! Schema model element types

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The schema whose objects are scripted without a schema prefix in file names
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Composite identity of a schema-scoped object: (owning schema, name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    pub schema: String,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Bracket-quoted two-part name, e.g. `[dbo].[Orders]`
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}",
            crate::util::quote_ident(&self.schema),
            crate::util::quote_ident(&self.name)
        )
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Engine-level database property (e.g. COMPATIBILITY_LEVEL, COLLATE)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbProp {
    pub name: String,
    /// Empty when the property has not been read from a catalog
    pub value: String,
}

impl DbProp {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Database schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub owner: String,
}

/// Seed and increment of an identity column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub seed: i64,
    pub increment: i64,
}

/// Named default constraint bound to a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefault {
    pub name: String,
    pub expression: String,
}

/// Table or table-type column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type name, e.g. `varchar`, `decimal`, `geography`
    pub data_type: String,
    pub is_nullable: bool,
    /// 1-based ordinal; not part of column equality
    pub position: i32,
    /// Character/byte length; `-1` means `max`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    #[serde(default)]
    pub is_rowguid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    /// Computed column expression text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<String>,
}

impl Column {
    /// A plain column with no length, identity, default or computed expression.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            position: 0,
            length: None,
            precision: None,
            scale: None,
            is_rowguid: false,
            identity: None,
            default: None,
            computed: None,
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_identity(mut self, seed: i64, increment: i64) -> Self {
        self.identity = Some(Identity { seed, increment });
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault {
            name: name.into(),
            expression: expression.into(),
        });
        self
    }

    pub fn with_computed(mut self, expression: impl Into<String>) -> Self {
        self.computed = Some(expression.into());
        self
    }
}

/// Kind of table-level constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check,
    Index,
}

impl ConstraintKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::Check => "CHECK",
            ConstraintKind::Index => "INDEX",
        }
    }
}

/// Key column of a constraint or index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintColumn {
    pub name: String,
    #[serde(default)]
    pub descending: bool,
}

impl ConstraintColumn {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: false,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: true,
        }
    }
}

/// Primary key, unique, check constraint or index on a table, table type or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    #[serde(default)]
    pub clustered: bool,
    #[serde(default)]
    pub unique: bool,
    /// Filter predicate of a filtered index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub columns: Vec<ConstraintColumn>,
    #[serde(default)]
    pub included_columns: Vec<String>,
    #[serde(default)]
    pub not_for_replication: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_expression: Option<String>,
}

impl Constraint {
    fn base(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            clustered: false,
            unique: false,
            filter: None,
            columns: Vec::new(),
            included_columns: Vec::new(),
            not_for_replication: false,
            check_expression: None,
        }
    }

    pub fn primary_key(name: impl Into<String>, columns: Vec<ConstraintColumn>) -> Self {
        Self {
            clustered: true,
            unique: true,
            columns,
            ..Self::base(name, ConstraintKind::PrimaryKey)
        }
    }

    pub fn unique(name: impl Into<String>, columns: Vec<ConstraintColumn>) -> Self {
        Self {
            unique: true,
            columns,
            ..Self::base(name, ConstraintKind::Unique)
        }
    }

    pub fn index(name: impl Into<String>, columns: Vec<ConstraintColumn>) -> Self {
        Self {
            columns,
            ..Self::base(name, ConstraintKind::Index)
        }
    }

    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            check_expression: Some(expression.into()),
            ..Self::base(name, ConstraintKind::Check)
        }
    }
}

/// Table or user-defined table type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// True for a user-defined table type
    #[serde(default)]
    pub is_type: bool,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            is_type: false,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn new_type(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_type: true,
            ..Self::new(schema, name)
        }
    }

    pub fn object_name(&self) -> ObjectName {
        ObjectName::new(&self.schema, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
    }

    /// Append a column, assigning the next ordinal position when none was set.
    pub fn with_column(mut self, mut column: Column) -> Self {
        if column.position == 0 {
            column.position = self.columns.len() as i32 + 1;
        }
        self.columns.push(column);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// Foreign key constraint.
///
/// Owning and referenced tables are held by name; the tables themselves are
/// owned by the [`Database`](super::Database).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub ref_table: ObjectName,
    /// Positionally paired with `columns`
    pub ref_columns: Vec<String>,
    #[serde(default)]
    pub on_update: ReferentialAction,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    /// False when the constraint is disabled (`NOCHECK`)
    #[serde(default = "enabled")]
    pub check: bool,
}

fn enabled() -> bool {
    true
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        table: ObjectName,
        columns: Vec<String>,
        ref_table: ObjectName,
        ref_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table,
            columns,
            ref_table,
            ref_columns,
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
            check: true,
        }
    }

    /// Identity within the model: (owning table's schema, name)
    pub fn key(&self) -> ObjectName {
        ObjectName::new(&self.table.schema, &self.name)
    }
}

/// Kind of textual routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoutineKind {
    Procedure,
    Function,
    Trigger,
    View,
    XmlSchemaCollection,
}

impl RoutineKind {
    /// Keyword used in `DROP` statements
    pub fn drop_keyword(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Trigger => "TRIGGER",
            RoutineKind::View => "VIEW",
            RoutineKind::XmlSchemaCollection => "XML SCHEMA COLLECTION",
        }
    }

    /// Snapshot directory holding routines of this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "procedures",
            RoutineKind::Function => "functions",
            RoutineKind::Trigger => "triggers",
            RoutineKind::View => "views",
            RoutineKind::XmlSchemaCollection => "xmlschemacollections",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutineKind::Procedure => "Procedure",
            RoutineKind::Function => "Function",
            RoutineKind::Trigger => "Trigger",
            RoutineKind::View => "View",
            RoutineKind::XmlSchemaCollection => "XmlSchemaCollection",
        };
        f.write_str(name)
    }
}

/// Table a DML trigger is attached to, and whether it is disabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTarget {
    pub table: ObjectName,
    #[serde(default)]
    pub disabled: bool,
}

/// Procedure, function, trigger, view or XML schema collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub schema: String,
    pub name: String,
    pub kind: RoutineKind,
    /// Definition text exactly as stored by the engine
    pub text: String,
    #[serde(default = "enabled")]
    pub ansi_nulls: bool,
    #[serde(default = "enabled")]
    pub quoted_identifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerTarget>,
}

impl Routine {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: RoutineKind,
        text: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            text: text.into(),
            ansi_nulls: true,
            quoted_identifier: true,
            trigger: None,
        }
    }

    pub fn object_name(&self) -> ObjectName {
        ObjectName::new(&self.schema, &self.name)
    }
}

/// One binary file of a CLR assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyFile {
    pub name: String,
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
}

/// CLR assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    pub name: String,
    /// `SAFE`, `EXTERNAL_ACCESS` or `UNSAFE`
    pub permission_set: String,
    pub files: Vec<AssemblyFile>,
}

/// Database user with its role memberships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// SQL login password hash, when the user maps to a SQL login
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub password_hash: Option<Vec<u8>>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_schema: None,
            roles: BTreeSet::new(),
            password_hash: None,
        }
    }
}

/// Database role, kept as its full creation script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub script: String,
}

/// Synonym for another object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub schema: String,
    pub name: String,
    /// Target object name, compared verbatim
    pub base_object_name: String,
}

impl Synonym {
    pub fn object_name(&self) -> ObjectName {
        ObjectName::new(&self.schema, &self.name)
    }
}

/// Index defined on a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewIndex {
    pub view: ObjectName,
    pub index: Constraint,
}

impl ViewIndex {
    pub fn key(&self) -> ViewIndexKey {
        ViewIndexKey {
            view: self.view.clone(),
            index: self.index.name.clone(),
        }
    }
}

/// Identity of a view index. Index names are only unique per view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewIndexKey {
    pub view: ObjectName,
    pub index: String,
}

impl fmt::Display for ViewIndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.index, self.view)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => super::hex_bytes::serialize(bytes, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|t| hex::decode(t.trim_start_matches("0x")).map_err(serde::de::Error::custom))
            .transpose()
    }
}

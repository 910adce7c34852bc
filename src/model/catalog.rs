//! Catalog reader seam
//!
//! A [`CatalogReader`] answers one query per catalog feature. Optional
//! features return [`CatalogFeature::Unsupported`] when the engine or edition
//! lacks them; [`load_database`] turns that into an empty collection.

use tracing::debug;

use crate::error::Result;

use super::{
    attach_columns, attach_constraints, Assembly, ColumnRow, ConstraintRow, Database, DbProp,
    ForeignKey, Role, Routine, Schema, Synonym, Table, User, ViewIndex,
};

/// Result of querying a catalog feature the engine may not have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFeature<T> {
    Supported(T),
    Unsupported,
}

impl<T: Default> CatalogFeature<T> {
    /// Items of a supported feature, or an empty value when unsupported.
    pub fn into_items(self) -> T {
        match self {
            CatalogFeature::Supported(items) => items,
            CatalogFeature::Unsupported => T::default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, CatalogFeature::Supported(_))
    }
}

/// Source of catalog rows for one database.
///
/// Tables and table types come back without columns or constraints; those are
/// returned as separate row sets and attached by name.
pub trait CatalogReader {
    fn database_name(&mut self) -> Result<String>;
    fn props(&mut self) -> Result<Vec<DbProp>>;
    fn schemas(&mut self) -> Result<Vec<Schema>>;
    fn tables(&mut self) -> Result<Vec<Table>>;
    fn table_types(&mut self) -> Result<CatalogFeature<Vec<Table>>>;
    fn columns(&mut self) -> Result<Vec<ColumnRow>>;
    fn constraints(&mut self) -> Result<Vec<ConstraintRow>>;
    fn foreign_keys(&mut self) -> Result<Vec<ForeignKey>>;
    fn routines(&mut self) -> Result<Vec<Routine>>;
    fn xml_schema_collections(&mut self) -> Result<CatalogFeature<Vec<Routine>>>;
    fn assemblies(&mut self) -> Result<CatalogFeature<Vec<Assembly>>>;
    fn users(&mut self) -> Result<Vec<User>>;
    fn roles(&mut self) -> Result<Vec<Role>>;
    fn synonyms(&mut self) -> Result<CatalogFeature<Vec<Synonym>>>;
    fn view_indexes(&mut self) -> Result<Vec<ViewIndex>>;
}

fn optional<T: Default>(feature: CatalogFeature<T>, what: &str) -> T {
    if !feature.is_supported() {
        debug!("{} not supported by this server, skipping", what);
    }
    feature.into_items()
}

/// Build a complete model from a catalog reader.
pub fn load_database(reader: &mut dyn CatalogReader) -> Result<Database> {
    let mut db = Database::new(reader.database_name()?);
    debug!("Loading schema model for {}", db.name);

    for prop in reader.props()? {
        db.set_prop(&prop.name, prop.value);
    }
    for schema in reader.schemas()? {
        db.add_schema(schema)?;
    }
    for table in reader.tables()? {
        db.add_table(table)?;
    }
    for table_type in optional(reader.table_types()?, "Table types") {
        db.add_table(Table {
            is_type: true,
            ..table_type
        })?;
    }
    attach_columns(&mut db, reader.columns()?)?;
    attach_constraints(&mut db, reader.constraints()?)?;

    for fk in reader.foreign_keys()? {
        db.add_foreign_key(fk)?;
    }

    let (views, others): (Vec<_>, Vec<_>) = reader
        .routines()?
        .into_iter()
        .partition(|r| r.kind == super::RoutineKind::View);
    for routine in views.into_iter().chain(others) {
        db.add_routine(routine)?;
    }
    for collection in optional(reader.xml_schema_collections()?, "XML schema collections") {
        db.add_routine(collection)?;
    }
    for assembly in optional(reader.assemblies()?, "CLR assemblies") {
        db.add_assembly(assembly)?;
    }
    for user in reader.users()? {
        db.add_user(user)?;
    }
    for role in reader.roles()? {
        db.add_role(role)?;
    }
    for synonym in optional(reader.synonyms()?, "Synonyms") {
        db.add_synonym(synonym)?;
    }
    for view_index in reader.view_indexes()? {
        db.add_view_index(view_index)?;
    }

    debug!(
        "Loaded {} tables, {} routines, {} foreign keys",
        db.tables().count(),
        db.routines().count(),
        db.foreign_keys().count()
    );
    Ok(db)
}

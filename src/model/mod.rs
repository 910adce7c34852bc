//! Schema model: the in-memory structure of one database

mod builder;
mod catalog;
mod database_model;
mod elements;

pub use builder::{attach_columns, attach_constraints, ColumnRow, ConstraintRow};
pub use catalog::{load_database, CatalogFeature, CatalogReader};
pub(crate) use database_model::DatabaseSnapshot;
pub use database_model::{Database, KNOWN_PROPS};
pub use elements::*;

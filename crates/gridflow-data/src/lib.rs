//! Data-driven catalogs for gridflow: resource grades, connector kinds and
//! building templates loaded from RON, TOML or JSON files.

pub mod catalog;
pub mod loader;
pub mod schema;

pub use catalog::{Catalog, KindTemplate, load_catalog};
pub use loader::DataLoadError;

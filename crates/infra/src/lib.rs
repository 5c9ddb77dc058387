//! Infrastructure layer: SQLite pool and schema, catalog and order
//! repositories, spreadsheet import.

pub mod catalog;
pub mod db;
pub mod error;
pub mod import;
pub mod orders;

pub use catalog::CatalogRepository;
pub use db::{connect, connect_in_memory, migrate};
pub use error::{InfraError, InfraResult};
pub use import::{CatalogSheet, ImportReport, import_catalog, read_catalog};
pub use orders::OrderRepository;

//! Schema module - entity catalog and schema file import

mod types;
mod catalog;
pub mod loader;

pub use types::*;
pub use catalog::EntityCatalog;
pub use loader::load_schema;

//! Tool catalog.
//!
//! Declarative records mapping a plugin key to its credential contract and
//! constructor. Built at startup; never mutated afterwards.

pub mod index;
pub mod types;

pub use index::{CatalogBuilder, ConstructorRegistry, ToolCatalog};
pub use types::{AuthFieldSpec, ToolRecord};

//! Class file introspection.
//!
//! Archives, exploded class directories and bare `.class` files are parsed
//! into [`ClassRecord`]s and collected into a single [`ClassTable`] per build
//! unit, so nested-class lookups can cross artifact boundaries.

mod builder;
mod classfile;
mod index;

pub use builder::{ClassTableBuilder, IntrospectError};
pub use classfile::{ClassParseError, parse_class};
pub use index::{AccessFlags, ClassRecord, ClassTable, FieldRecord, MethodRecord, NestedClassRef};

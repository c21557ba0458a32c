pub mod document;
pub mod store;
mod tables;

pub use document::{JsonEnvelope, PersistenceMetadata, ProjectDocument, FORMAT_VERSION};
pub use store::*;

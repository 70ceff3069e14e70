//! NGSI-LD vocabulary: property shapes, the FIWARE data model served here,
//! query parsing, and the context source registry.

pub mod fiware;
pub mod query;
pub mod registry;
pub mod types;

pub use query::{Query, QueryParams};
pub use registry::{ContextRegistry, ContextSource, Entity, EntityCallback, EntityRequest};

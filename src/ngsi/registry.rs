//! Context sources and the registry that dispatches requests to them.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::de::DeserializeOwned;

use super::query::Query;
use crate::error::{ContextError, ContextResult};

// ---

/// An NGSI-LD entity as emitted to clients.
pub type Entity = serde_json::Value;

/// Receives query results one entity at a time. Returning an error stops
/// the enumeration.
pub type EntityCallback<'a> = dyn FnMut(Entity) -> ContextResult<()> + Send + 'a;

/// Body of a create or update request, decoded on demand.
#[derive(Debug, Clone)]
pub struct EntityRequest {
    body: Bytes,
}

impl EntityRequest {
    // ---
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> ContextResult<T> {
        serde_json::from_slice(&self.body).map_err(ContextError::Decode)
    }
}

/// A provider of entities for some set of types and attributes.
#[async_trait]
pub trait ContextSource: Send + Sync {
    // ---
    fn supports_type(&self, type_name: &str) -> bool;

    fn matches_id(&self, entity_id: &str) -> bool;

    fn supports_attribute(&self, attribute: &str) -> bool;

    async fn create(
        &self,
        type_name: &str,
        entity_id: &str,
        request: &EntityRequest,
    ) -> ContextResult<()>;

    async fn query(&self, query: &Query, callback: &mut EntityCallback<'_>) -> ContextResult<()>;

    async fn retrieve_by_id(&self, entity_id: &str) -> ContextResult<Entity>;

    async fn update(&self, entity_id: &str, request: &EntityRequest) -> ContextResult<()>;
}

/// Ordered collection of registered [`ContextSource`]s.
#[derive(Default, Clone)]
pub struct ContextRegistry {
    sources: Vec<Arc<dyn ContextSource>>,
}

impl ContextRegistry {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Arc<dyn ContextSource>) {
        self.sources.push(source);
    }

    /// First source that accepts entities of `type_name`.
    pub fn source_for_type(&self, type_name: &str) -> Option<Arc<dyn ContextSource>> {
        self.sources
            .iter()
            .find(|s| s.supports_type(type_name))
            .cloned()
    }

    /// First source whose entity ids match `entity_id`.
    pub fn source_for_id(&self, entity_id: &str) -> Option<Arc<dyn ContextSource>> {
        self.sources
            .iter()
            .find(|s| s.matches_id(entity_id))
            .cloned()
    }

    /// Every source that provides one of the query's types or attributes.
    pub fn sources_for_query(&self, query: &Query) -> Vec<Arc<dyn ContextSource>> {
        // ---
        self.sources
            .iter()
            .filter(|s| {
                query.entity_types().iter().any(|t| s.supports_type(t))
                    || query.attributes().iter().any(|a| s.supports_attribute(a))
            })
            .cloned()
            .collect()
    }
}

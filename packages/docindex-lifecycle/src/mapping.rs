//! Mapping provider seam
//!
//! Translating records or schemas into mappings happens elsewhere; the
//! manager only asks for the finished definition, once per `create()`.

use docindex_store::MappingDefinition;

pub trait MappingProvider: Send + Sync {
    fn to_mapping_definition(&self) -> MappingDefinition;
}

/// Provider returning a fixed mapping
#[derive(Debug, Clone, Default)]
pub struct StaticMapping(MappingDefinition);

impl StaticMapping {
    pub fn new(body: serde_json::Value) -> Self {
        Self(MappingDefinition::new(body))
    }
}

impl MappingProvider for StaticMapping {
    fn to_mapping_definition(&self) -> MappingDefinition {
        self.0.clone()
    }
}

impl<F> MappingProvider for F
where
    F: Fn() -> MappingDefinition + Send + Sync,
{
    fn to_mapping_definition(&self) -> MappingDefinition {
        self()
    }
}

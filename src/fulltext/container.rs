//! Search container configuration.

use std::sync::Arc;

use crate::fulltext::RelevanceConfig;
use crate::mapping::FieldMapping;

/// Everything the fulltext assembler needs to know about where it searches.
#[derive(Debug, Clone)]
pub struct ContainerConfiguration {
    /// Container name, e.g. `catalog_view_container`.
    pub name: String,
    pub mapping: Arc<dyn FieldMapping>,
    pub relevance: RelevanceConfig,
}

impl ContainerConfiguration {
    pub fn new<N: Into<String>>(
        name: N,
        mapping: Arc<dyn FieldMapping>,
        relevance: RelevanceConfig,
    ) -> Self {
        ContainerConfiguration {
            name: name.into(),
            mapping,
            relevance,
        }
    }

    pub fn mapping(&self) -> &dyn FieldMapping {
        self.mapping.as_ref()
    }
}

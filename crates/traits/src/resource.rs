//! ResourceProvider trait for resolving images referenced by key or URL.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// Loads resources such as images that templates reference by key.
pub trait ResourceProvider: Debug {
    /// Load a resource by its key or URI.
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    fn exists(&self, path: &str) -> bool;
}

/// A provider backed by a pre-populated map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResourceProvider {
    resources: HashMap<String, SharedResourceData>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.resources.insert(path.into(), Arc::new(data));
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        self.resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_provider() {
        let mut provider = InMemoryResourceProvider::new();
        provider.add("logo.png", vec![1, 2, 3]);
        assert!(provider.exists("logo.png"));
        assert_eq!(provider.load("logo.png").map(|d| d.len()), Ok(3));
        assert_eq!(
            provider.load("missing.png"),
            Err(ResourceError::NotFound("missing.png".to_string()))
        );
    }
}

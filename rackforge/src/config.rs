//! Service configuration.

/// Knobs for the diagram service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Mixed into every cache key; bump when rendering output changes
    /// for the same request.
    pub schema_version: u32,
    /// Path prefix for objects in the remote store.
    pub cache_prefix: String,
    /// Content type of encoded diagrams.
    pub content_type: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            cache_prefix: "cache".to_string(),
            content_type: "image/png".to_string(),
        }
    }
}

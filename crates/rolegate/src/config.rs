//! Authorizer configuration.

use rolegate_perms::ResolverConfig;

/// Configuration for the authorization cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Keep the catalogue between checks. When off, every check loads it.
    pub enabled: bool,
    /// Drop the snapshot when a role, permission, action or object is created.
    pub invalidate_on_create: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            invalidate_on_create: true,
        }
    }
}

impl CacheConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_invalidate_on_create(mut self, invalidate: bool) -> Self {
        self.invalidate_on_create = invalidate;
        self
    }
}

/// Configuration for the Authorizer.
#[derive(Debug, Clone, Default)]
pub struct AuthorizerConfig {
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Hierarchy walk limits.
    pub resolver: ResolverConfig,
}

impl AuthorizerConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the maximum number of ancestors above any role.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.resolver.max_depth = max_depth;
        self
    }
}

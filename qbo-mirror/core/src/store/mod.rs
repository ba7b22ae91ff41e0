//! Object stores the columnar file is written to, resolved from the scheme of a
//! descriptor's `object_path`.
//!
//! - `file://` local file system
//! - `memory://` in-memory storage, a fresh empty store per call
//! - `s3://`, `s3a://` Amazon S3 (with the "s3" feature)

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use object_store::ObjectStore;
use url::Url;

#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "s3")]
pub use s3::S3Provider;

use crate::error::{Error, Result};

/// Builds object stores for the url schemes it supports
pub trait ObjectStoreProvider: Send + Sync {
    fn supports_scheme(&self, scheme: &str) -> bool;

    /// Create a store rooted so that the url path is the object key
    fn create_store(
        &self,
        location: &Url,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>>;
}

/// Ordered set of providers, the first one supporting a scheme wins
pub struct ObjectStoreRegistry {
    providers: Vec<Box<dyn ObjectStoreProvider>>,
}

impl ObjectStoreRegistry {
    #[allow(clippy::vec_init_then_push)]
    pub fn new() -> Self {
        let mut providers: Vec<Box<dyn ObjectStoreProvider>> = Vec::new();

        #[cfg(feature = "s3")]
        providers.push(Box::new(S3Provider));

        providers.push(Box::new(LocalFileProvider));

        Self { providers }
    }

    pub fn create_store(
        &self,
        location: &Url,
        options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>> {
        self.providers
            .iter()
            .find(|provider| provider.supports_scheme(location.scheme()))
            .ok_or_else(|| Error::UnsupportedLocation {
                scheme: location.scheme().to_string(),
            })?
            .create_store(location, options)
    }
}

impl Default for ObjectStoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Local file system and in-memory storage
pub struct LocalFileProvider;

impl ObjectStoreProvider for LocalFileProvider {
    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "file" | "memory")
    }

    fn create_store(
        &self,
        location: &Url,
        _options: &HashMap<String, String>,
    ) -> Result<Arc<dyn ObjectStore>> {
        match location.scheme() {
            "file" => Ok(Arc::new(object_store::local::LocalFileSystem::new())),
            "memory" => Ok(Arc::new(object_store::memory::InMemory::new())),
            scheme => Err(Error::UnsupportedLocation {
                scheme: scheme.to_string(),
            }),
        }
    }
}

static GLOBAL_REGISTRY: OnceLock<ObjectStoreRegistry> = OnceLock::new();

/// Process-wide registry with every provider enabled by feature flags
pub fn global_registry() -> &'static ObjectStoreRegistry {
    GLOBAL_REGISTRY.get_or_init(ObjectStoreRegistry::new)
}

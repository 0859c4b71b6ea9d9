//! Factories handing out [`MetadataReader`]s.

use super::tags::{ClassPathTagResolver, InMemoryTagDefinitions, TagDefinition, TagDefinitionResolver};
use super::{MetadataReader, read_metadata};
use crate::cache::LruCache;
use crate::error::Result;
use crate::io::Resource;
use crate::io::loader::{CLASSPATH_URL_PREFIX, ResourceLoader};
use metascan_api::class_name_to_resource_path;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Default number of readers kept by [`CachingMetadataReaderFactory`].
pub const DEFAULT_CACHE_LIMIT: i64 = 256;

pub trait MetadataReaderFactory: Send + Sync {
    /// Resource holding the descriptor of `class_name`.
    fn resource_for_class(&self, class_name: &str) -> Result<Resource>;

    fn reader_for_resource(&self, resource: &Resource) -> Result<Arc<MetadataReader>>;

    fn reader_for_class(&self, class_name: &str) -> Result<Arc<MetadataReader>> {
        let resource = self.resource_for_class(class_name)?;
        self.reader_for_resource(&resource)
    }

    fn tag_definition(&self, type_name: &str) -> Option<Arc<TagDefinition>>;
}

impl<F: MetadataReaderFactory + ?Sized> MetadataReaderFactory for Arc<F> {
    fn resource_for_class(&self, class_name: &str) -> Result<Resource> {
        (**self).resource_for_class(class_name)
    }

    fn reader_for_resource(&self, resource: &Resource) -> Result<Arc<MetadataReader>> {
        (**self).reader_for_resource(resource)
    }

    fn tag_definition(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        (**self).tag_definition(type_name)
    }
}

/// Reads every request afresh.
pub struct SimpleMetadataReaderFactory {
    loader: Arc<ResourceLoader>,
    tags: Arc<dyn TagDefinitionResolver>,
}

impl SimpleMetadataReaderFactory {
    /// Definitions come from the loader's roots, with the JDK meta-annotations as fallback.
    pub fn new(loader: Arc<ResourceLoader>) -> Self {
        let tags = ClassPathTagResolver::new(Arc::clone(&loader))
            .with_fallback(Arc::new(InMemoryTagDefinitions::jdk_meta_annotations()));
        Self {
            loader,
            tags: Arc::new(tags),
        }
    }

    pub fn with_tag_resolver(mut self, tags: Arc<dyn TagDefinitionResolver>) -> Self {
        self.tags = tags;
        self
    }

    pub fn loader(&self) -> &Arc<ResourceLoader> {
        &self.loader
    }

    pub fn tag_resolver(&self) -> &Arc<dyn TagDefinitionResolver> {
        &self.tags
    }
}

impl MetadataReaderFactory for SimpleMetadataReaderFactory {
    fn resource_for_class(&self, class_name: &str) -> Result<Resource> {
        let location = format!("{CLASSPATH_URL_PREFIX}{}", class_name_to_resource_path(class_name));
        let resource = self.loader.get_resource(&location)?;
        if resource.exists() {
            return Ok(resource);
        }

        // `a.b.Outer.Inner` written in source form: retry as `a.b.Outer$Inner`.
        if let Some(last_dot) = class_name.rfind('.') {
            let nested = format!("{}${}", &class_name[..last_dot], &class_name[last_dot + 1..]);
            let nested_location =
                format!("{CLASSPATH_URL_PREFIX}{}", class_name_to_resource_path(&nested));
            let nested_resource = self.loader.get_resource(&nested_location)?;
            if nested_resource.exists() {
                return Ok(nested_resource);
            }
        }
        Ok(resource)
    }

    fn reader_for_resource(&self, resource: &Resource) -> Result<Arc<MetadataReader>> {
        trace!("Reading metadata from {}", resource);
        let metadata = read_metadata(resource, self.tags.as_ref())?;
        Ok(Arc::new(MetadataReader::new(resource.clone(), metadata)))
    }

    fn tag_definition(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        self.tags.resolve(type_name)
    }
}

struct CacheState {
    limit: i64,
    entries: LruCache<Resource, Arc<MetadataReader>>,
}

/// Keeps up to `cache_limit` readers keyed by resource, evicting the least
/// recently used. A limit of zero or less disables caching.
pub struct CachingMetadataReaderFactory<F = SimpleMetadataReaderFactory> {
    inner: F,
    state: Mutex<CacheState>,
}

impl CachingMetadataReaderFactory<SimpleMetadataReaderFactory> {
    pub fn for_loader(loader: Arc<ResourceLoader>) -> Self {
        Self::new(SimpleMetadataReaderFactory::new(loader))
    }
}

impl<F: MetadataReaderFactory> CachingMetadataReaderFactory<F> {
    pub fn new(inner: F) -> Self {
        Self::with_cache_limit(inner, DEFAULT_CACHE_LIMIT)
    }

    pub fn with_cache_limit(inner: F, limit: i64) -> Self {
        Self {
            inner,
            state: Mutex::new(CacheState {
                limit,
                entries: LruCache::new(capacity_for(limit)),
            }),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn cache_limit(&self) -> i64 {
        self.lock().limit
    }

    /// Changes the limit. Shrinking evicts the least recently used readers.
    pub fn set_cache_limit(&self, limit: i64) {
        let mut state = self.lock();
        state.limit = limit;
        let evicted = state.entries.set_capacity(capacity_for(limit));
        if !evicted.is_empty() {
            debug!("Evicted {} cached readers after limit change to {}", evicted.len(), limit);
        }
    }

    pub fn clear_cache(&self) {
        self.lock().entries.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_cached(&self, resource: &Resource) -> bool {
        self.lock().entries.contains(resource)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn capacity_for(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

impl<F: MetadataReaderFactory> MetadataReaderFactory for CachingMetadataReaderFactory<F> {
    fn resource_for_class(&self, class_name: &str) -> Result<Resource> {
        self.inner.resource_for_class(class_name)
    }

    fn reader_for_resource(&self, resource: &Resource) -> Result<Arc<MetadataReader>> {
        {
            let mut state = self.lock();
            if state.limit <= 0 {
                drop(state);
                return self.inner.reader_for_resource(resource);
            }
            if let Some(reader) = state.entries.get(resource) {
                return Ok(Arc::clone(reader));
            }
        }

        // Parse outside the lock; a concurrent miss on the same key parses twice
        // and the later insert wins.
        let reader = self.inner.reader_for_resource(resource)?;

        let mut state = self.lock();
        if state.limit > 0 {
            if let Some((evicted, _)) = state.entries.insert(resource.clone(), Arc::clone(&reader)) {
                trace!("Evicted cached reader for {}", evicted);
            }
        }
        Ok(reader)
    }

    fn tag_definition(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        self.inner.tag_definition(type_name)
    }
}

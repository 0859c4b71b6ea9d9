//! Resolution of annotation type definitions.
//!
//! A definition carries the element defaults declared by an annotation type
//! and the annotations present on its declaration. Definitions are read one
//! level deep: reading a definition never resolves further definitions, so
//! self-annotated types such as `@Retention` cannot recurse.

use super::classfile::decode;
use super::visitor::MetadataBuilder;
use crate::io::loader::{CLASSPATH_URL_PREFIX, ResourceLoader};
use dashmap::DashMap;
use indexmap::IndexMap;
use metascan_api::{AnnotationAttributes, AttributeValue, TypeMetadata, class_name_to_resource_path};
use std::sync::Arc;
use tracing::debug;

pub const INHERITED_ANNOTATION: &str = "java.lang.annotation.Inherited";
pub const RETENTION_ANNOTATION: &str = "java.lang.annotation.Retention";
pub const TARGET_ANNOTATION: &str = "java.lang.annotation.Target";
pub const DOCUMENTED_ANNOTATION: &str = "java.lang.annotation.Documented";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagDefinition {
    pub type_name: String,
    /// Element name -> declared default value.
    pub defaults: IndexMap<String, AttributeValue>,
    /// Annotations on the declaration, with explicit attributes only.
    pub annotations: Vec<AnnotationAttributes>,
}

impl TagDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, name: &str, value: AttributeValue) -> Self {
        self.defaults.insert(name.to_string(), value);
        self
    }

    pub fn annotated_with(mut self, annotation: AnnotationAttributes) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn annotation_types(&self) -> impl Iterator<Item = &str> {
        self.annotations
            .iter()
            .filter_map(|a| a.annotation_type.as_deref())
    }

    pub fn is_annotated_with(&self, annotation_type: &str) -> bool {
        self.annotation_types().any(|t| t == annotation_type)
    }

    /// Carries `@Inherited`.
    pub fn is_inherited(&self) -> bool {
        self.is_annotated_with(INHERITED_ANNOTATION)
    }

    /// Builds a definition from shallow metadata of an annotation type.
    pub fn from_metadata(metadata: &TypeMetadata) -> Self {
        let annotations = metadata
            .annotations
            .annotation_types()
            .filter_map(|t| metadata.annotations.annotation_attributes(t).cloned())
            .collect();
        Self {
            type_name: metadata.class.class_name.clone(),
            defaults: metadata.annotations.attribute_defaults.clone(),
            annotations,
        }
    }

    /// Fills absent attributes with this definition's defaults.
    pub fn apply_defaults(&self, attributes: &mut AnnotationAttributes) {
        for (name, value) in &self.defaults {
            attributes.put_if_absent(name, value.clone());
        }
    }
}

pub trait TagDefinitionResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<Arc<TagDefinition>>;
}

/// Resolves nothing. Used for shallow reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTagDefinitions;

impl TagDefinitionResolver for NoTagDefinitions {
    fn resolve(&self, _type_name: &str) -> Option<Arc<TagDefinition>> {
        None
    }
}

/// Explicitly registered definitions.
pub struct InMemoryTagDefinitions {
    definitions: DashMap<String, Arc<TagDefinition>>,
}

impl InMemoryTagDefinitions {
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
        }
    }

    /// Definitions of the JDK meta-annotations, which never live on a scanned class path.
    pub fn jdk_meta_annotations() -> Self {
        let registry = Self::new();
        let documented = AnnotationAttributes::new(DOCUMENTED_ANNOTATION);
        let runtime_retention = {
            let mut attrs = AnnotationAttributes::new(RETENTION_ANNOTATION);
            attrs.insert(
                "value",
                AttributeValue::Enum {
                    type_name: "java.lang.annotation.RetentionPolicy".into(),
                    constant: "RUNTIME".into(),
                },
            );
            attrs
        };
        let annotation_target = {
            let mut attrs = AnnotationAttributes::new(TARGET_ANNOTATION);
            attrs.insert(
                "value",
                AttributeValue::Array(vec![AttributeValue::Enum {
                    type_name: "java.lang.annotation.ElementType".into(),
                    constant: "ANNOTATION_TYPE".into(),
                }]),
            );
            attrs
        };

        for name in [
            DOCUMENTED_ANNOTATION,
            INHERITED_ANNOTATION,
            RETENTION_ANNOTATION,
            TARGET_ANNOTATION,
        ] {
            registry.register(
                TagDefinition::new(name)
                    .annotated_with(documented.clone())
                    .annotated_with(runtime_retention.clone())
                    .annotated_with(annotation_target.clone()),
            );
        }
        registry
    }

    pub fn register(&self, definition: TagDefinition) {
        self.definitions
            .insert(definition.type_name.clone(), Arc::new(definition));
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTagDefinitions {
    fn default() -> Self {
        Self::new()
    }
}

impl TagDefinitionResolver for InMemoryTagDefinitions {
    fn resolve(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        self.definitions
            .get(type_name)
            .map(|entry| Arc::clone(entry.value()))
    }
}

/// Reads definitions from the class path, memoizing hits and misses.
pub struct ClassPathTagResolver {
    loader: Arc<ResourceLoader>,
    cache: DashMap<String, Option<Arc<TagDefinition>>>,
    fallback: Option<Arc<dyn TagDefinitionResolver>>,
}

impl ClassPathTagResolver {
    pub fn new(loader: Arc<ResourceLoader>) -> Self {
        Self {
            loader,
            cache: DashMap::new(),
            fallback: None,
        }
    }

    /// Consulted when the class path has no definition.
    pub fn with_fallback(mut self, fallback: Arc<dyn TagDefinitionResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn load(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        let location = format!("{CLASSPATH_URL_PREFIX}{}", class_name_to_resource_path(type_name));
        let resource = match self.loader.get_resource(&location) {
            Ok(resource) if resource.is_readable() => resource,
            Ok(_) => return None,
            Err(e) => {
                debug!("Cannot locate definition of {}: {}", type_name, e);
                return None;
            }
        };

        let bytes = match resource.read_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cannot read definition of {}: {}", type_name, e);
                return None;
            }
        };

        let mut builder = MetadataBuilder::new(&NoTagDefinitions);
        let metadata = decode(&bytes, &mut builder).and_then(|_| builder.finish());
        match metadata {
            Ok(metadata) => Some(Arc::new(TagDefinition::from_metadata(&metadata))),
            Err(e) => {
                debug!("Cannot decode definition of {} at {}: {}", type_name, resource, e);
                None
            }
        }
    }
}

impl TagDefinitionResolver for ClassPathTagResolver {
    fn resolve(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        if let Some(cached) = self.cache.get(type_name) {
            return cached.clone();
        }
        let resolved = self
            .load(type_name)
            .or_else(|| self.fallback.as_ref().and_then(|f| f.resolve(type_name)));
        self.cache.insert(type_name.to_string(), resolved.clone());
        resolved
    }
}

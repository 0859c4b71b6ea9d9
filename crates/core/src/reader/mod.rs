//! Descriptor metadata reading: class-file decoding, metadata building,
//! annotation definition lookup and the reader factories.

pub mod classfile;
pub mod event;
pub mod factory;
pub mod tags;
pub mod visitor;

pub use classfile::{ClassFileDecoder, DecodeError};
pub use event::{DescriptorEvent, EventSink};
pub use factory::{
    CachingMetadataReaderFactory, DEFAULT_CACHE_LIMIT, MetadataReaderFactory,
    SimpleMetadataReaderFactory,
};
pub use tags::{
    ClassPathTagResolver, InMemoryTagDefinitions, NoTagDefinitions, TagDefinition,
    TagDefinitionResolver,
};
pub use visitor::MetadataBuilder;

use crate::error::{Result, ScanError};
use crate::io::Resource;
use metascan_api::{AnnotationMetadata, ClassMetadata, TypeMetadata};

/// Metadata of one resource, shared between the cache and its consumers.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    resource: Resource,
    metadata: TypeMetadata,
}

impl MetadataReader {
    pub fn new(resource: Resource, metadata: TypeMetadata) -> Self {
        Self { resource, metadata }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn class_metadata(&self) -> &ClassMetadata {
        &self.metadata.class
    }

    pub fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.metadata.annotations
    }

    pub fn metadata(&self) -> &TypeMetadata {
        &self.metadata
    }

    pub fn class_name(&self) -> &str {
        &self.metadata.class.class_name
    }
}

/// Decodes class-file bytes into metadata.
pub fn decode_metadata(
    bytes: &[u8],
    resolver: &dyn TagDefinitionResolver,
) -> std::result::Result<TypeMetadata, DecodeError> {
    let mut builder = MetadataBuilder::new(resolver);
    ClassFileDecoder::new(bytes).decode(&mut builder)?;
    builder.finish()
}

/// Reads `resource` once and builds its metadata.
pub fn read_metadata(resource: &Resource, resolver: &dyn TagDefinitionResolver) -> Result<TypeMetadata> {
    let bytes = resource.read_bytes()?;
    decode_metadata(&bytes, resolver).map_err(|source| ScanError::Decode {
        resource: resource.location().to_string(),
        source,
    })
}

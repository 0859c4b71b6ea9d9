use super::TypeFilter;
use super::hierarchy::{HierarchyMatch, OBJECT_CLASS, matches_hierarchy};
use crate::error::Result;
use crate::reader::{MetadataReader, MetadataReaderFactory};

const PLATFORM_PREFIX: &str = "java.";

/// Matches types carrying a given annotation.
///
/// By default the annotation may also be present as a meta-annotation, and
/// superclasses are searched when the annotation type is itself `@Inherited`.
#[derive(Debug, Clone)]
pub struct AnnotationTypeFilter {
    annotation_type: String,
    consider_meta_annotations: bool,
    consider_interfaces: bool,
    consider_inherited: Option<bool>,
}

impl AnnotationTypeFilter {
    pub fn new(annotation_type: impl Into<String>) -> Self {
        Self {
            annotation_type: annotation_type.into(),
            consider_meta_annotations: true,
            consider_interfaces: false,
            consider_inherited: None,
        }
    }

    pub fn consider_meta_annotations(mut self, consider: bool) -> Self {
        self.consider_meta_annotations = consider;
        self
    }

    pub fn consider_interfaces(mut self, consider: bool) -> Self {
        self.consider_interfaces = consider;
        self
    }

    /// Overrides the `@Inherited` lookup on the annotation's definition.
    pub fn consider_inherited(mut self, consider: bool) -> Self {
        self.consider_inherited = Some(consider);
        self
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    fn has_annotation_on(&self, type_name: &str) -> Option<bool> {
        if type_name == OBJECT_CLASS {
            return Some(false);
        }
        // Platform types only carry platform annotations.
        if type_name.starts_with(PLATFORM_PREFIX)
            && !self.annotation_type.starts_with(PLATFORM_PREFIX)
        {
            return Some(false);
        }
        None
    }
}

impl HierarchyMatch for AnnotationTypeFilter {
    fn match_self(&self, reader: &MetadataReader) -> bool {
        let metadata = reader.annotation_metadata();
        metadata.has_annotation(&self.annotation_type)
            || (self.consider_meta_annotations && metadata.has_meta_annotation(&self.annotation_type))
    }

    fn match_super_class(&self, super_class_name: &str) -> Option<bool> {
        self.has_annotation_on(super_class_name)
    }

    fn match_interface(&self, interface_name: &str) -> Option<bool> {
        self.has_annotation_on(interface_name)
    }

    fn consider_inherited(&self, factory: &dyn MetadataReaderFactory) -> bool {
        match self.consider_inherited {
            Some(consider) => consider,
            None => factory
                .tag_definition(&self.annotation_type)
                .is_some_and(|definition| definition.is_inherited()),
        }
    }

    fn consider_interfaces(&self) -> bool {
        self.consider_interfaces
    }
}

impl TypeFilter for AnnotationTypeFilter {
    fn matches(&self, reader: &MetadataReader, factory: &dyn MetadataReaderFactory) -> Result<bool> {
        matches_hierarchy(self, reader, factory)
    }
}

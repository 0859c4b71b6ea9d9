use super::access::{ACC_ABSTRACT, ACC_FINAL, ACC_PRIVATE, ACC_STATIC, has_flag};
use super::annotation::AnnotationAttributes;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// An annotated method of a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodMetadata {
    pub method_name: String,
    /// Raw method descriptor, e.g. `(Ljava/lang/String;)V`.
    pub descriptor: String,
    pub access_flags: u16,
    pub declaring_class_name: String,
    /// Annotation types declared on the method itself, in declaration order.
    #[serde(default)]
    pub annotation_types: IndexSet<String>,
    /// Declared annotations plus the meta annotations merged in from their definitions.
    pub annotations: IndexMap<String, AnnotationAttributes>,
}

impl MethodMetadata {
    pub fn new(
        declaring_class_name: impl Into<String>,
        method_name: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: u16,
    ) -> Self {
        Self {
            method_name: method_name.into(),
            descriptor: descriptor.into(),
            access_flags,
            declaring_class_name: declaring_class_name.into(),
            annotation_types: IndexSet::new(),
            annotations: IndexMap::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        has_flag(self.access_flags, ACC_STATIC)
    }

    pub fn is_final(&self) -> bool {
        has_flag(self.access_flags, ACC_FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        has_flag(self.access_flags, ACC_ABSTRACT)
    }

    pub fn is_overridable(&self) -> bool {
        !self.is_static() && !self.is_final() && !has_flag(self.access_flags, ACC_PRIVATE)
    }

    pub fn is_annotated(&self, annotation_type: &str) -> bool {
        self.annotations.contains_key(annotation_type)
    }

    pub fn annotation_attributes(&self, annotation_type: &str) -> Option<&AnnotationAttributes> {
        self.annotations.get(annotation_type)
    }
}

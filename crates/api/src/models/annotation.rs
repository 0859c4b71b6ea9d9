//! Declarative metadata: annotation attribute values and the per-type
//! annotation index built while reading a descriptor.

use super::method::MethodMetadata;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A single annotation element value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class literal, stored as a binary class name.
    Class(String),
    Enum { type_name: String, constant: String },
    Annotation(AnnotationAttributes),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Class(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Byte(v) => Some(*v as i64),
            AttributeValue::Short(v) => Some(*v as i64),
            AttributeValue::Int(v) => Some(*v as i64),
            AttributeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationAttributes> {
        match self {
            AttributeValue::Annotation(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// Ordered attribute map of one annotation instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationAttributes {
    pub annotation_type: Option<String>,
    pub values: IndexMap<String, AttributeValue>,
}

impl AnnotationAttributes {
    pub fn new(annotation_type: impl Into<String>) -> Self {
        Self {
            annotation_type: Some(annotation_type.into()),
            values: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.values.insert(name.into(), value);
    }

    /// Inserts only when no value is present yet. Returns whether it was inserted.
    pub fn put_if_absent(&mut self, name: &str, value: AttributeValue) -> bool {
        if self.values.contains_key(name) {
            return false;
        }
        self.values.insert(name.to_string(), value);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_bool)
    }
}

/// Annotation index of one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    /// Annotation types directly present on the type, in declaration order.
    pub annotation_types: IndexSet<String>,
    /// Attributes keyed by annotation type, including meta-annotations.
    pub attributes: IndexMap<String, AnnotationAttributes>,
    /// Annotation type -> annotations found on that type's declaration.
    pub meta_annotations: IndexMap<String, IndexSet<String>>,
    /// Annotated methods only.
    pub methods: Vec<MethodMetadata>,
    /// Annotation type -> indexes into `methods`.
    pub annotated_methods: IndexMap<String, Vec<usize>>,
    /// Declared element defaults, present when the type is itself an annotation.
    pub attribute_defaults: IndexMap<String, AttributeValue>,
}

impl AnnotationMetadata {
    pub fn annotation_types(&self) -> impl Iterator<Item = &str> {
        self.annotation_types.iter().map(String::as_str)
    }

    /// Directly present on the type.
    pub fn has_annotation(&self, annotation_type: &str) -> bool {
        self.annotation_types.contains(annotation_type)
    }

    /// Present on one of the directly present annotation types.
    pub fn has_meta_annotation(&self, meta_annotation_type: &str) -> bool {
        self.meta_annotations
            .values()
            .any(|metas| metas.contains(meta_annotation_type))
    }

    pub fn meta_annotation_types(&self, annotation_type: &str) -> Option<&IndexSet<String>> {
        self.meta_annotations.get(annotation_type)
    }

    /// Has attributes recorded for `annotation_type`, either directly present
    /// or merged in from a directly present annotation's declaration.
    pub fn is_annotated(&self, annotation_type: &str) -> bool {
        self.attributes.contains_key(annotation_type)
    }

    pub fn annotation_attributes(&self, annotation_type: &str) -> Option<&AnnotationAttributes> {
        self.attributes.get(annotation_type)
    }

    pub fn has_annotated_methods(&self, annotation_type: &str) -> bool {
        self.annotated_methods
            .get(annotation_type)
            .is_some_and(|indexes| !indexes.is_empty())
    }

    pub fn annotated_methods(&self, annotation_type: &str) -> Vec<&MethodMetadata> {
        self.annotated_methods
            .get(annotation_type)
            .map(|indexes| indexes.iter().filter_map(|&i| self.methods.get(i)).collect())
            .unwrap_or_default()
    }

    /// Adds a method and indexes it under every annotation declared on it.
    /// Meta annotations only reached through a definition are not indexed.
    pub fn add_method(&mut self, method: MethodMetadata) {
        let index = self.methods.len();
        for annotation_type in &method.annotation_types {
            self.annotated_methods
                .entry(annotation_type.clone())
                .or_default()
                .push(index);
        }
        self.methods.push(method);
    }
}

//! Builds [`TypeMetadata`] from the decoder's event stream.

use super::classfile::DecodeError;
use super::event::{DescriptorEvent, EventSink};
use super::tags::TagDefinitionResolver;
use indexmap::IndexSet;
use metascan_api::access::{ACC_ABSTRACT, ACC_ANNOTATION, ACC_FINAL, ACC_INTERFACE, ACC_STATIC};
use metascan_api::{
    AnnotationAttributes, AnnotationMetadata, AttributeValue, ClassMetadata, MethodMetadata,
    TypeMetadata, internal_to_class_name,
};
use tracing::debug;

enum Frame {
    /// A class or method annotation.
    Annotation(AnnotationAttributes),
    Nested {
        name: Option<String>,
        attrs: AnnotationAttributes,
    },
    Array {
        name: Option<String>,
        values: Vec<AttributeValue>,
    },
    DefaultValue(Option<AttributeValue>),
}

pub struct MetadataBuilder<'r> {
    resolver: &'r dyn TagDefinitionResolver,
    class: ClassMetadata,
    annotations: AnnotationMetadata,
    frames: Vec<Frame>,
    method: Option<MethodMetadata>,
    header_seen: bool,
    ended: bool,
}

impl<'r> MetadataBuilder<'r> {
    pub fn new(resolver: &'r dyn TagDefinitionResolver) -> Self {
        Self {
            resolver,
            class: ClassMetadata::default(),
            annotations: AnnotationMetadata::default(),
            frames: Vec::new(),
            method: None,
            header_seen: false,
            ended: false,
        }
    }

    pub fn finish(self) -> Result<TypeMetadata, DecodeError> {
        if !self.ended {
            return Err(unbalanced("stream ended before End"));
        }
        Ok(TypeMetadata {
            class: self.class,
            annotations: self.annotations,
        })
    }

    fn on_header(
        &mut self,
        access: u16,
        name: &str,
        super_name: Option<&str>,
        interfaces: &[String],
    ) -> Result<(), DecodeError> {
        if self.header_seen {
            return Err(unbalanced("duplicate Header"));
        }
        self.header_seen = true;
        self.class = ClassMetadata {
            class_name: internal_to_class_name(name),
            super_class_name: super_name.map(internal_to_class_name),
            interface_names: interfaces.iter().map(|i| internal_to_class_name(i)).collect(),
            is_interface: access & ACC_INTERFACE != 0,
            is_abstract: access & ACC_ABSTRACT != 0,
            is_final: access & ACC_FINAL != 0,
            is_annotation: access & ACC_ANNOTATION != 0,
            ..Default::default()
        };
        Ok(())
    }

    fn on_inner_class(&mut self, name: &str, outer_name: Option<&str>, access: u16) {
        let Some(outer_name) = outer_name else {
            return;
        };
        let name = internal_to_class_name(name);
        let outer_name = internal_to_class_name(outer_name);
        if self.class.class_name == name {
            self.class.enclosing_class_name = Some(outer_name);
            self.class.independent_inner_class = access & ACC_STATIC != 0;
        } else if self.class.class_name == outer_name
            && !self.class.member_class_names.contains(&name)
        {
            self.class.member_class_names.push(name);
        }
    }

    /// Routes a finished value into the innermost open frame.
    fn push_value(&mut self, name: Option<String>, value: AttributeValue) -> Result<(), DecodeError> {
        match self.frames.last_mut() {
            Some(Frame::Annotation(attrs)) | Some(Frame::Nested { attrs, .. }) => {
                let name = name.ok_or_else(|| unbalanced("unnamed value inside annotation"))?;
                attrs.insert(name, value);
                Ok(())
            }
            Some(Frame::Array { values, .. }) => {
                values.push(value);
                Ok(())
            }
            Some(Frame::DefaultValue(slot)) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(unbalanced("value outside of annotation")),
        }
    }

    fn apply_definition_defaults(&self, attrs: &mut AnnotationAttributes) {
        let Some(type_name) = attrs.annotation_type.clone() else {
            return;
        };
        if let Some(definition) = self.resolver.resolve(&type_name) {
            definition.apply_defaults(attrs);
        }
    }

    fn on_annotation_end(&mut self, mut attrs: AnnotationAttributes) {
        let Some(type_name) = attrs.annotation_type.clone() else {
            return;
        };
        let definition = self.resolver.resolve(&type_name);
        if let Some(definition) = &definition {
            definition.apply_defaults(&mut attrs);
        } else {
            debug!(
                "No definition found for annotation {} on {}; keeping explicit attributes",
                type_name, self.class.class_name
            );
        }

        let target = match self.method.as_mut() {
            Some(method) => &mut method.annotations,
            None => &mut self.annotations.attributes,
        };
        target.insert(type_name.clone(), attrs);

        let Some(definition) = definition else {
            return;
        };

        // Annotations on the definition, plus the names one level further up.
        let mut meta_types: IndexSet<String> = IndexSet::new();
        for meta in &definition.annotations {
            let Some(meta_type) = meta.annotation_type.clone() else {
                continue;
            };
            let meta_definition = self.resolver.resolve(&meta_type);
            if !target.contains_key(&meta_type) {
                let mut meta_attrs = meta.clone();
                if let Some(meta_definition) = &meta_definition {
                    meta_definition.apply_defaults(&mut meta_attrs);
                }
                target.insert(meta_type.clone(), meta_attrs);
            }
            meta_types.insert(meta_type);
            if let Some(meta_definition) = meta_definition {
                meta_types.extend(meta_definition.annotation_types().map(str::to_string));
            }
        }

        if self.method.is_none() {
            self.annotations.meta_annotations.insert(type_name, meta_types);
        }
    }
}

impl EventSink for MetadataBuilder<'_> {
    fn accept(&mut self, event: DescriptorEvent) -> Result<(), DecodeError> {
        if self.ended {
            return Err(unbalanced("event after End"));
        }
        if !self.header_seen && !matches!(event, DescriptorEvent::Header { .. }) {
            return Err(unbalanced("event before Header"));
        }

        match event {
            DescriptorEvent::Header {
                access,
                name,
                super_name,
                interfaces,
                ..
            } => self.on_header(access, &name, super_name.as_deref(), &interfaces)?,
            DescriptorEvent::OuterClass { owner } => {
                self.class.enclosing_class_name = Some(internal_to_class_name(&owner));
            }
            DescriptorEvent::InnerClass {
                name,
                outer_name,
                access,
                ..
            } => self.on_inner_class(&name, outer_name.as_deref(), access),
            DescriptorEvent::AnnotationStart { type_name, .. } => {
                if !self.frames.is_empty() {
                    return Err(unbalanced("AnnotationStart inside another element"));
                }
                match self.method.as_mut() {
                    Some(method) => method.annotation_types.insert(type_name.clone()),
                    None => self.annotations.annotation_types.insert(type_name.clone()),
                };
                self.frames
                    .push(Frame::Annotation(AnnotationAttributes::new(type_name)));
            }
            DescriptorEvent::AnnotationEnd => match self.frames.pop() {
                Some(Frame::Annotation(attrs)) if self.frames.is_empty() => {
                    self.on_annotation_end(attrs)
                }
                _ => return Err(unbalanced("AnnotationEnd without AnnotationStart")),
            },
            DescriptorEvent::Value { name, value } => self.push_value(name, value)?,
            DescriptorEvent::NestedStart { name, type_name } => {
                if self.frames.is_empty() {
                    return Err(unbalanced("NestedStart outside of annotation"));
                }
                self.frames.push(Frame::Nested {
                    name,
                    attrs: AnnotationAttributes::new(type_name),
                });
            }
            DescriptorEvent::NestedEnd => match self.frames.pop() {
                Some(Frame::Nested { name, mut attrs }) => {
                    self.apply_definition_defaults(&mut attrs);
                    self.push_value(name, AttributeValue::Annotation(attrs))?;
                }
                _ => return Err(unbalanced("NestedEnd without NestedStart")),
            },
            DescriptorEvent::ArrayStart { name } => {
                if self.frames.is_empty() {
                    return Err(unbalanced("ArrayStart outside of annotation"));
                }
                self.frames.push(Frame::Array {
                    name,
                    values: Vec::new(),
                });
            }
            DescriptorEvent::ArrayEnd => match self.frames.pop() {
                Some(Frame::Array { name, values }) => {
                    self.push_value(name, AttributeValue::Array(values))?
                }
                _ => return Err(unbalanced("ArrayEnd without ArrayStart")),
            },
            DescriptorEvent::MethodStart {
                access,
                name,
                descriptor,
            } => {
                if self.method.is_some() || !self.frames.is_empty() {
                    return Err(unbalanced("MethodStart inside another method"));
                }
                self.method = Some(MethodMetadata::new(
                    self.class.class_name.clone(),
                    name,
                    descriptor,
                    access,
                ));
            }
            DescriptorEvent::DefaultValueStart => {
                if self.method.is_none() || !self.frames.is_empty() {
                    return Err(unbalanced("DefaultValueStart outside of method"));
                }
                self.frames.push(Frame::DefaultValue(None));
            }
            DescriptorEvent::DefaultValueEnd => match self.frames.pop() {
                Some(Frame::DefaultValue(value)) => {
                    if let (Some(value), Some(method)) = (value, &self.method) {
                        self.annotations
                            .attribute_defaults
                            .insert(method.method_name.clone(), value);
                    }
                }
                _ => return Err(unbalanced("DefaultValueEnd without DefaultValueStart")),
            },
            DescriptorEvent::MethodEnd => {
                if !self.frames.is_empty() {
                    return Err(unbalanced("MethodEnd with open elements"));
                }
                let method = self
                    .method
                    .take()
                    .ok_or_else(|| unbalanced("MethodEnd without MethodStart"))?;
                if !method.annotations.is_empty() {
                    self.annotations.add_method(method);
                }
            }
            DescriptorEvent::End => {
                if !self.frames.is_empty() || self.method.is_some() {
                    return Err(unbalanced("End with open elements"));
                }
                self.ended = true;
            }
        }
        Ok(())
    }
}

fn unbalanced(message: &str) -> DecodeError {
    DecodeError::UnbalancedEvent(message.to_string())
}

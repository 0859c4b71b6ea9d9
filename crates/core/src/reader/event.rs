//! Event stream produced by the class-file decoder.
//!
//! Events arrive in a fixed order:
//! `Header`, `OuterClass?`, `InnerClass*`, class annotations, methods, `End`.
//! An annotation is `AnnotationStart`, element events, `AnnotationEnd`.
//! A method is `MethodStart`, its annotations, an optional
//! `DefaultValueStart` / element / `DefaultValueEnd` group, `MethodEnd`.

use super::classfile::DecodeError;
use metascan_api::AttributeValue;

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorEvent {
    /// Names are in internal form (`com/example/Foo`).
    Header {
        major: u16,
        minor: u16,
        access: u16,
        name: String,
        super_name: Option<String>,
        interfaces: Vec<String>,
    },
    OuterClass {
        owner: String,
    },
    InnerClass {
        name: String,
        outer_name: Option<String>,
        inner_name: Option<String>,
        access: u16,
    },
    /// `type_name` is a binary class name (`com.example.Tag`).
    AnnotationStart {
        type_name: String,
        visible: bool,
    },
    Value {
        name: Option<String>,
        value: AttributeValue,
    },
    NestedStart {
        name: Option<String>,
        type_name: String,
    },
    NestedEnd,
    ArrayStart {
        name: Option<String>,
    },
    ArrayEnd,
    AnnotationEnd,
    MethodStart {
        access: u16,
        name: String,
        descriptor: String,
    },
    DefaultValueStart,
    DefaultValueEnd,
    MethodEnd,
    End,
}

/// Consumer of decoder events.
pub trait EventSink {
    fn accept(&mut self, event: DescriptorEvent) -> Result<(), DecodeError>;
}

/// Collects every event, mostly useful in tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<DescriptorEvent>,
}

impl EventSink for RecordingSink {
    fn accept(&mut self, event: DescriptorEvent) -> Result<(), DecodeError> {
        self.events.push(event);
        Ok(())
    }
}

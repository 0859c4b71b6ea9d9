use serde::{Deserialize, Serialize};

/// Structural view of a class descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Binary name with `.` separators, e.g. `com.example.Outer$Inner`.
    pub class_name: String,
    pub super_class_name: Option<String>,
    pub interface_names: Vec<String>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_annotation: bool,
    pub enclosing_class_name: Option<String>,
    /// True when the class is nested but declared `static`.
    pub independent_inner_class: bool,
    pub member_class_names: Vec<String>,
}

impl ClassMetadata {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Neither an interface nor abstract.
    pub fn is_concrete(&self) -> bool {
        !(self.is_interface || self.is_abstract)
    }

    /// Top level, or a static nested class that can be constructed on its own.
    pub fn is_independent(&self) -> bool {
        !self.has_enclosing_class() || self.independent_inner_class
    }

    pub fn has_enclosing_class(&self) -> bool {
        self.enclosing_class_name.is_some()
    }
}

//! Builders for synthetic class files and archives used by the test suites.

pub mod classfile;
pub mod fixtures;

pub use classfile::{AnnotationSpec, ClassFileWriter, ElementSpec, MethodSpec};
pub use fixtures::{class_entry, write_class, write_jar};

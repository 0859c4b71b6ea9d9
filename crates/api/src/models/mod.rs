pub mod access;
pub mod annotation;
pub mod class;
pub mod method;

pub use annotation::*;
pub use class::*;
pub use method::*;

use serde::{Deserialize, Serialize};

/// Structural and declarative metadata of one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub class: ClassMetadata,
    pub annotations: AnnotationMetadata,
}

impl TypeMetadata {
    pub fn class_name(&self) -> &str {
        &self.class.class_name
    }
}

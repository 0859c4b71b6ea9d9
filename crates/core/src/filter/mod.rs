//! Candidate type filters.

pub mod annotation;
pub mod assignable;
mod hierarchy;
pub mod pattern;

pub use annotation::AnnotationTypeFilter;
pub use assignable::AssignableTypeFilter;
pub use pattern::RegexPatternTypeFilter;

use crate::error::Result;
use crate::reader::{MetadataReader, MetadataReaderFactory};

/// Decides whether a type is of interest. The factory gives access to the
/// metadata of related types, such as superclasses.
pub trait TypeFilter: Send + Sync {
    fn matches(&self, reader: &MetadataReader, factory: &dyn MetadataReaderFactory) -> Result<bool>;
}

impl<F> TypeFilter for F
where
    F: Fn(&MetadataReader, &dyn MetadataReaderFactory) -> Result<bool> + Send + Sync,
{
    fn matches(&self, reader: &MetadataReader, factory: &dyn MetadataReaderFactory) -> Result<bool> {
        self(reader, factory)
    }
}

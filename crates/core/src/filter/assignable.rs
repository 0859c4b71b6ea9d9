use super::TypeFilter;
use super::hierarchy::{HierarchyMatch, OBJECT_CLASS, matches_hierarchy};
use crate::error::Result;
use crate::reader::{MetadataReader, MetadataReaderFactory};

/// Matches types assignable to a target type: the type itself, a subclass,
/// or an implementation of the target interface.
#[derive(Debug, Clone)]
pub struct AssignableTypeFilter {
    target_type: String,
}

impl AssignableTypeFilter {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
        }
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    fn match_target_type(&self, type_name: &str) -> Option<bool> {
        if type_name == self.target_type {
            return Some(true);
        }
        if type_name == OBJECT_CLASS {
            return Some(false);
        }
        None
    }
}

impl HierarchyMatch for AssignableTypeFilter {
    fn match_self(&self, _reader: &MetadataReader) -> bool {
        false
    }

    fn match_class_name(&self, class_name: &str) -> bool {
        class_name == self.target_type
    }

    fn match_super_class(&self, super_class_name: &str) -> Option<bool> {
        self.match_target_type(super_class_name)
    }

    fn match_interface(&self, interface_name: &str) -> Option<bool> {
        self.match_target_type(interface_name)
    }

    fn consider_inherited(&self, _factory: &dyn MetadataReaderFactory) -> bool {
        true
    }

    fn consider_interfaces(&self) -> bool {
        true
    }
}

impl TypeFilter for AssignableTypeFilter {
    fn matches(&self, reader: &MetadataReader, factory: &dyn MetadataReaderFactory) -> Result<bool> {
        matches_hierarchy(self, reader, factory)
    }
}

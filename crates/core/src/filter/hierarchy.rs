//! Shared superclass/interface traversal for hierarchy-aware filters.

use crate::error::Result;
use crate::reader::{MetadataReader, MetadataReaderFactory};
use tracing::debug;

pub(crate) const OBJECT_CLASS: &str = "java.lang.Object";

/// Stops runaway traversal over cyclic or absurdly deep hierarchies.
const MAX_HIERARCHY_DEPTH: usize = 64;

pub(crate) trait HierarchyMatch {
    fn match_self(&self, reader: &MetadataReader) -> bool;

    fn match_class_name(&self, _class_name: &str) -> bool {
        false
    }

    /// `Some` short-circuits without reading the supertype.
    fn match_super_class(&self, _super_class_name: &str) -> Option<bool> {
        None
    }

    fn match_interface(&self, _interface_name: &str) -> Option<bool> {
        None
    }

    fn consider_inherited(&self, factory: &dyn MetadataReaderFactory) -> bool;

    fn consider_interfaces(&self) -> bool;
}

pub(crate) fn matches_hierarchy<H: HierarchyMatch + ?Sized>(
    filter: &H,
    reader: &MetadataReader,
    factory: &dyn MetadataReaderFactory,
) -> Result<bool> {
    Ok(walk(filter, reader, factory, 0))
}

fn walk<H: HierarchyMatch + ?Sized>(
    filter: &H,
    reader: &MetadataReader,
    factory: &dyn MetadataReaderFactory,
    depth: usize,
) -> bool {
    if filter.match_self(reader) {
        return true;
    }
    let class = reader.class_metadata();
    if filter.match_class_name(&class.class_name) {
        return true;
    }
    if depth >= MAX_HIERARCHY_DEPTH {
        debug!("Hierarchy of {} deeper than {}; stopping", class.class_name, MAX_HIERARCHY_DEPTH);
        return false;
    }

    if filter.consider_inherited(factory) {
        if let Some(super_name) = &class.super_class_name {
            let matched = match filter.match_super_class(super_name) {
                Some(matched) => matched,
                None => walk_related(filter, super_name, &class.class_name, factory, depth),
            };
            if matched {
                return true;
            }
        }
    }

    if filter.consider_interfaces() {
        for interface_name in &class.interface_names {
            let matched = match filter.match_interface(interface_name) {
                Some(matched) => matched,
                None => walk_related(filter, interface_name, &class.class_name, factory, depth),
            };
            if matched {
                return true;
            }
        }
    }

    false
}

fn walk_related<H: HierarchyMatch + ?Sized>(
    filter: &H,
    related: &str,
    from: &str,
    factory: &dyn MetadataReaderFactory,
    depth: usize,
) -> bool {
    match factory.reader_for_class(related) {
        Ok(reader) => walk(filter, &reader, factory, depth + 1),
        Err(e) => {
            debug!("Could not read supertype [{}] of type [{}]: {}", related, from, e);
            false
        }
    }
}

#![allow(dead_code)]

use metascan_core::reader::{CachingMetadataReaderFactory, SimpleMetadataReaderFactory};
use metascan_core::{ClassPathScanner, ResourceLoader};
use metascan_testkit::classfile::{ACC_ABSTRACT, ACC_PUBLIC};
use metascan_testkit::{AnnotationSpec, ClassFileWriter, ElementSpec, MethodSpec, write_class};
use std::path::Path;
use std::sync::Arc;

pub const COMPONENT: &str = "demo.stereotype.Component";
pub const SERVICE: &str = "demo.stereotype.Service";
pub const REPOSITORY: &str = "demo.stereotype.Repository";
pub const INHERITABLE: &str = "demo.stereotype.Inheritable";
pub const RETENTION: &str = "java.lang.annotation.Retention";
pub const INHERITED: &str = "java.lang.annotation.Inherited";

pub fn runtime_retention() -> AnnotationSpec {
    AnnotationSpec::new(RETENTION).with(
        "value",
        ElementSpec::enum_value("java.lang.annotation.RetentionPolicy", "RUNTIME"),
    )
}

fn string_element(name: &str, default: &str) -> MethodSpec {
    MethodSpec::new(name, "()Ljava/lang/String;")
        .access(ACC_PUBLIC | ACC_ABSTRACT)
        .default_value(ElementSpec::str(default))
}

/// Writes the stereotype annotation types:
/// `@Component(value = "")`, `@Service(value = "", lazy = false)` meta-annotated
/// with `@Component`, `@Repository` meta-annotated with `@Component("repo")`,
/// and an `@Inherited` marker.
pub fn write_stereotypes(root: &Path) {
    write_class(
        root,
        &ClassFileWriter::annotation_type(COMPONENT)
            .annotated(runtime_retention())
            .method(string_element("value", "")),
    );
    write_class(
        root,
        &ClassFileWriter::annotation_type(SERVICE)
            .annotated(runtime_retention())
            .annotated(AnnotationSpec::new(COMPONENT))
            .method(string_element("value", ""))
            .method(
                MethodSpec::new("lazy", "()Z")
                    .access(ACC_PUBLIC | ACC_ABSTRACT)
                    .default_value(ElementSpec::Boolean(false)),
            ),
    );
    write_class(
        root,
        &ClassFileWriter::annotation_type(REPOSITORY)
            .annotated(AnnotationSpec::new(COMPONENT).with("value", ElementSpec::str("repo"))),
    );
    write_class(
        root,
        &ClassFileWriter::annotation_type(INHERITABLE)
            .annotated(runtime_retention())
            .annotated(AnnotationSpec::new(INHERITED)),
    );
}

pub fn loader(roots: &[&Path]) -> Arc<ResourceLoader> {
    Arc::new(ResourceLoader::from_paths(roots.iter().copied()))
}

pub fn simple_factory(roots: &[&Path]) -> SimpleMetadataReaderFactory {
    SimpleMetadataReaderFactory::new(loader(roots))
}

pub fn caching_factory(roots: &[&Path]) -> CachingMetadataReaderFactory {
    CachingMetadataReaderFactory::for_loader(loader(roots))
}

pub fn scanner(roots: &[&Path]) -> ClassPathScanner {
    ClassPathScanner::new(loader(roots))
}

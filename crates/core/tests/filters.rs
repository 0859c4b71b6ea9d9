mod common;

use common::{COMPONENT, INHERITABLE, SERVICE, write_stereotypes};
use metascan_core::reader::{MetadataReaderFactory, SimpleMetadataReaderFactory};
use metascan_core::{
    AnnotationTypeFilter, AssignableTypeFilter, MetadataReader, RegexPatternTypeFilter, ScanError,
    TypeFilter,
};
use metascan_testkit::{AnnotationSpec, ClassFileWriter, write_class};
use std::path::Path;

fn setup(root: &Path) -> SimpleMetadataReaderFactory {
    write_stereotypes(root);
    write_class(root, &ClassFileWriter::class("app.Direct").annotated(AnnotationSpec::new(COMPONENT)));
    write_class(root, &ClassFileWriter::class("app.ViaMeta").annotated(AnnotationSpec::new(SERVICE)));
    write_class(
        root,
        &ClassFileWriter::class("app.InheritingBase").annotated(AnnotationSpec::new(INHERITABLE)),
    );
    write_class(root, &ClassFileWriter::class("app.Child").extends("app.InheritingBase"));
    write_class(root, &ClassFileWriter::class("app.GrandChild").extends("app.Child"));
    write_class(root, &ClassFileWriter::class("app.PlainBase").annotated(AnnotationSpec::new(COMPONENT)));
    write_class(root, &ClassFileWriter::class("app.PlainChild").extends("app.PlainBase"));
    write_class(root, &ClassFileWriter::interface("app.Api").annotated(AnnotationSpec::new(COMPONENT)));
    write_class(root, &ClassFileWriter::class("app.ApiImpl").implements("app.Api"));
    write_class(root, &ClassFileWriter::class("app.Orphan").extends("app.Missing"));
    common::simple_factory(&[root])
}

fn matches(filter: &dyn TypeFilter, factory: &SimpleMetadataReaderFactory, class_name: &str) -> bool {
    let reader = factory.reader_for_class(class_name).unwrap();
    filter.matches(&reader, factory).unwrap()
}

#[test]
fn test_direct_and_meta_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let filter = AnnotationTypeFilter::new(COMPONENT);
    assert!(matches(&filter, &factory, "app.Direct"));
    assert!(matches(&filter, &factory, "app.ViaMeta"));

    let direct_only = AnnotationTypeFilter::new(COMPONENT).consider_meta_annotations(false);
    assert!(matches(&direct_only, &factory, "app.Direct"));
    assert!(!matches(&direct_only, &factory, "app.ViaMeta"));
}

#[test]
fn test_inherited_annotation_walks_superclasses() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let filter = AnnotationTypeFilter::new(INHERITABLE);
    assert!(matches(&filter, &factory, "app.Child"));
    assert!(matches(&filter, &factory, "app.GrandChild"));
    assert!(!matches(&filter, &factory, "app.Direct"));
}

#[test]
fn test_non_inherited_annotation_stays_on_declaring_class() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let filter = AnnotationTypeFilter::new(COMPONENT);
    assert!(matches(&filter, &factory, "app.PlainBase"));
    assert!(!matches(&filter, &factory, "app.PlainChild"));

    let forced = AnnotationTypeFilter::new(COMPONENT).consider_inherited(true);
    assert!(matches(&forced, &factory, "app.PlainChild"));
}

#[test]
fn test_interfaces_only_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    assert!(!matches(&AnnotationTypeFilter::new(COMPONENT), &factory, "app.ApiImpl"));
    let filter = AnnotationTypeFilter::new(COMPONENT).consider_interfaces(true);
    assert!(matches(&filter, &factory, "app.ApiImpl"));
}

#[test]
fn test_unreadable_superclass_is_a_soft_miss() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let filter = AnnotationTypeFilter::new(COMPONENT).consider_inherited(true);
    assert!(!matches(&filter, &factory, "app.Orphan"));
}

#[test]
fn test_platform_types_are_not_read() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.Task").implements("java.lang.Runnable"),
    );
    let factory = common::simple_factory(&[dir.path()]);

    let filter = AnnotationTypeFilter::new(COMPONENT)
        .consider_inherited(true)
        .consider_interfaces(true);
    assert!(!matches(&filter, &factory, "app.Task"));
}

#[test]
fn test_java_prefixed_user_package_is_read() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    write_class(
        dir.path(),
        &ClassFileWriter::class("javaapp.Base").annotated(AnnotationSpec::new(INHERITABLE)),
    );
    write_class(dir.path(), &ClassFileWriter::class("app.Child").extends("javaapp.Base"));
    let factory = common::simple_factory(&[dir.path()]);

    assert!(matches(&AnnotationTypeFilter::new(INHERITABLE), &factory, "app.Child"));
}

#[test]
fn test_assignable_type() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let to_api = AssignableTypeFilter::new("app.Api");
    assert!(matches(&to_api, &factory, "app.ApiImpl"));
    assert!(matches(&to_api, &factory, "app.Api"));
    assert!(!matches(&to_api, &factory, "app.Direct"));

    let to_base = AssignableTypeFilter::new("app.InheritingBase");
    assert!(matches(&to_base, &factory, "app.GrandChild"));
    assert!(!matches(&to_base, &factory, "app.Orphan"));

    let to_object = AssignableTypeFilter::new("java.lang.Object");
    assert!(matches(&to_object, &factory, "app.Direct"));
}

#[test]
fn test_regex_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let filter = RegexPatternTypeFilter::new(r"app\..*Child").unwrap();
    assert!(matches(&filter, &factory, "app.PlainChild"));
    assert!(matches(&filter, &factory, "app.GrandChild"));
    assert!(!matches(&filter, &factory, "app.Direct"));
}

#[test]
fn test_closure_filter() {
    let dir = tempfile::tempdir().unwrap();
    let factory = setup(dir.path());

    let has_super = |reader: &MetadataReader, _: &dyn MetadataReaderFactory| {
        Ok::<_, ScanError>(
            reader.class_metadata().super_class_name.as_deref() != Some("java.lang.Object"),
        )
    };
    assert!(matches(&has_super, &factory, "app.Child"));
    assert!(!matches(&has_super, &factory, "app.Direct"));
}

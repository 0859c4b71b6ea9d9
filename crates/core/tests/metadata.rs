mod common;

use common::{COMPONENT, INHERITABLE, REPOSITORY, RETENTION, SERVICE, write_stereotypes};
use metascan_core::api::AttributeValue;
use metascan_core::reader::{
    DecodeError, InMemoryTagDefinitions, MetadataReaderFactory, NoTagDefinitions, TagDefinition,
    decode_metadata,
};
use metascan_core::{Resource, ScanError};
use metascan_testkit::classfile::{ACC_ABSTRACT, ACC_PUBLIC, ACC_STATIC};
use metascan_testkit::{AnnotationSpec, ClassFileWriter, ElementSpec, MethodSpec, write_class};

#[test]
fn test_structure_of_plain_class() {
    let bytes = ClassFileWriter::class("com.example.OrderService")
        .extends("com.example.BaseService")
        .implements("com.example.Api")
        .implements("java.io.Serializable")
        .field("orders", "Ljava/util/List;")
        .method(MethodSpec::new("place", "()V"))
        .to_bytes();

    let metadata = decode_metadata(&bytes, &NoTagDefinitions).unwrap();
    let class = &metadata.class;
    assert_eq!(class.class_name, "com.example.OrderService");
    assert_eq!(class.super_class_name.as_deref(), Some("com.example.BaseService"));
    assert_eq!(class.interface_names, vec!["com.example.Api", "java.io.Serializable"]);
    assert!(class.is_concrete());
    assert!(class.is_independent());
    assert!(!class.is_annotation);
    // Unannotated methods are not kept.
    assert!(metadata.annotations.methods.is_empty());
    assert!(metadata.annotations.annotation_types.is_empty());
}

#[test]
fn test_root_class_has_no_super() {
    let bytes = ClassFileWriter::class("java.lang.Object").no_super().to_bytes();
    let metadata = decode_metadata(&bytes, &NoTagDefinitions).unwrap();
    assert_eq!(metadata.class.super_class_name, None);
}

#[test]
fn test_interface_and_abstract_flags() {
    let interface = decode_metadata(
        &ClassFileWriter::interface("a.Api").to_bytes(),
        &NoTagDefinitions,
    )
    .unwrap();
    assert!(interface.class.is_interface);
    assert!(!interface.class.is_concrete());

    let abstract_class = decode_metadata(
        &ClassFileWriter::class("a.Base")
            .access(ACC_PUBLIC | ACC_ABSTRACT)
            .to_bytes(),
        &NoTagDefinitions,
    )
    .unwrap();
    assert!(abstract_class.class.is_abstract);
    assert!(!abstract_class.class.is_interface);
    assert!(!abstract_class.class.is_concrete());
}

#[test]
fn test_element_values() {
    let mapping = AnnotationSpec::new("web.Mapping")
        .with(
            "path",
            ElementSpec::Array(vec![ElementSpec::str("/orders"), ElementSpec::str("/o")]),
        )
        .with("method", ElementSpec::enum_value("web.Method", "GET"))
        .with("produces", ElementSpec::Class("java.lang.String".into()))
        .with(
            "header",
            ElementSpec::Annotation(AnnotationSpec::new("web.Header").with("name", ElementSpec::str("X-Id"))),
        )
        .with("order", ElementSpec::Int(3))
        .with("enabled", ElementSpec::Boolean(true))
        .with("separator", ElementSpec::Char('/'))
        .with("timeout", ElementSpec::Long(30_000))
        .with("ratio", ElementSpec::Double(0.5))
        .with("weight", ElementSpec::Float(1.5))
        .with("small", ElementSpec::Byte(-1))
        .with("medium", ElementSpec::Short(512))
        .with("params", ElementSpec::Array(Vec::new()));
    let bytes = ClassFileWriter::class("web.OrderController")
        .annotated(mapping)
        .to_bytes();

    let metadata = decode_metadata(&bytes, &NoTagDefinitions).unwrap();
    let attrs = metadata
        .annotations
        .annotation_attributes("web.Mapping")
        .unwrap();

    assert_eq!(
        attrs.get("path"),
        Some(&AttributeValue::Array(vec![
            AttributeValue::String("/orders".into()),
            AttributeValue::String("/o".into()),
        ]))
    );
    assert_eq!(
        attrs.get("method"),
        Some(&AttributeValue::Enum {
            type_name: "web.Method".into(),
            constant: "GET".into(),
        })
    );
    assert_eq!(attrs.get("produces"), Some(&AttributeValue::Class("java.lang.String".into())));
    let header = attrs.get("header").and_then(AttributeValue::as_annotation).unwrap();
    assert_eq!(header.annotation_type.as_deref(), Some("web.Header"));
    assert_eq!(header.get_str("name"), Some("X-Id"));
    assert_eq!(attrs.get("order"), Some(&AttributeValue::Int(3)));
    assert_eq!(attrs.get_bool("enabled"), Some(true));
    assert_eq!(attrs.get("separator"), Some(&AttributeValue::Char('/')));
    assert_eq!(attrs.get("timeout").and_then(AttributeValue::as_i64), Some(30_000));
    assert_eq!(attrs.get("ratio"), Some(&AttributeValue::Double(0.5)));
    assert_eq!(attrs.get("weight"), Some(&AttributeValue::Float(1.5)));
    assert_eq!(attrs.get("small"), Some(&AttributeValue::Byte(-1)));
    assert_eq!(attrs.get("medium"), Some(&AttributeValue::Short(512)));
    // Empty arrays are kept as explicit values.
    assert_eq!(attrs.get("params"), Some(&AttributeValue::Array(Vec::new())));
    // Declaration order is preserved.
    let names: Vec<&str> = attrs.values.keys().map(String::as_str).collect();
    assert_eq!(names[..3], ["path", "method", "produces"]);
}

#[test]
fn test_visible_and_invisible_annotations_are_recorded() {
    let bytes = ClassFileWriter::class("a.Foo")
        .annotated(AnnotationSpec::new("a.Visible"))
        .annotated_invisible(AnnotationSpec::new("a.Hidden"))
        .to_bytes();
    let metadata = decode_metadata(&bytes, &NoTagDefinitions).unwrap();
    let types: Vec<&str> = metadata.annotations.annotation_types().collect();
    assert_eq!(types, vec!["a.Visible", "a.Hidden"]);
}

#[test]
fn test_defaults_fill_only_absent_attributes() {
    let tags = InMemoryTagDefinitions::new();
    tags.register(
        TagDefinition::new("a.Cache")
            .with_default("name", AttributeValue::String("default".into()))
            .with_default("ttl", AttributeValue::Int(60)),
    );
    let bytes = ClassFileWriter::class("a.Foo")
        .annotated(AnnotationSpec::new("a.Cache").with("name", ElementSpec::str("orders")))
        .to_bytes();

    let metadata = decode_metadata(&bytes, &tags).unwrap();
    let attrs = metadata.annotations.annotation_attributes("a.Cache").unwrap();
    assert_eq!(attrs.get_str("name"), Some("orders"));
    assert_eq!(attrs.get("ttl"), Some(&AttributeValue::Int(60)));
}

#[test]
fn test_nested_annotation_gets_its_defaults() {
    let tags = InMemoryTagDefinitions::new();
    tags.register(TagDefinition::new("a.Inner").with_default("level", AttributeValue::Int(1)));
    let bytes = ClassFileWriter::class("a.Foo")
        .annotated(AnnotationSpec::new("a.Outer").with(
            "inner",
            ElementSpec::Annotation(AnnotationSpec::new("a.Inner")),
        ))
        .to_bytes();

    let metadata = decode_metadata(&bytes, &tags).unwrap();
    let inner = metadata
        .annotations
        .annotation_attributes("a.Outer")
        .and_then(|a| a.get("inner"))
        .and_then(AttributeValue::as_annotation)
        .unwrap();
    assert_eq!(inner.get("level"), Some(&AttributeValue::Int(1)));
}

#[test]
fn test_meta_annotations_from_class_path() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.OrderService")
            .annotated(AnnotationSpec::new(SERVICE).with("value", ElementSpec::str("orders"))),
    );

    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("app.OrderService").unwrap();
    let annotations = reader.annotation_metadata();

    assert!(annotations.has_annotation(SERVICE));
    assert!(!annotations.has_annotation(COMPONENT));
    assert!(annotations.has_meta_annotation(COMPONENT));
    assert!(annotations.is_annotated(COMPONENT));

    // One level of meta-meta names is recorded.
    let metas: Vec<&str> = annotations
        .meta_annotation_types(SERVICE)
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(metas[0], RETENTION);
    assert!(metas.contains(&COMPONENT));
    // From the built-in definition of `@Retention`.
    assert!(metas.contains(&"java.lang.annotation.Documented"));
    assert!(!metas.contains(&SERVICE));

    let service = annotations.annotation_attributes(SERVICE).unwrap();
    assert_eq!(service.get_str("value"), Some("orders"));
    assert_eq!(service.get_bool("lazy"), Some(false));

    // The meta-annotation carries its own defaults.
    let component = annotations.annotation_attributes(COMPONENT).unwrap();
    assert_eq!(component.get_str("value"), Some(""));
}

#[test]
fn test_meta_annotation_explicit_values_survive() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.OrderRepository").annotated(AnnotationSpec::new(REPOSITORY)),
    );

    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("app.OrderRepository").unwrap();
    let component = reader
        .annotation_metadata()
        .annotation_attributes(COMPONENT)
        .unwrap();
    assert_eq!(component.get_str("value"), Some("repo"));
}

#[test]
fn test_direct_annotation_wins_over_meta_attributes() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.Both")
            .annotated(AnnotationSpec::new(COMPONENT).with("value", ElementSpec::str("direct")))
            .annotated(AnnotationSpec::new(REPOSITORY)),
    );

    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("app.Both").unwrap();
    let component = reader
        .annotation_metadata()
        .annotation_attributes(COMPONENT)
        .unwrap();
    assert_eq!(component.get_str("value"), Some("direct"));
}

#[test]
fn test_unknown_annotation_keeps_explicit_attributes() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.Foo")
            .annotated(AnnotationSpec::new("missing.Tag").with("value", ElementSpec::Int(7))),
    );

    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("app.Foo").unwrap();
    let annotations = reader.annotation_metadata();
    assert!(annotations.has_annotation("missing.Tag"));
    assert!(annotations.meta_annotation_types("missing.Tag").is_none());
    assert_eq!(
        annotations.annotation_attributes("missing.Tag").unwrap().get("value"),
        Some(&AttributeValue::Int(7))
    );
}

#[test]
fn test_inherited_definition_from_class_path() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    let factory = common::simple_factory(&[dir.path()]);

    assert!(factory.tag_definition(INHERITABLE).unwrap().is_inherited());
    assert!(!factory.tag_definition(SERVICE).unwrap().is_inherited());
    assert!(factory.tag_definition("missing.Tag").is_none());
    // JDK meta-annotations come from the built-in fallback.
    assert!(factory.tag_definition(RETENTION).is_some());
}

#[test]
fn test_annotation_type_defaults() {
    let bytes = ClassFileWriter::annotation_type("a.Tag")
        .method(
            MethodSpec::new("value", "()Ljava/lang/String;")
                .access(ACC_PUBLIC | ACC_ABSTRACT)
                .default_value(ElementSpec::str("x")),
        )
        .method(
            MethodSpec::new("names", "()[Ljava/lang/String;")
                .access(ACC_PUBLIC | ACC_ABSTRACT)
                .default_value(ElementSpec::Array(Vec::new())),
        )
        .method(MethodSpec::new("required", "()I").access(ACC_PUBLIC | ACC_ABSTRACT))
        .to_bytes();

    let metadata = decode_metadata(&bytes, &NoTagDefinitions).unwrap();
    assert!(metadata.class.is_annotation);
    let defaults = &metadata.annotations.attribute_defaults;
    assert_eq!(defaults.get("value"), Some(&AttributeValue::String("x".into())));
    assert_eq!(defaults.get("names"), Some(&AttributeValue::Array(Vec::new())));
    assert!(!defaults.contains_key("required"));
}

#[test]
fn test_annotated_methods() {
    let tags = InMemoryTagDefinitions::new();
    tags.register(
        TagDefinition::new("a.Bean")
            .with_default("lazy", AttributeValue::Boolean(false))
            .annotated_with(metascan_core::api::AnnotationAttributes::new("a.Marker")),
    );
    let bytes = ClassFileWriter::class("a.Config")
        .method(MethodSpec::new("<init>", "()V"))
        .method(
            MethodSpec::new("dataSource", "()La/DataSource;")
                .annotated(AnnotationSpec::new("a.Bean")),
        )
        .method(
            MethodSpec::new("cache", "()La/Cache;")
                .access(ACC_PUBLIC | ACC_STATIC)
                .annotated(AnnotationSpec::new("a.Bean").with("lazy", ElementSpec::Boolean(true))),
        )
        .to_bytes();

    let metadata = decode_metadata(&bytes, &tags).unwrap();
    let annotations = &metadata.annotations;
    assert_eq!(annotations.methods.len(), 2);
    assert!(annotations.has_annotated_methods("a.Bean"));
    // Method annotations are not class annotations.
    assert!(!annotations.has_annotation("a.Bean"));
    assert!(annotations.meta_annotations.is_empty());

    let methods = annotations.annotated_methods("a.Bean");
    assert_eq!(methods[0].method_name, "dataSource");
    assert_eq!(methods[0].declaring_class_name, "a.Config");
    assert_eq!(
        methods[0].annotation_attributes("a.Bean").unwrap().get_bool("lazy"),
        Some(false)
    );
    assert!(methods[0].is_annotated("a.Marker"));
    assert!(methods[1].is_static());
    assert_eq!(
        methods[1].annotation_attributes("a.Bean").unwrap().get_bool("lazy"),
        Some(true)
    );
    // Meta annotations are visible on the method but do not index it.
    assert!(!annotations.has_annotated_methods("a.Marker"));
    assert_eq!(
        methods[0].annotation_types.iter().collect::<Vec<_>>(),
        vec!["a.Bean"]
    );
}

#[test]
fn test_methods_indexed_only_by_declared_annotations() {
    let dir = tempfile::tempdir().unwrap();
    write_stereotypes(dir.path());
    write_class(
        dir.path(),
        &ClassFileWriter::class("app.Wiring").method(
            MethodSpec::new("svc", "()Lapp/Svc;").annotated(AnnotationSpec::new(SERVICE)),
        ),
    );

    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("app.Wiring").unwrap();
    let annotations = reader.annotation_metadata();

    assert!(annotations.has_annotated_methods(SERVICE));
    assert!(!annotations.has_annotated_methods(COMPONENT));
    assert!(!annotations.has_annotated_methods(RETENTION));

    let svc = &annotations.annotated_methods(SERVICE)[0];
    assert!(svc.is_annotated(COMPONENT));
    assert_eq!(svc.annotation_types.len(), 1);
}

#[test]
fn test_inner_class_relationships() {
    let outer = ClassFileWriter::class("a.Outer")
        .inner_class("a.Outer$Nested", Some("a.Outer"), ACC_PUBLIC | ACC_STATIC)
        .inner_class("a.Outer$Inner", Some("a.Outer"), ACC_PUBLIC);
    let metadata = decode_metadata(&outer.to_bytes(), &NoTagDefinitions).unwrap();
    assert!(metadata.class.is_independent());
    assert_eq!(
        metadata.class.member_class_names,
        vec!["a.Outer$Nested", "a.Outer$Inner"]
    );

    let nested = ClassFileWriter::class("a.Outer$Nested")
        .inner_class("a.Outer$Nested", Some("a.Outer"), ACC_PUBLIC | ACC_STATIC);
    let metadata = decode_metadata(&nested.to_bytes(), &NoTagDefinitions).unwrap();
    assert_eq!(metadata.class.enclosing_class_name.as_deref(), Some("a.Outer"));
    assert!(metadata.class.is_independent());

    let inner = ClassFileWriter::class("a.Outer$Inner")
        .inner_class("a.Outer$Inner", Some("a.Outer"), ACC_PUBLIC);
    let metadata = decode_metadata(&inner.to_bytes(), &NoTagDefinitions).unwrap();
    assert!(metadata.class.has_enclosing_class());
    assert!(!metadata.class.is_independent());

    let local = ClassFileWriter::class("a.Outer$1Local").enclosing_method("a.Outer");
    let metadata = decode_metadata(&local.to_bytes(), &NoTagDefinitions).unwrap();
    assert_eq!(metadata.class.enclosing_class_name.as_deref(), Some("a.Outer"));
    assert!(!metadata.class.is_independent());
}

#[test]
fn test_supported_versions() {
    for major in [45, 52, 61, 69] {
        let bytes = ClassFileWriter::class("a.Foo").version(major).to_bytes();
        assert!(decode_metadata(&bytes, &NoTagDefinitions).is_ok(), "major {major}");
    }
    let bytes = ClassFileWriter::class("a.Foo").version(70).to_bytes();
    assert!(matches!(
        decode_metadata(&bytes, &NoTagDefinitions),
        Err(DecodeError::UnsupportedVersion { major: 70, .. })
    ));
}

#[test]
fn test_truncated_and_garbage_input() {
    let bytes = ClassFileWriter::class("a.Foo")
        .annotated(AnnotationSpec::new("a.Tag"))
        .to_bytes();
    for len in [0, 4, 10, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            decode_metadata(&bytes[..len], &NoTagDefinitions).is_err(),
            "truncated to {len}"
        );
    }
    assert_eq!(
        decode_metadata(b"\x00\x01\x02\x03 not a class", &NoTagDefinitions),
        Err(DecodeError::InvalidMagic)
    );
}

#[test]
fn test_read_errors_carry_the_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Broken.class");
    std::fs::write(&path, b"garbage").unwrap();
    let resource = Resource::file(&path);

    let factory = common::simple_factory(&[dir.path()]);
    let err = factory.reader_for_resource(&resource).unwrap_err();
    assert!(err.is_decode());
    match err {
        ScanError::Decode { resource: location, .. } => assert_eq!(location, resource.location()),
        other => panic!("unexpected error: {other}"),
    }

    let missing = Resource::file(dir.path().join("Missing.class"));
    assert!(matches!(
        factory.reader_for_resource(&missing),
        Err(ScanError::Io { .. })
    ));
}

#[test]
fn test_nested_class_lookup_by_source_name() {
    let dir = tempfile::tempdir().unwrap();
    write_class(dir.path(), &ClassFileWriter::class("a.Outer$Nested"));
    let factory = common::simple_factory(&[dir.path()]);
    let reader = factory.reader_for_class("a.Outer.Nested").unwrap();
    assert_eq!(reader.class_name(), "a.Outer$Nested");
}

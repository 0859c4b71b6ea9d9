mod common;

use metascan_core::Resource;
use metascan_core::error::Result;
use metascan_core::reader::{
    CachingMetadataReaderFactory, MetadataReader, MetadataReaderFactory, SimpleMetadataReaderFactory,
    TagDefinition,
};
use metascan_testkit::{ClassFileWriter, write_class};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts reads reaching the wrapped factory.
struct CountingFactory {
    inner: SimpleMetadataReaderFactory,
    reads: AtomicUsize,
}

impl CountingFactory {
    fn new(root: &Path) -> Self {
        Self {
            inner: common::simple_factory(&[root]),
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl MetadataReaderFactory for CountingFactory {
    fn resource_for_class(&self, class_name: &str) -> Result<Resource> {
        self.inner.resource_for_class(class_name)
    }

    fn reader_for_resource(&self, resource: &Resource) -> Result<Arc<MetadataReader>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.reader_for_resource(resource)
    }

    fn tag_definition(&self, type_name: &str) -> Option<Arc<TagDefinition>> {
        self.inner.tag_definition(type_name)
    }
}

fn write_classes(root: &Path, names: &[&str]) -> Vec<Resource> {
    names
        .iter()
        .map(|name| {
            let path: PathBuf = write_class(root, &ClassFileWriter::class(name));
            Resource::file(path)
        })
        .collect()
}

#[test]
fn test_cached_reads_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let resources = write_classes(dir.path(), &["a.Foo"]);
    let factory = CachingMetadataReaderFactory::new(CountingFactory::new(dir.path()));

    let first = factory.reader_for_resource(&resources[0]).unwrap();
    let second = factory.reader_for_resource(&resources[0]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.inner().reads(), 1);
    assert_eq!(factory.cached_len(), 1);

    // Same identity through a differently spelled path.
    let respelled = Resource::file(dir.path().join("a/../a/Foo.class"));
    let third = factory.reader_for_resource(&respelled).unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(factory.inner().reads(), 1);
}

#[test]
fn test_reader_for_class_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_classes(dir.path(), &["a.Foo"]);
    let factory = CachingMetadataReaderFactory::new(CountingFactory::new(dir.path()));

    let by_class = factory.reader_for_class("a.Foo").unwrap();
    let by_resource = factory.reader_for_resource(by_class.resource()).unwrap();
    assert!(Arc::ptr_eq(&by_class, &by_resource));
    assert_eq!(factory.inner().reads(), 1);
}

#[test]
fn test_least_recently_used_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let r = write_classes(dir.path(), &["a.A", "a.B", "a.C"]);
    let factory = CachingMetadataReaderFactory::with_cache_limit(CountingFactory::new(dir.path()), 2);

    factory.reader_for_resource(&r[0]).unwrap();
    factory.reader_for_resource(&r[1]).unwrap();
    // Touch A so that B becomes the eviction victim.
    factory.reader_for_resource(&r[0]).unwrap();
    factory.reader_for_resource(&r[2]).unwrap();

    assert_eq!(factory.cached_len(), 2);
    assert!(factory.is_cached(&r[0]));
    assert!(!factory.is_cached(&r[1]));
    assert!(factory.is_cached(&r[2]));
    assert_eq!(factory.inner().reads(), 3);

    factory.reader_for_resource(&r[1]).unwrap();
    assert_eq!(factory.inner().reads(), 4);
    assert!(!factory.is_cached(&r[0]));
}

#[test]
fn test_limit_plus_one_inserts_keep_limit_entries() {
    let dir = tempfile::tempdir().unwrap();
    let names: Vec<String> = (0..5).map(|i| format!("a.C{i}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let r = write_classes(dir.path(), &names);
    let factory = CachingMetadataReaderFactory::with_cache_limit(CountingFactory::new(dir.path()), 4);

    for resource in &r {
        factory.reader_for_resource(resource).unwrap();
    }
    assert_eq!(factory.cached_len(), 4);
    assert!(!factory.is_cached(&r[0]));
}

#[test]
fn test_non_positive_limit_disables_caching() {
    let dir = tempfile::tempdir().unwrap();
    let r = write_classes(dir.path(), &["a.Foo"]);

    for limit in [0, -1] {
        let factory =
            CachingMetadataReaderFactory::with_cache_limit(CountingFactory::new(dir.path()), limit);
        factory.reader_for_resource(&r[0]).unwrap();
        factory.reader_for_resource(&r[0]).unwrap();
        assert_eq!(factory.inner().reads(), 2);
        assert_eq!(factory.cached_len(), 0);
    }
}

#[test]
fn test_changing_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let r = write_classes(dir.path(), &["a.A", "a.B", "a.C"]);
    let factory = CachingMetadataReaderFactory::new(CountingFactory::new(dir.path()));
    for resource in &r {
        factory.reader_for_resource(resource).unwrap();
    }
    assert_eq!(factory.cached_len(), 3);

    factory.set_cache_limit(1);
    assert_eq!(factory.cached_len(), 1);
    assert!(factory.is_cached(&r[2]));

    factory.set_cache_limit(0);
    assert_eq!(factory.cached_len(), 0);
    factory.reader_for_resource(&r[2]).unwrap();
    assert_eq!(factory.cached_len(), 0);

    factory.set_cache_limit(8);
    factory.reader_for_resource(&r[2]).unwrap();
    assert_eq!(factory.cached_len(), 1);
    factory.clear_cache();
    assert_eq!(factory.cached_len(), 0);
}

#[test]
fn test_failed_reads_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Broken.class");
    std::fs::write(&path, b"nope").unwrap();
    let resource = Resource::file(&path);
    let factory = CachingMetadataReaderFactory::new(CountingFactory::new(dir.path()));

    assert!(factory.reader_for_resource(&resource).is_err());
    assert!(factory.reader_for_resource(&resource).is_err());
    assert_eq!(factory.inner().reads(), 2);
    assert_eq!(factory.cached_len(), 0);
}

#[test]
fn test_concurrent_reads_keep_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let r = write_classes(dir.path(), &["a.Shared"]);
    let factory = Arc::new(CachingMetadataReaderFactory::new(CountingFactory::new(dir.path())));

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let factory = Arc::clone(&factory);
            let resource = r[0].clone();
            scope.spawn(move || {
                let reader = factory.reader_for_resource(&resource).unwrap();
                assert_eq!(reader.class_name(), "a.Shared");
            });
        }
    });

    assert_eq!(factory.cached_len(), 1);
    assert!(factory.inner().reads() >= 1);
    let reads = factory.inner().reads();
    factory.reader_for_resource(&r[0]).unwrap();
    assert_eq!(factory.inner().reads(), reads);
}

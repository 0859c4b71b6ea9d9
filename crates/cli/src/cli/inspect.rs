use metascan_core::{CachingMetadataReaderFactory, MetadataReaderFactory, ResourceLoader};
use std::path::PathBuf;
use std::sync::Arc;

/// A bare dotted name such as `com.example.Foo` is looked up as a class.
fn looks_like_class_name(resource: &str) -> bool {
    !resource.contains(':')
        && !resource.contains('/')
        && !resource.contains('\\')
        && !resource.ends_with(".class")
}

pub fn run(resource: String, roots: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(ResourceLoader::from_paths(&roots));
    let factory = CachingMetadataReaderFactory::for_loader(Arc::clone(&loader));

    let reader = if looks_like_class_name(&resource) {
        factory.reader_for_class(&resource)?
    } else {
        factory.reader_for_resource(&loader.get_resource(&resource)?)?
    };

    let output = serde_json::json!({
        "resource": reader.resource().location(),
        "metadata": reader.metadata(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

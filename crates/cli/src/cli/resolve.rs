use metascan_core::{PathMatchingResourceResolver, ResourceLoader};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(pattern: String, roots: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(ResourceLoader::from_paths(&roots));
    let resolver = PathMatchingResourceResolver::new(loader);
    let resources = resolver.get_resources(&pattern)?;
    for resource in &resources {
        println!("{}", resource.location());
    }
    eprintln!("{} resources", resources.len());
    Ok(())
}

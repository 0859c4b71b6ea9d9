//! Single-location lookup over an ordered list of class-path roots.

use super::resource::{
    FILE_URL_PREFIX, JAR_URL_PREFIX, JAR_URL_SEPARATOR, Resource, archive_contains,
    has_archive_extension,
};
use crate::error::Result;
use crate::util::paths::absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Matches every root offering a location.
pub const CLASSPATH_ALL_URL_PREFIX: &str = "classpath*:";
/// Matches the first root offering a location.
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

/// One entry of the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassPathRoot {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ClassPathRoot {
    /// Archive when the extension says so, directory otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = absolutize(path.as_ref());
        if has_archive_extension(&path) {
            ClassPathRoot::Archive(path)
        } else {
            ClassPathRoot::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClassPathRoot::Directory(p) | ClassPathRoot::Archive(p) => p,
        }
    }

    /// Resource for `location` under this root, whether or not it exists.
    fn candidate(&self, location: &str) -> Resource {
        match self {
            ClassPathRoot::Directory(dir) if location.is_empty() => Resource::file(dir),
            ClassPathRoot::Directory(dir) => Resource::file(dir.join(location)),
            ClassPathRoot::Archive(jar) => Resource::archive_entry(jar, location),
        }
    }

    /// The resource for `location` if this root offers it.
    fn offer(&self, location: &str) -> Result<Option<Resource>> {
        match self {
            ClassPathRoot::Directory(dir) => {
                let path = if location.is_empty() {
                    dir.clone()
                } else {
                    dir.join(location)
                };
                Ok(path.exists().then(|| Resource::file(path)))
            }
            ClassPathRoot::Archive(jar) => {
                if !jar.exists() {
                    return Ok(None);
                }
                Ok(archive_contains(jar, location)?.then(|| Resource::archive_entry(jar, location)))
            }
        }
    }
}

/// Resolves plain (non-pattern) locations.
#[derive(Debug, Clone, Default)]
pub struct ResourceLoader {
    roots: Vec<ClassPathRoot>,
}

impl ResourceLoader {
    pub fn new(roots: Vec<ClassPathRoot>) -> Self {
        Self { roots }
    }

    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self::new(paths.into_iter().map(ClassPathRoot::from_path).collect())
    }

    pub fn add_root(mut self, root: ClassPathRoot) -> Self {
        self.roots.push(root);
        self
    }

    pub fn roots(&self) -> &[ClassPathRoot] {
        &self.roots
    }

    /// Exactly one resource for `location`. It may not exist.
    pub fn get_resource(&self, location: &str) -> Result<Resource> {
        if let Some(path) = location.strip_prefix(CLASSPATH_URL_PREFIX) {
            let path = path.trim_start_matches('/');
            for root in &self.roots {
                match root.offer(path) {
                    Ok(Some(resource)) => return Ok(resource),
                    Ok(None) => {}
                    Err(e) => debug!("Skipping root {}: {}", root.path().display(), e),
                }
            }
            return Ok(match self.roots.first() {
                Some(root) => root.candidate(path),
                None => Resource::file(path),
            });
        }
        if location.starts_with(JAR_URL_PREFIX) || location.contains(JAR_URL_SEPARATOR) {
            return Resource::from_jar_location(location);
        }
        let path = location.strip_prefix(FILE_URL_PREFIX).unwrap_or(location);
        Ok(Resource::file(path))
    }

    /// One resource per root offering `location`, in root order.
    pub fn find_all(&self, location: &str) -> Result<Vec<Resource>> {
        let path = location.trim_start_matches('/');
        let mut found = Vec::new();
        for root in &self.roots {
            match root.offer(path) {
                Ok(Some(resource)) => found.push(resource),
                Ok(None) => {}
                Err(e) => debug!("Skipping root {}: {}", root.path().display(), e),
            }
        }
        Ok(found)
    }
}

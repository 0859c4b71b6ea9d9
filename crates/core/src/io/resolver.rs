//! Expands location patterns into the set of matching resources.
//!
//! Supported forms:
//! - `classpath*:com/example/**/*.class` searches every root
//! - `classpath:com/example/*.class` searches the first root offering the static prefix
//! - `jar:file:/libs/app.jar!/com/**/*.class` searches one archive
//! - `file:/out/classes/**/*.class` or a bare path searches a directory tree
//!
//! The static prefix of the pattern (up to the last `/` before any wildcard)
//! is resolved first; every resulting root is then traversed and each entry
//! is matched against the remaining sub-pattern.

use super::loader::{CLASSPATH_ALL_URL_PREFIX, ResourceLoader};
use super::resource::Resource;
use crate::error::{IoContext, Result, ScanError};
use crate::util::matcher::{AntPathMatcher, PathMatcher};
use crate::util::paths::{absolutize, to_slash};
use indexmap::IndexSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub struct PathMatchingResourceResolver {
    loader: Arc<ResourceLoader>,
    matcher: Arc<dyn PathMatcher>,
}

impl PathMatchingResourceResolver {
    pub fn new(loader: Arc<ResourceLoader>) -> Self {
        Self {
            loader,
            matcher: Arc::new(AntPathMatcher::new()),
        }
    }

    pub fn with_path_matcher(mut self, matcher: Arc<dyn PathMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn loader(&self) -> &Arc<ResourceLoader> {
        &self.loader
    }

    pub fn path_matcher(&self) -> &Arc<dyn PathMatcher> {
        &self.matcher
    }

    pub fn get_resource(&self, location: &str) -> Result<Resource> {
        self.loader.get_resource(location)
    }

    /// All resources matching `location_pattern`, deduplicated, in discovery order.
    pub fn get_resources(&self, location_pattern: &str) -> Result<Vec<Resource>> {
        if let Some(rest) = location_pattern.strip_prefix(CLASSPATH_ALL_URL_PREFIX) {
            if self.matcher.is_pattern(rest) {
                return self.find_path_matching(location_pattern);
            }
            return self.loader.find_all(rest);
        }

        let prefix_end = location_pattern.find(':').map_or(0, |i| i + 1);
        if self.matcher.is_pattern(&location_pattern[prefix_end..]) {
            self.find_path_matching(location_pattern)
        } else {
            Ok(vec![self.loader.get_resource(location_pattern)?])
        }
    }

    /// Longest wildcard-free prefix of `location`, ending with `/`.
    ///
    /// `/WEB-INF/*.xml` -> `/WEB-INF/`, `classpath*:com/**/x.class` -> `classpath*:com/`.
    pub fn determine_root_dir<'a>(&self, location: &'a str) -> &'a str {
        let prefix_end = location.find(':').map_or(0, |i| i + 1);
        let bytes = location.as_bytes();
        let mut root_dir_end = location.len();
        while root_dir_end > prefix_end && self.matcher.is_pattern(&location[prefix_end..root_dir_end])
        {
            root_dir_end = if root_dir_end >= 2 {
                bytes[..root_dir_end - 1]
                    .iter()
                    .rposition(|&b| b == b'/')
                    .map_or(0, |i| i + 1)
            } else {
                0
            };
        }
        if root_dir_end == 0 {
            root_dir_end = prefix_end;
        }
        &location[..root_dir_end]
    }

    fn find_path_matching(&self, location_pattern: &str) -> Result<Vec<Resource>> {
        let root_dir = self.determine_root_dir(location_pattern);
        let sub_pattern = &location_pattern[root_dir.len()..];
        let roots = self.get_resources(root_dir)?;

        let mut result: IndexSet<Resource> = IndexSet::new();
        for root in roots {
            if root.is_archive_entry() || root.is_archive_file() {
                result.extend(self.find_in_archive(&root, sub_pattern)?);
            } else {
                result.extend(self.find_in_directory(&root, sub_pattern)?);
            }
        }

        debug!(
            "Resolved location pattern [{}] to {} resources",
            location_pattern,
            result.len()
        );
        Ok(result.into_iter().collect())
    }

    fn find_in_archive(&self, root: &Resource, sub_pattern: &str) -> Result<Vec<Resource>> {
        let (archive, mut root_entry) = match (root.container(), root.file_path()) {
            (Some(archive), _) => (archive, root.entry_name().unwrap_or_default().to_string()),
            (None, Some(path)) => (path, String::new()),
            (None, None) => return Ok(Vec::new()),
        };

        if !archive.exists() {
            debug!("Skipping [{}] because it does not exist", archive.display());
            return Ok(Vec::new());
        }
        let location = to_slash(archive);
        let file = match File::open(archive) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open archive [{}]: {}", location, e);
                return Ok(Vec::new());
            }
        };
        let mut zip = match zip::ZipArchive::new(BufReader::new(file)) {
            Ok(zip) => zip,
            Err(e) => {
                warn!("Skipping [{}] because it is not a valid archive: {}", location, e);
                return Ok(Vec::new());
            }
        };

        debug!("Looking for matching resources in archive [{}]", location);
        if !root_entry.is_empty() && !root_entry.ends_with('/') {
            root_entry.push('/');
        }

        let mut result = Vec::new();
        for i in 0..zip.len() {
            let entry = zip.by_index(i).with_location(&location)?;
            let Some(relative) = entry.name().strip_prefix(root_entry.as_str()) else {
                continue;
            };
            if self.matcher.match_path(sub_pattern, relative) {
                result.push(Resource::archive_entry(archive, entry.name()));
            }
        }
        Ok(result)
    }

    fn find_in_directory(&self, root: &Resource, sub_pattern: &str) -> Result<Vec<Resource>> {
        let Some(root_dir) = root.file_path() else {
            warn!(
                "Cannot search for matching files underneath {} because it does not correspond \
                 to a directory in the file system",
                root
            );
            return Ok(Vec::new());
        };
        let root_dir = absolutize(root_dir);

        if !root_dir.exists() {
            debug!("Skipping [{}] because it does not exist", root_dir.display());
            return Ok(Vec::new());
        }
        if !root_dir.is_dir() {
            warn!("Skipping [{}] because it does not denote a directory", root_dir.display());
            return Ok(Vec::new());
        }
        if let Err(e) = std::fs::read_dir(&root_dir) {
            warn!(
                "Cannot search for matching files underneath directory [{}]: {}",
                root_dir.display(),
                e
            );
            return Ok(Vec::new());
        }

        let mut full_pattern = to_slash(&root_dir);
        if !sub_pattern.starts_with('/') {
            full_pattern.push('/');
        }
        full_pattern.push_str(&sub_pattern.replace('\\', "/"));

        debug!(
            "Searching directory [{}] for files matching pattern [{}]",
            root_dir.display(),
            full_pattern
        );
        self.retrieve_matching_files(&root_dir, &full_pattern)
    }

    fn retrieve_matching_files(&self, root_dir: &Path, full_pattern: &str) -> Result<Vec<Resource>> {
        let mut result = Vec::new();
        let mut it = WalkDir::new(root_dir)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        loop {
            let entry = match it.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(e)) if is_skippable(&e) => {
                    debug!("Skipping unreadable path under [{}]: {}", root_dir.display(), e);
                    continue;
                }
                Some(Err(e)) => {
                    return Err(ScanError::Traverse {
                        root: to_slash(root_dir),
                        source: e,
                    });
                }
            };

            let current = to_slash(entry.path());
            if self.matcher.match_path(full_pattern, &current) {
                result.push(Resource::file(entry.path()));
            }
            if entry.file_type().is_dir()
                && !self.matcher.match_start(full_pattern, &format!("{current}/"))
            {
                it.skip_current_dir();
            }
        }
        Ok(result)
    }
}

fn is_skippable(error: &walkdir::Error) -> bool {
    error.loop_ancestor().is_some()
        || error
            .io_error()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
}

//! Uniform handle over a byte-addressable location: a file on disk or an
//! entry inside an archive.
//!
//! A resource never holds an open stream. Each call to [`Resource::open`]
//! opens a fresh one, and archive handles live only as long as that call.

use crate::error::{IoContext, Result, ScanError};
use crate::util::paths::{absolutize, apply_relative_path, clean_path, to_slash};
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

pub const FILE_URL_PREFIX: &str = "file:";
pub const JAR_URL_PREFIX: &str = "jar:";
pub const JAR_URL_SEPARATOR: &str = "!/";

/// File extensions treated as archive containers.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip", "war"];

#[derive(Debug, Clone)]
pub enum ResourceKind {
    File { path: PathBuf },
    ArchiveEntry { archive: PathBuf, entry: String },
}

#[derive(Debug, Clone)]
pub struct Resource {
    kind: ResourceKind,
    location: String,
}

impl Resource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = absolutize(path.as_ref());
        let location = format!("{FILE_URL_PREFIX}{}", clean_path(&to_slash(&path)));
        Self {
            kind: ResourceKind::File { path },
            location,
        }
    }

    /// Entry inside an archive. Leading slashes of `entry` are stripped.
    pub fn archive_entry(archive: impl AsRef<Path>, entry: &str) -> Self {
        let archive = absolutize(archive.as_ref());
        let entry = entry.trim_start_matches('/');
        let mut normalized = clean_path(entry);
        // Directory entries keep their trailing slash
        if entry.ends_with('/') && !normalized.is_empty() {
            normalized.push('/');
        }
        let entry = normalized;
        let location = format!(
            "{JAR_URL_PREFIX}{FILE_URL_PREFIX}{}{JAR_URL_SEPARATOR}{}",
            clean_path(&to_slash(&archive)),
            entry
        );
        Self {
            kind: ResourceKind::ArchiveEntry { archive, entry },
            location,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Normalized location, the identity of the resource.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn description(&self) -> String {
        match &self.kind {
            ResourceKind::File { path } => format!("file [{}]", path.display()),
            ResourceKind::ArchiveEntry { archive, entry } => {
                format!("archive entry [{}] in [{}]", entry, archive.display())
            }
        }
    }

    /// Filesystem path of a file resource.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.kind {
            ResourceKind::File { path } => Some(path),
            ResourceKind::ArchiveEntry { .. } => None,
        }
    }

    /// Archive holding an entry resource.
    pub fn container(&self) -> Option<&Path> {
        match &self.kind {
            ResourceKind::ArchiveEntry { archive, .. } => Some(archive),
            ResourceKind::File { .. } => None,
        }
    }

    pub fn entry_name(&self) -> Option<&str> {
        match &self.kind {
            ResourceKind::ArchiveEntry { entry, .. } => Some(entry),
            ResourceKind::File { .. } => None,
        }
    }

    pub fn is_archive_entry(&self) -> bool {
        matches!(self.kind, ResourceKind::ArchiveEntry { .. })
    }

    /// A file whose extension marks it as an archive container.
    pub fn is_archive_file(&self) -> bool {
        self.file_path().is_some_and(has_archive_extension)
    }

    pub fn filename(&self) -> Option<&str> {
        match &self.kind {
            ResourceKind::File { path } => path.file_name().and_then(|n| n.to_str()),
            ResourceKind::ArchiveEntry { entry, .. } => entry
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|n| !n.is_empty()),
        }
    }

    pub fn exists(&self) -> bool {
        match &self.kind {
            ResourceKind::File { path } => path.exists(),
            ResourceKind::ArchiveEntry { archive, entry } => {
                archive_contains(archive, entry).unwrap_or(false)
            }
        }
    }

    /// Exists and can be read as a stream of bytes.
    pub fn is_readable(&self) -> bool {
        match &self.kind {
            ResourceKind::File { path } => std::fs::metadata(path).is_ok_and(|m| m.is_file()),
            ResourceKind::ArchiveEntry { archive, entry } => {
                !entry.is_empty() && !entry.ends_with('/') && archive_has_file(archive, entry)
            }
        }
    }

    /// Opens a fresh stream.
    pub fn open(&self) -> Result<Box<dyn Read + Send>> {
        match &self.kind {
            ResourceKind::File { path } => {
                let file = File::open(path).with_location(&self.location)?;
                Ok(Box::new(BufReader::new(file)))
            }
            ResourceKind::ArchiveEntry { .. } => Ok(Box::new(Cursor::new(self.read_bytes()?))),
        }
    }

    /// Reads the full content. The underlying handle is closed before returning.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.kind {
            ResourceKind::File { path } => std::fs::read(path).with_location(&self.location),
            ResourceKind::ArchiveEntry { archive, entry } => {
                let file = File::open(archive).with_location(&self.location)?;
                let mut zip =
                    zip::ZipArchive::new(BufReader::new(file)).with_location(&self.location)?;
                let mut zipped = zip.by_name(entry).with_location(&self.location)?;
                let mut buf = Vec::with_capacity(zipped.size() as usize);
                zipped.read_to_end(&mut buf).with_location(&self.location)?;
                Ok(buf)
            }
        }
    }

    /// Resource at `relative`, resolved against this resource's parent.
    pub fn create_relative(&self, relative: &str) -> Self {
        match &self.kind {
            ResourceKind::File { path } => {
                let joined = apply_relative_path(&to_slash(path), relative);
                Resource::file(clean_path(&joined))
            }
            ResourceKind::ArchiveEntry { archive, entry } => {
                let joined = apply_relative_path(entry, relative);
                Resource::archive_entry(archive, &clean_path(&joined))
            }
        }
    }

    /// Parses a `jar:file:<archive>!/<entry>` location.
    pub fn from_jar_location(location: &str) -> Result<Self> {
        let rest = location.strip_prefix(JAR_URL_PREFIX).unwrap_or(location);
        let rest = rest.strip_prefix(FILE_URL_PREFIX).unwrap_or(rest);
        let Some((archive, entry)) = rest.split_once(JAR_URL_SEPARATOR) else {
            return Err(ScanError::InvalidPattern(format!(
                "archive location without '{JAR_URL_SEPARATOR}' separator: {location}"
            )));
        };
        Ok(Resource::archive_entry(archive, entry))
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

pub fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARCHIVE_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
}

fn archive_has_file(archive: &Path, entry: &str) -> bool {
    let Ok(file) = File::open(archive) else {
        return false;
    };
    let Ok(mut zip) = zip::ZipArchive::new(BufReader::new(file)) else {
        return false;
    };
    zip.by_name(entry).is_ok()
}

/// An entry exists when it is present, or when it is a directory prefix of
/// some other entry. The empty entry is the archive root.
pub(crate) fn archive_contains(archive: &Path, entry: &str) -> Result<bool> {
    let location = to_slash(archive);
    let file = File::open(archive).with_location(&location)?;
    let zip = zip::ZipArchive::new(BufReader::new(file)).with_location(&location)?;
    if entry.is_empty() {
        return Ok(true);
    }
    let dir_prefix = format!("{}/", entry.trim_end_matches('/'));
    Ok(zip
        .file_names()
        .any(|name| name == entry || name.starts_with(&dir_prefix)))
}

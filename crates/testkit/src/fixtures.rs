use crate::classfile::ClassFileWriter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the class under `root` at its package path and returns the file path.
pub fn write_class(root: &Path, class: &ClassFileWriter) -> PathBuf {
    let path = root.join(format!("{}.class", class.internal_name()));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, class.to_bytes()).unwrap();
    path
}

/// Writes a zip archive with the given entries, in order.
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(name.trim_end_matches('/'), options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Jar entry for a class, named by its package path.
pub fn class_entry(class: &ClassFileWriter) -> (String, Vec<u8>) {
    (format!("{}.class", class.internal_name()), class.to_bytes())
}

//! Conversions between binary class names, internal names and resource paths.

/// Suffix of compiled class descriptors.
pub const CLASS_FILE_SUFFIX: &str = ".class";

/// `com/example/Foo$Bar` -> `com.example.Foo$Bar`
pub fn internal_to_class_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `com.example.Foo` -> `com/example/Foo.class`
pub fn class_name_to_resource_path(class_name: &str) -> String {
    let mut path = package_to_path(class_name);
    path.push_str(CLASS_FILE_SUFFIX);
    path
}

/// `com.example` -> `com/example`
pub fn package_to_path(package: &str) -> String {
    package.replace('.', "/")
}

/// Returns the short name of a class, keeping nested `$` segments.
pub fn short_class_name(class_name: &str) -> &str {
    match class_name.rfind('.') {
        Some(idx) => &class_name[idx + 1..],
        None => class_name,
    }
}

/// Returns the package part of a class name, or `""` for the default package.
pub fn package_name(class_name: &str) -> &str {
    match class_name.rfind('.') {
        Some(idx) => &class_name[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_conversions() {
        assert_eq!(internal_to_class_name("a/b/C$D"), "a.b.C$D");
        assert_eq!(class_name_to_resource_path("a.b.C"), "a/b/C.class");
        assert_eq!(package_to_path("com.example"), "com/example");
        assert_eq!(short_class_name("a.b.C$D"), "C$D");
        assert_eq!(short_class_name("Top"), "Top");
        assert_eq!(package_name("a.b.C"), "a.b");
        assert_eq!(package_name("Top"), "");
    }
}

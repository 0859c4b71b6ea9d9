use metascan_core::api::{package_name, short_class_name};
use metascan_core::reader::MetadataReader;
use tabled::Tabled;

/// One table row per candidate.
#[derive(Tabled)]
pub struct CandidateView {
    pub class: String,
    pub package: String,
    pub annotations: String,
    pub resource: String,
}

impl CandidateView {
    pub fn from_reader(reader: &MetadataReader) -> Self {
        let class_name = reader.class_name();
        let annotations: Vec<&str> = reader.annotation_metadata().annotation_types().collect();
        Self {
            class: short_class_name(class_name).to_string(),
            package: match package_name(class_name) {
                "" => "(default)".to_string(),
                package => package.to_string(),
            },
            annotations: if annotations.is_empty() {
                "-".to_string()
            } else {
                annotations.join(", ")
            },
            resource: reader.resource().location().to_string(),
        }
    }
}

pub mod models;
pub mod naming;

// Re-export commonly used types
pub use models::*;
pub use naming::{
    class_name_to_resource_path, internal_to_class_name, package_name, package_to_path,
    short_class_name,
};

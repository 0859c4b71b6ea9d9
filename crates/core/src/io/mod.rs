pub mod loader;
pub mod resolver;
pub mod resource;

pub use loader::{CLASSPATH_ALL_URL_PREFIX, CLASSPATH_URL_PREFIX, ClassPathRoot, ResourceLoader};
pub use resolver::PathMatchingResourceResolver;
pub use resource::{Resource, ResourceKind};

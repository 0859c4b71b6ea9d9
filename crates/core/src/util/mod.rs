pub mod matcher;
pub mod paths;

pub use matcher::{AntPathMatcher, PathMatcher};

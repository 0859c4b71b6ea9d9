pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod logging;
pub mod reader;
pub mod scanner;
pub mod util;

pub use config::{DecodeErrorPolicy, ScanConfig};
pub use error::{Result, ScanError};
pub use filter::{
    AnnotationTypeFilter, AssignableTypeFilter, RegexPatternTypeFilter, TypeFilter,
};
pub use io::{PathMatchingResourceResolver, Resource, ResourceLoader};
pub use reader::{
    CachingMetadataReaderFactory, MetadataReader, MetadataReaderFactory,
    SimpleMetadataReaderFactory,
};
pub use scanner::{ClassPathScanner, ScanReport, ScanStats};
pub use util::matcher::{AntPathMatcher, PathMatcher};

pub use metascan_api as api;

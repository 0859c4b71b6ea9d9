//! Candidate discovery: resolve a location pattern, read each descriptor and
//! run it through the exclude/include filters.

use crate::config::{DEFAULT_RESOURCE_PATTERN, DecodeErrorPolicy, ScanConfig};
use crate::error::{Result, ScanError};
use crate::filter::{AnnotationTypeFilter, RegexPatternTypeFilter, TypeFilter};
use crate::io::{CLASSPATH_ALL_URL_PREFIX, PathMatchingResourceResolver, Resource, ResourceLoader};
use crate::reader::{
    CachingMetadataReaderFactory, MetadataReader, MetadataReaderFactory, SimpleMetadataReaderFactory,
};
use indexmap::IndexSet;
use metascan_api::{ClassMetadata, package_to_path};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Resources the pattern resolved to.
    pub resources: usize,
    pub unreadable: usize,
    /// Skipped under [`DecodeErrorPolicy::Skip`].
    pub decode_failures: usize,
    /// Matched an exclude filter or no include filter.
    pub filtered_out: usize,
    /// Passed the filters but is abstract, an interface or a non-static inner class.
    pub rejected: usize,
    pub candidates: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub candidates: Vec<Arc<MetadataReader>>,
    pub stats: ScanStats,
}

impl ScanReport {
    pub fn class_names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.class_name()).collect()
    }
}

enum Outcome {
    Unreadable,
    DecodeFailed,
    FilteredOut,
    Rejected,
    Candidate(Arc<MetadataReader>),
}

pub struct ClassPathScanner {
    resolver: PathMatchingResourceResolver,
    factory: Arc<dyn MetadataReaderFactory>,
    resource_pattern: String,
    include_filters: Vec<Box<dyn TypeFilter>>,
    exclude_filters: Vec<Box<dyn TypeFilter>>,
    decode_errors: DecodeErrorPolicy,
    parallel: bool,
}

impl ClassPathScanner {
    /// Scanner over `loader`'s roots with a caching reader factory and no filters.
    pub fn new(loader: Arc<ResourceLoader>) -> Self {
        let factory = CachingMetadataReaderFactory::for_loader(Arc::clone(&loader));
        Self::with_factory(PathMatchingResourceResolver::new(loader), Arc::new(factory))
    }

    pub fn with_factory(
        resolver: PathMatchingResourceResolver,
        factory: Arc<dyn MetadataReaderFactory>,
    ) -> Self {
        Self {
            resolver,
            factory,
            resource_pattern: DEFAULT_RESOURCE_PATTERN.to_string(),
            include_filters: Vec::new(),
            exclude_filters: Vec::new(),
            decode_errors: DecodeErrorPolicy::default(),
            parallel: false,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        let loader = Arc::new(ResourceLoader::from_paths(&config.roots));
        let factory = CachingMetadataReaderFactory::with_cache_limit(
            SimpleMetadataReaderFactory::new(Arc::clone(&loader)),
            config.cache_limit,
        );

        let mut scanner = Self::with_factory(PathMatchingResourceResolver::new(loader), Arc::new(factory))
            .with_resource_pattern(config.resource_pattern.clone())
            .with_decode_error_policy(config.decode_errors)
            .with_parallel(config.parallel);

        for annotation in &config.include_annotations {
            scanner.add_include_filter(AnnotationTypeFilter::new(annotation.clone()));
        }
        for pattern in &config.include_patterns {
            scanner.add_include_filter(regex_filter(pattern)?);
        }
        for annotation in &config.exclude_annotations {
            scanner.add_exclude_filter(AnnotationTypeFilter::new(annotation.clone()));
        }
        for pattern in &config.exclude_patterns {
            scanner.add_exclude_filter(regex_filter(pattern)?);
        }
        Ok(scanner)
    }

    pub fn with_resource_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.resource_pattern = pattern.into();
        self
    }

    pub fn with_decode_error_policy(mut self, policy: DecodeErrorPolicy) -> Self {
        self.decode_errors = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn add_include_filter(&mut self, filter: impl TypeFilter + 'static) {
        self.include_filters.push(Box::new(filter));
    }

    pub fn add_exclude_filter(&mut self, filter: impl TypeFilter + 'static) {
        self.exclude_filters.push(Box::new(filter));
    }

    pub fn reset_filters(&mut self) {
        self.include_filters.clear();
        self.exclude_filters.clear();
    }

    pub fn resolver(&self) -> &PathMatchingResourceResolver {
        &self.resolver
    }

    pub fn factory(&self) -> &Arc<dyn MetadataReaderFactory> {
        &self.factory
    }

    /// Location pattern searched for `base_package`.
    pub fn package_search_pattern(&self, base_package: &str) -> String {
        let package_path = package_to_path(base_package.trim());
        if package_path.is_empty() {
            format!("{CLASSPATH_ALL_URL_PREFIX}{}", self.resource_pattern)
        } else {
            format!("{CLASSPATH_ALL_URL_PREFIX}{}/{}", package_path, self.resource_pattern)
        }
    }

    /// Candidates in `base_package` and its subpackages across all roots.
    pub fn find_candidates(&self, base_package: &str) -> Result<Vec<Arc<MetadataReader>>> {
        Ok(self.scan_package(base_package)?.candidates)
    }

    pub fn scan_package(&self, base_package: &str) -> Result<ScanReport> {
        self.scan(&self.package_search_pattern(base_package))
    }

    pub fn scan(&self, location_pattern: &str) -> Result<ScanReport> {
        let started = Instant::now();
        let resources = self.resolver.get_resources(location_pattern)?;
        debug!(
            "Evaluating {} resources for pattern [{}]",
            resources.len(),
            location_pattern
        );

        let outcomes: Vec<Result<Outcome>> = if self.parallel {
            resources.par_iter().map(|r| self.evaluate(r)).collect()
        } else {
            resources.iter().map(|r| self.evaluate(r)).collect()
        };

        let mut stats = ScanStats {
            resources: resources.len(),
            ..Default::default()
        };
        let mut seen: IndexSet<Resource> = IndexSet::new();
        let mut candidates = Vec::new();
        for outcome in outcomes {
            match outcome? {
                Outcome::Unreadable => stats.unreadable += 1,
                Outcome::DecodeFailed => stats.decode_failures += 1,
                Outcome::FilteredOut => stats.filtered_out += 1,
                Outcome::Rejected => stats.rejected += 1,
                Outcome::Candidate(reader) => {
                    if seen.insert(reader.resource().clone()) {
                        candidates.push(reader);
                    }
                }
            }
        }
        stats.candidates = candidates.len();
        stats.duration = started.elapsed();

        info!(
            "Scanned [{}]: {} resources, {} candidates, {} filtered out, {} rejected, {} decode failures in {:?}",
            location_pattern,
            stats.resources,
            stats.candidates,
            stats.filtered_out,
            stats.rejected,
            stats.decode_failures,
            stats.duration
        );
        Ok(ScanReport { candidates, stats })
    }

    /// Exclude filters first, in registration order; then include filters.
    /// No include filter matching means not a candidate.
    pub fn is_candidate(&self, reader: &MetadataReader) -> Result<bool> {
        let factory = self.factory.as_ref();
        for filter in &self.exclude_filters {
            if filter.matches(reader, factory)? {
                return Ok(false);
            }
        }
        for filter in &self.include_filters {
            if filter.matches(reader, factory)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Instantiable on its own: concrete and not a non-static inner class.
    pub fn is_candidate_component(&self, class: &ClassMetadata) -> bool {
        class.is_independent() && class.is_concrete()
    }

    fn evaluate(&self, resource: &Resource) -> Result<Outcome> {
        if !resource.is_readable() {
            trace!("Ignored because not readable: {}", resource);
            return Ok(Outcome::Unreadable);
        }

        let reader = match self.factory.reader_for_resource(resource) {
            Ok(reader) => reader,
            Err(e) if e.is_decode() && self.decode_errors == DecodeErrorPolicy::Skip => {
                warn!("Skipping undecodable resource: {}", e);
                return Ok(Outcome::DecodeFailed);
            }
            Err(e) => return Err(e),
        };

        if !self.is_candidate(&reader)? {
            trace!("Ignored because not matching any filter: {}", resource);
            return Ok(Outcome::FilteredOut);
        }
        if !self.is_candidate_component(reader.class_metadata()) {
            debug!("Ignored because not a concrete top-level class: {}", resource);
            return Ok(Outcome::Rejected);
        }
        debug!("Identified candidate class: {}", reader.class_name());
        Ok(Outcome::Candidate(reader))
    }
}

fn regex_filter(pattern: &str) -> Result<RegexPatternTypeFilter> {
    RegexPatternTypeFilter::new(pattern)
        .map_err(|e| ScanError::Config(format!("invalid class name pattern [{pattern}]: {e}")))
}

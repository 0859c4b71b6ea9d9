use super::TypeFilter;
use crate::error::Result;
use crate::reader::{MetadataReader, MetadataReaderFactory};
use regex::Regex;

/// Matches class names against a regular expression. The whole name must match.
#[derive(Debug, Clone)]
pub struct RegexPatternTypeFilter {
    pattern: Regex,
}

impl RegexPatternTypeFilter {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    pub fn is_match(&self, class_name: &str) -> bool {
        self.pattern.is_match(class_name)
    }
}

impl TypeFilter for RegexPatternTypeFilter {
    fn matches(&self, reader: &MetadataReader, _factory: &dyn MetadataReaderFactory) -> Result<bool> {
        Ok(self.is_match(reader.class_name()))
    }
}

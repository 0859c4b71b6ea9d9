//! Ant-style path matching.
//!
//! Mapping rules:
//! - `?` matches one character
//! - `*` matches zero or more characters within a segment
//! - `**` matches zero or more segments
//! - `{name}` / `{name:regex}` capture a template variable within a segment
//!
//! Examples: `com/t?st.class`, `com/*.class`, `com/**/test.class`,
//! `org/**/servlet/bla.class`.

use crate::error::{Result, ScanError};
use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PATH_SEPARATOR: &str = "/";

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^/]+?\}").expect("static regex"));

static GLOB_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\?|\*|\{((?:\{[^/]+?\}|[^/{}]|\\[{}])+?)\}").expect("static regex")
});

const DEFAULT_VARIABLE_PATTERN: &str = "(.*)";

/// Path matching strategy used by the resource resolver.
pub trait PathMatcher: Send + Sync {
    /// Whether the path contains wildcard characters.
    fn is_pattern(&self, path: &str) -> bool;

    /// Full match of `path` against `pattern`.
    fn match_path(&self, pattern: &str, path: &str) -> bool;

    /// Whether `pattern` could match `path` or some descendant of it.
    fn match_start(&self, pattern: &str, path: &str) -> bool;

    /// Part of `path` matched by the wildcard part of `pattern`.
    fn extract_path_within_pattern(&self, pattern: &str, path: &str) -> String;
}

/// Compiled form of one pattern segment.
#[derive(Debug)]
struct SegmentMatcher {
    regex: Regex,
    variable_names: Vec<String>,
}

impl SegmentMatcher {
    fn compile(segment: &str) -> std::result::Result<Self, regex::Error> {
        let mut source = String::from("^(?:");
        let mut variable_names = Vec::new();
        let mut end = 0;

        for caps in GLOB_PATTERN.captures_iter(segment) {
            let Some(whole) = caps.get(0) else { continue };
            source.push_str(&regex::escape(&segment[end..whole.start()]));
            let token = whole.as_str();
            match token {
                "?" => source.push('.'),
                "*" => source.push_str(".*"),
                _ => match token.find(':') {
                    None => {
                        source.push_str(DEFAULT_VARIABLE_PATTERN);
                        if let Some(name) = caps.get(1) {
                            variable_names.push(name.as_str().to_string());
                        }
                    }
                    Some(colon) => {
                        source.push('(');
                        source.push_str(&token[colon + 1..token.len() - 1]);
                        source.push(')');
                        variable_names.push(token[1..colon].to_string());
                    }
                },
            }
            end = whole.end();
        }
        source.push_str(&regex::escape(&segment[end..]));
        source.push_str(")$");

        Ok(Self {
            regex: Regex::new(&source)?,
            variable_names,
        })
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn capture_into(&self, text: &str, variables: &mut IndexMap<String, String>) -> Result<bool> {
        let Some(caps) = self.regex.captures(text) else {
            return Ok(false);
        };
        let group_count = caps.len() - 1;
        if group_count != self.variable_names.len() {
            return Err(ScanError::InvalidPattern(format!(
                "segment regex {} has {} capturing groups but defines {} template variables; \
                 use non-capturing groups instead",
                self.regex.as_str(),
                group_count,
                self.variable_names.len()
            )));
        }
        for (i, name) in self.variable_names.iter().enumerate() {
            let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
            variables.insert(name.clone(), value.to_string());
        }
        Ok(true)
    }
}

/// Ant-style [`PathMatcher`] with a cache of compiled segment matchers.
pub struct AntPathMatcher {
    path_separator: String,
    trim_tokens: bool,
    segment_cache: DashMap<String, Option<Arc<SegmentMatcher>>>,
}

impl Default for AntPathMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AntPathMatcher {
    pub fn new() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            trim_tokens: true,
            segment_cache: DashMap::with_capacity(256),
        }
    }

    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        self.path_separator = if separator.is_empty() {
            DEFAULT_PATH_SEPARATOR.to_string()
        } else {
            separator
        };
        self
    }

    pub fn with_trim_tokens(mut self, trim_tokens: bool) -> Self {
        self.trim_tokens = trim_tokens;
        self
    }

    pub fn path_separator(&self) -> &str {
        &self.path_separator
    }

    /// Number of compiled segments held in the cache.
    pub fn cached_segments(&self) -> usize {
        self.segment_cache.len()
    }

    /// Captured template variables of a path matching `pattern`.
    pub fn extract_uri_template_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Result<IndexMap<String, String>> {
        let mut variables = IndexMap::new();
        if !self.do_match(pattern, path, true, Some(&mut variables))? {
            return Err(ScanError::InvalidPattern(format!(
                "pattern \"{pattern}\" is not a match for \"{path}\""
            )));
        }
        Ok(variables)
    }

    /// Orders patterns from most to least specific for `path`.
    pub fn pattern_comparator(&self, path: &str) -> impl Fn(&str, &str) -> Ordering + '_ {
        let path = path.to_string();
        move |a, b| compare_patterns(&path, a, b)
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(|c: char| self.path_separator.contains(c))
            .map(|t| if self.trim_tokens { t.trim() } else { t })
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn segment(&self, segment: &str) -> Option<Arc<SegmentMatcher>> {
        if let Some(cached) = self.segment_cache.get(segment) {
            return cached.clone();
        }
        let compiled = match SegmentMatcher::compile(segment) {
            Ok(matcher) => Some(Arc::new(matcher)),
            Err(e) => {
                debug!("Invalid pattern segment {:?}: {}", segment, e);
                None
            }
        };
        self.segment_cache
            .insert(segment.to_string(), compiled.clone());
        compiled
    }

    fn match_strings(
        &self,
        pattern: &str,
        text: &str,
        variables: &mut Option<&mut IndexMap<String, String>>,
    ) -> Result<bool> {
        let Some(matcher) = self.segment(pattern) else {
            return Ok(false);
        };
        match variables {
            Some(vars) => matcher.capture_into(text, vars),
            None => Ok(matcher.is_match(text)),
        }
    }

    fn do_match(
        &self,
        pattern: &str,
        path: &str,
        full_match: bool,
        mut variables: Option<&mut IndexMap<String, String>>,
    ) -> Result<bool> {
        let sep = self.path_separator.as_str();
        if path.starts_with(sep) != pattern.starts_with(sep) {
            return Ok(false);
        }

        let patt_dirs = self.tokenize(pattern);
        let path_dirs = self.tokenize(path);
        let all_double_star = |from: isize, to: isize| -> bool {
            (from..=to).all(|i| patt_dirs[i as usize] == "**")
        };

        let mut patt_start: isize = 0;
        let mut patt_end: isize = patt_dirs.len() as isize - 1;
        let mut path_start: isize = 0;
        let mut path_end: isize = path_dirs.len() as isize - 1;

        // Leading segments up to the first **
        while patt_start <= patt_end && path_start <= path_end {
            let patt_dir = patt_dirs[patt_start as usize];
            if patt_dir == "**" {
                break;
            }
            if !self.match_strings(patt_dir, path_dirs[path_start as usize], &mut variables)? {
                return Ok(false);
            }
            patt_start += 1;
            path_start += 1;
        }

        if path_start > path_end {
            // Path exhausted
            if patt_start > patt_end {
                return Ok(if pattern.ends_with(sep) {
                    path.ends_with(sep)
                } else {
                    !path.ends_with(sep)
                });
            }
            if !full_match {
                return Ok(true);
            }
            if patt_start == patt_end
                && patt_dirs[patt_start as usize] == "*"
                && path.ends_with(sep)
            {
                return Ok(true);
            }
            return Ok(all_double_star(patt_start, patt_end));
        } else if patt_start > patt_end {
            // Pattern exhausted with path remaining
            return Ok(false);
        } else if !full_match && patt_dirs[patt_start as usize] == "**" {
            return Ok(true);
        }

        // Trailing segments back to the last **
        while patt_start <= patt_end && path_start <= path_end {
            let patt_dir = patt_dirs[patt_end as usize];
            if patt_dir == "**" {
                break;
            }
            if !self.match_strings(patt_dir, path_dirs[path_end as usize], &mut variables)? {
                return Ok(false);
            }
            patt_end -= 1;
            path_end -= 1;
        }

        if path_start > path_end {
            return Ok(all_double_star(patt_start, patt_end));
        }

        // Place each run between consecutive ** markers
        while patt_start != patt_end && path_start <= path_end {
            let next_double_star = ((patt_start + 1)..=patt_end)
                .find(|&i| patt_dirs[i as usize] == "**")
                .unwrap_or(-1);
            if next_double_star == patt_start + 1 {
                // **/** collapses
                patt_start += 1;
                continue;
            }

            let pat_len = next_double_star - patt_start - 1;
            let str_len = path_end - path_start + 1;
            let mut found: Option<isize> = None;
            'window: for i in 0..=(str_len - pat_len) {
                for j in 0..pat_len {
                    let sub_pat = patt_dirs[(patt_start + j + 1) as usize];
                    let sub_str = path_dirs[(path_start + i + j) as usize];
                    if !self.match_strings(sub_pat, sub_str, &mut variables)? {
                        continue 'window;
                    }
                }
                found = Some(path_start + i);
                break;
            }

            let Some(found) = found else {
                return Ok(false);
            };
            patt_start = next_double_star;
            path_start = found + pat_len;
        }

        Ok(all_double_star(patt_start, patt_end))
    }
}

impl PathMatcher for AntPathMatcher {
    fn is_pattern(&self, path: &str) -> bool {
        path.contains('*') || path.contains('?')
    }

    fn match_path(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, true, None).unwrap_or(false)
    }

    fn match_start(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, false, None).unwrap_or(false)
    }

    fn extract_path_within_pattern(&self, pattern: &str, path: &str) -> String {
        let sep = self.path_separator.as_str();
        let pattern_parts = self.tokenize(pattern);
        let path_parts = self.tokenize(path);
        let mut out = String::new();
        let mut puts = 0;

        for (i, part) in pattern_parts.iter().enumerate() {
            if (part.contains('*') || part.contains('?')) && path_parts.len() > i {
                if puts > 0 || (i == 0 && !pattern.starts_with(sep)) {
                    out.push_str(sep);
                }
                out.push_str(path_parts[i]);
                puts += 1;
            }
        }

        for (i, part) in path_parts.iter().enumerate().skip(pattern_parts.len()) {
            if puts > 0 || i > 0 {
                out.push_str(sep);
            }
            out.push_str(part);
        }
        out
    }
}

fn compare_patterns(path: &str, p1: &str, p2: &str) -> Ordering {
    match (p1 == path, p2 == path) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let wild1 = wildcard_count(p1);
    let wild2 = wildcard_count(p2);
    let brace1 = p1.matches('{').count();
    let brace2 = p2.matches('{').count();

    (wild1 + brace1)
        .cmp(&(wild2 + brace2))
        .then_with(|| pattern_length(p2).cmp(&pattern_length(p1)))
        .then_with(|| wild1.cmp(&wild2))
        .then_with(|| brace1.cmp(&brace2))
}

fn wildcard_count(pattern: &str) -> usize {
    pattern
        .strip_suffix(".*")
        .unwrap_or(pattern)
        .matches('*')
        .count()
}

fn pattern_length(pattern: &str) -> usize {
    VARIABLE_PATTERN.replace_all(pattern, "#").len()
}

use anyhow::{Context, Result};
use regex::Regex;

/// Body filter compiled once and shared read-only by every worker.
///
/// An empty pattern matches every body and leaves the filter inactive.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pattern: Option<Regex>,
}

impl Filter {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::match_all());
        }
        let pattern = Regex::new(pattern)
            .with_context(|| format!("invalid include pattern {pattern:?}"))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn match_all() -> Self {
        Self { pattern: None }
    }

    pub fn matches(&self, body: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(body))
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_ref().map_or("", Regex::as_str)
    }
}

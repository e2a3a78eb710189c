//! Host pattern matching.
//!
//! # Responsibilities
//! - Compile a route's pattern once at startup
//! - Test a requested "host:port" string against it
//!
//! # Design Decisions
//! - Patterns are regular expressions searched anywhere in the target
//!   (unanchored); operators anchor with `^`/`$` when they need to
//! - Matching is case-sensitive; `(?i)` opts into case folding

use regex::Regex;

/// A compiled host pattern.
#[derive(Debug, Clone)]
pub struct HostPattern {
    regex: Regex,
}

impl HostPattern {
    /// Compile a pattern.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Returns true if the pattern occurs in `target`.
    pub fn matches(&self, target: &str) -> bool {
        self.regex.is_match(target)
    }

    /// The source text this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

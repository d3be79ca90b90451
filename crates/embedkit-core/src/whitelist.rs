//! Domain whitelist matching for embed URLs.
//!
//! Patterns are domain globs such as `*.youtube.com` or `youtu.be`. Each one
//! compiles to an anchored, case-insensitive regex that allows an optional
//! `http:`/`https:` scheme, an optional `//`, one optional leading subdomain
//! label, then the pattern's literal skeleton, an optional numeric port, and an
//! optional path, query or fragment.
//! A leading `*.` is the optional subdomain label itself, so `*.example.com`
//! also matches bare `example.com`; a pattern cannot demand a subdomain.

use regex::Regex;

use crate::error::WhitelistError;

/// Fragment matching one subdomain label for an inner `*`.
const LABEL: &str = "[a-z][a-z0-9]*";

#[derive(Debug, Clone)]
pub struct Whitelist {
    patterns: Vec<Regex>,
}

impl Whitelist {
    /// Compiles every pattern once.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError`] if a pattern is blank or does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, WhitelistError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A whitelist that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// True if `url` matches at least one pattern. An empty whitelist never
    /// matches.
    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, WhitelistError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(WhitelistError::EmptyPattern);
    }

    let skeleton = trimmed.strip_prefix("*.").unwrap_or(trimmed);
    let joined = skeleton
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(LABEL);
    let source = format!(r"(?i)^(https?:)?(//)?([a-z0-9\-]+\.)?{joined}(:\d+)?([/?#].*)?$");

    Regex::new(&source).map_err(|source| WhitelistError::InvalidPattern {
        pattern: trimmed.to_string(),
        source,
    })
}

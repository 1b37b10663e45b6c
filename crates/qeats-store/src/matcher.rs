use regex::{Regex, RegexBuilder};

use crate::Result;

/// Case-insensitive substring matcher for free-text store queries.
///
/// The query is escaped before compilation, so user input such as `"C++"` or
/// `"(spicy)"` is matched literally rather than as a pattern.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    pattern: Regex,
}

impl TextMatcher {
    pub fn contains_ignore_case(query: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }

    /// True if any of `values` matches.
    pub fn any_match<I, S>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().any(|value| self.is_match(value.as_ref()))
    }
}

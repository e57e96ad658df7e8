use crate::error::{ModManError, Result};
use regex::Regex;

/// Case-insensitive module name matcher.
///
/// Plain names match exactly; `*` and `?` switch to glob matching
/// (e.g. `Az.*`, `Microsoft.Graph.?sers`).
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ModManError::Config(
                "Module name pattern cannot be empty".to_string(),
            ));
        }

        let regex = Self::compile_glob(trimmed)?;
        Ok(Self { regex })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn compile_glob(pattern: &str) -> Result<Regex> {
        let mut regex = String::from("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                    regex.push('\\');
                    regex.push(ch);
                }
                _ => regex.push(ch),
            }
        }
        regex.push('$');

        Regex::new(&regex).map_err(|e| {
            ModManError::Config(format!("Invalid module pattern '{}': {}", pattern, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_match_exactly_ignoring_case() {
        let matcher = PatternMatcher::new("Az").unwrap();
        assert!(matcher.matches("Az"));
        assert!(matcher.matches("az"));
        assert!(!matcher.matches("Az.Storage"));
        assert!(!matcher.matches("Baz"));
    }

    #[test]
    fn wildcards_glob() {
        let matcher = PatternMatcher::new("Microsoft.Graph.*").unwrap();
        assert!(matcher.matches("Microsoft.Graph.Users"));
        assert!(!matcher.matches("Microsoft.Graph"));
        assert!(!matcher.matches("MicrosoftXGraph.Users"));

        let single = PatternMatcher::new("Pester?").unwrap();
        assert!(single.matches("Pester5"));
        assert!(!single.matches("Pester"));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(PatternMatcher::new("  ").is_err());
    }
}

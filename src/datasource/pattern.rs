use regex::{Regex, RegexBuilder};

use crate::errors::IndexError;

/// A compiled SQL `LIKE` pattern: `%` matches any run, `_` exactly one
/// character, ASCII letters compare case-insensitively.
#[derive(Debug, Clone)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Result<Self, IndexError> {
        Self::build(pattern, true)
    }

    /// Pattern matching any text that contains `fragment` (`%fragment%`).
    pub fn containing(fragment: &str) -> Result<Self, IndexError> {
        Self::build(fragment, false)
    }

    fn build(pattern: &str, anchored: bool) -> Result<Self, IndexError> {
        let mut source = String::with_capacity(pattern.len() + 8);
        if anchored {
            source.push('^');
        }
        for ch in pattern.chars() {
            match ch {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                c => source.push_str(&regex::escape(&c.to_string())),
            }
        }
        if anchored {
            source.push('$');
        }

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| IndexError::InvalidQuery {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self { regex })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_wildcards() {
        let pattern = LikePattern::new("%.plist").unwrap();
        assert!(pattern.matches("com.apple.springboard.plist"));
        assert!(pattern.matches("A.PLIST"));
        assert!(!pattern.matches("a.plist.bak"));

        let single = LikePattern::new("sms_.db").unwrap();
        assert!(single.matches("sms1.db"));
        assert!(!single.matches("sms.db"));
    }

    #[test]
    fn test_like_escapes_regex_characters() {
        let pattern = LikePattern::new("a+b(1).db").unwrap();
        assert!(pattern.matches("a+b(1).db"));
        assert!(!pattern.matches("aab(1)xdb"));
    }

    #[test]
    fn test_containing() {
        let dir = LikePattern::containing("mobile/Library/").unwrap();
        assert!(dir.matches("/private/var/mobile/Library/"));
        assert!(!dir.matches("/private/var/root/"));

        let wild = LikePattern::containing("%/Library/SMS/").unwrap();
        assert!(wild.matches("/private/var/mobile/Library/SMS/"));
    }
}

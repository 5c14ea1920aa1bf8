//! Site filtering
//!
//! Restricts extracted records to those whose source contains a given text,
//! compared case-insensitively.

/// Case-insensitive substring filter applied to a record's source field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFilter {
    needle: String,
}

impl SiteFilter {
    /// Build a filter from user input. Blank input means "no filter".
    pub fn new(site: &str) -> Option<Self> {
        let needle = site.trim().to_lowercase();
        if needle.is_empty() {
            None
        } else {
            Some(Self { needle })
        }
    }

    /// Check whether `source` contains the filter text
    #[inline]
    pub fn matches(&self, source: &str) -> bool {
        // ASCII fast path avoids allocating a lowercased copy per line
        if source.is_ascii() && self.needle.is_ascii() {
            let needle = self.needle.as_bytes();
            if needle.len() > source.len() {
                return false;
            }
            return source
                .as_bytes()
                .windows(needle.len())
                .any(|window| window.eq_ignore_ascii_case(needle));
        }

        source.to_lowercase().contains(&self.needle)
    }

    /// The case-folded filter text
    pub fn as_str(&self) -> &str {
        &self.needle
    }
}

impl std::fmt::Display for SiteFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let filter = SiteFilter::new("bank").unwrap();

        assert!(filter.matches("MyBank.com"));
        assert!(filter.matches("https://bank.example"));
        assert!(!filter.matches("shop.com"));
        assert!(!filter.matches("ban"));
    }

    #[test]
    fn test_blank_is_no_filter() {
        assert!(SiteFilter::new("").is_none());
        assert!(SiteFilter::new("  \t").is_none());
    }

    #[test]
    fn test_input_is_folded_and_trimmed() {
        let filter = SiteFilter::new(" NetFlix ").unwrap();

        assert_eq!(filter.as_str(), "netflix");
        assert!(filter.matches("www.NETFLIX.com"));
    }

    #[test]
    fn test_unicode_source() {
        let filter = SiteFilter::new("bücher").unwrap();

        assert!(filter.matches("BÜCHER.de"));
        assert!(!filter.matches("buecher.de"));
    }
}

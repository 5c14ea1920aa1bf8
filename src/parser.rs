//! Line parsing
//!
//! Turns one raw line of a combo list into a [`Record`]. Parsing is pure and
//! never fails loudly: anything that does not look like a combo is simply
//! "no match".

use crate::cli::Delimiter;
use crate::filter::SiteFilter;

/// A single combo extracted from a line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Where the credential belongs (URL, domain, ...)
    pub source: String,
    /// Login / account name
    pub identifier: String,
    /// Credential value
    pub secret: String,
}

/// Parse `line` into a record.
///
/// Returns `None` when the delimiter is absent, when the line has fewer than
/// three fields, or when `filter` is given and does not match the source.
/// Fields past the third are ignored.
///
/// Splitting is naive: a delimiter inside a field is not escaped, so with `:`
/// a line like `https://site.com:user:pass` yields the source `https`.
pub fn parse_line(line: &str, delimiter: Delimiter, filter: Option<&SiteFilter>) -> Option<Record> {
    let delimiter = delimiter.as_str();
    if !line.contains(delimiter) {
        return None;
    }

    let mut fields = line.split(delimiter).map(str::trim);
    let source = fields.next()?;
    let identifier = fields.next()?;
    let secret = fields.next()?;

    if let Some(filter) = filter {
        if !filter.matches(source) {
            return None;
        }
    }

    Some(Record {
        source: source.to_owned(),
        identifier: identifier.to_owned(),
        secret: secret.to_owned(),
    })
}

/// Parser bound to one run's delimiter and site filter
#[derive(Debug, Clone)]
pub struct LineParser {
    delimiter: Delimiter,
    filter: Option<SiteFilter>,
}

impl LineParser {
    pub fn new(delimiter: Delimiter, filter: Option<SiteFilter>) -> Self {
        Self { delimiter, filter }
    }

    #[inline]
    pub fn parse(&self, line: &str) -> Option<Record> {
        parse_line(line, self.delimiter, self.filter.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, identifier: &str, secret: &str) -> Record {
        Record {
            source: source.to_string(),
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        }
    }

    #[test]
    fn test_missing_delimiter() {
        assert_eq!(parse_line("noise-line-without-delimiter", Delimiter::Pipe, None), None);
        assert_eq!(parse_line("site.com:alice:pw", Delimiter::Pipe, None), None);
        assert_eq!(parse_line("", Delimiter::Colon, None), None);
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(parse_line("site.com|alice", Delimiter::Pipe, None), None);
        assert_eq!(parse_line("|", Delimiter::Pipe, None), None);
    }

    #[test]
    fn test_fields_are_trimmed() {
        assert_eq!(
            parse_line("  site.com | alice |  pw1 \r", Delimiter::Pipe, None),
            Some(record("site.com", "alice", "pw1"))
        );
    }

    #[test]
    fn test_extra_fields_ignored() {
        assert_eq!(
            parse_line("site.com:alice:pw1:tag:more", Delimiter::Colon, None),
            Some(record("site.com", "alice", "pw1"))
        );
    }

    #[test]
    fn test_empty_fields_still_parse() {
        assert_eq!(
            parse_line("||", Delimiter::Pipe, None),
            Some(record("", "", ""))
        );
    }

    #[test]
    fn test_naive_splitting() {
        // The scheme separator counts as a field boundary
        assert_eq!(
            parse_line("https://site.com:alice:pw1", Delimiter::Colon, None),
            Some(record("https", "//site.com", "alice"))
        );
        assert_eq!(
            parse_line("site.com|al|ice|pw1", Delimiter::Pipe, None),
            Some(record("site.com", "al", "ice"))
        );
    }

    #[test]
    fn test_site_filter() {
        let filter = SiteFilter::new("bank").unwrap();

        assert_eq!(
            parse_line("MyBank.com|alice|pw1", Delimiter::Pipe, Some(&filter)),
            Some(record("MyBank.com", "alice", "pw1"))
        );
        assert_eq!(parse_line("shop.com|bob|pw2", Delimiter::Pipe, Some(&filter)), None);
        // Only the source is matched against
        assert_eq!(parse_line("shop.com|bank|pw2", Delimiter::Pipe, Some(&filter)), None);
    }

    #[test]
    fn test_line_parser() {
        let parser = LineParser::new(Delimiter::Colon, SiteFilter::new("other"));

        assert_eq!(parser.parse("other.com:bob:pw2"), Some(record("other.com", "bob", "pw2")));
        assert_eq!(parser.parse("site.com:alice:pw1"), None);
    }
}

//! Command-line interface definition for combo-extract
//!
//! Provides argument parsing and validation for the extraction tool.

use crate::filter::SiteFilter;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// High-performance combo list extractor
///
/// Parse delimited `source|user|pass` lines, keep the first secret seen for
/// every user and optionally restrict the output to a single site.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "combo-extract",
    version,
    about = "High-performance combo list extractor",
    long_about = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                           COMBO-EXTRACT v1.0.0                               ║
║                   Parallel Combo List Parsing & Deduplication                ║
╚══════════════════════════════════════════════════════════════════════════════╝

Every line is split on the delimiter into SOURCE, USER and PASS. Lines with
fewer than three fields are skipped. The first PASS seen for a USER wins; all
later lines for that USER are dropped.

EXAMPLES:
    # Extract everything from two dumps (pipe delimited)
    combo-extract -i dump1.txt,dump2.txt

    # Colon delimited, only records whose source contains "bank"
    combo-extract -i dump.txt -d colon -s bank

    # Every .txt file in a directory tree, 8 worker threads
    combo-extract -i /dumps/ --recursive -t 8

OUTPUT:
    extracted_data.txt           - without --site
    <site>_extracted_data.txt    - with --site
"#
)]
pub struct Args {
    /// Input files or directories (repeat or separate with commas)
    #[arg(
        short,
        long = "input",
        required = true,
        value_name = "PATH",
        num_args = 1..,
        value_delimiter = ','
    )]
    pub inputs: Vec<PathBuf>,

    /// Field delimiter
    #[arg(short, long, value_enum, default_value_t = Delimiter::Pipe)]
    pub delimiter: Delimiter,

    /// Only keep records whose source contains this text (case-insensitive)
    #[arg(short, long, value_name = "SITE")]
    pub site: Option<String>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of worker threads (default: max(4, 2 x CPUs))
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Process directories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// File extensions to pick up from directories (default: txt)
    #[arg(long, value_name = "EXT", default_value = "txt")]
    pub extensions: String,

    /// How input bytes are decoded
    #[arg(long, value_enum, default_value_t = TextEncoding::Utf8)]
    pub encoding: TextEncoding,

    /// Buffer size for file operations (default: 8MB)
    #[arg(long, value_name = "SIZE", default_value = "8MB")]
    pub buffer_size: String,

    /// Lines handed to the worker pool per batch
    #[arg(long, value_name = "NUM", default_value_t = crate::extractor::DEFAULT_BATCH_LINES)]
    pub batch_lines: usize,

    /// Dry run - show what would be done without processing
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Literal separator between the fields of a combo line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Delimiter {
    /// `source|user|pass`
    #[value(name = "pipe", alias = "|")]
    Pipe,
    /// `source:user:pass`
    #[value(name = "colon", alias = ":")]
    Colon,
}

impl Delimiter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipe => "|",
            Self::Colon => ":",
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input decoding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TextEncoding {
    /// UTF-8, malformed sequences replaced with U+FFFD
    #[default]
    Utf8,
    /// Sniff BOM / guess the encoding per file and transcode to UTF-8
    Auto,
}

impl Args {
    /// Parse buffer size string to bytes
    pub fn parse_buffer_size(&self) -> anyhow::Result<usize> {
        parse_size(&self.buffer_size)
    }

    /// Get output directory, defaulting to current directory
    pub fn get_output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Parse file extensions to process
    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Site filter, `None` when absent or blank
    pub fn site_filter(&self) -> Option<SiteFilter> {
        self.site.as_deref().and_then(SiteFilter::new)
    }
}

/// Parse human-readable size string to bytes
fn parse_size(size_str: &str) -> anyhow::Result<usize> {
    let size_str = size_str.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(n) = size_str.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = size_str.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = size_str.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = size_str.strip_suffix('B') {
        (n, 1)
    } else {
        (size_str.as_str(), 1)
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size format: '{}'", size_str))?;

    if num == 0 {
        anyhow::bail!("Size must be greater than zero: '{}'", size_str);
    }

    Ok(num * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["combo-extract", "-i", "dump.txt"]).unwrap();

        assert_eq!(args.inputs, vec![PathBuf::from("dump.txt")]);
        assert_eq!(args.delimiter, Delimiter::Pipe);
        assert_eq!(args.encoding, TextEncoding::Utf8);
        assert!(args.site_filter().is_none());
        assert_eq!(args.get_output_dir(), PathBuf::from("."));
        assert_eq!(args.get_extensions(), vec!["txt"]);
    }

    #[test]
    fn test_comma_separated_inputs() {
        let args = Args::try_parse_from(["combo-extract", "-i", "a.txt,b.txt", "-i", "c.txt"]).unwrap();

        assert_eq!(
            args.inputs,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn test_delimiter_aliases() {
        let args = Args::try_parse_from(["combo-extract", "-i", "x", "-d", ":"]).unwrap();
        assert_eq!(args.delimiter, Delimiter::Colon);

        let args = Args::try_parse_from(["combo-extract", "-i", "x", "-d", "pipe"]).unwrap();
        assert_eq!(args.delimiter, Delimiter::Pipe);
        assert_eq!(args.delimiter.as_str(), "|");

        assert!(Args::try_parse_from(["combo-extract", "-i", "x", "-d", ";"]).is_err());
    }

    #[test]
    fn test_site_is_case_folded() {
        let args = Args::try_parse_from(["combo-extract", "-i", "x", "-s", "  MyBank "]).unwrap();
        assert_eq!(args.site_filter().unwrap().as_str(), "mybank");

        let args = Args::try_parse_from(["combo-extract", "-i", "x", "-s", "   "]).unwrap();
        assert!(args.site_filter().is_none());
    }

    #[test]
    fn test_extensions() {
        let args = Args::try_parse_from(["combo-extract", "-i", "x", "--extensions", "TXT, .csv,,log"]).unwrap();
        assert_eq!(args.get_extensions(), vec!["txt", "csv", "log"]);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64MB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("8gb").unwrap(), 8 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1024KB").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("0MB").is_err());
    }
}

//! # Combo Extract
//!
//! High-performance combo list extraction.
//!
//! ## Features
//!
//! - **Line parsing**: `source|user|pass` or `source:user:pass`, extra fields ignored
//! - **Site filtering**: keep only records whose source contains a text (case-insensitive)
//! - **Deduplication**: the first secret seen for a user wins, decided by input position
//! - **Parallel processing**: fixed-size worker pool fed by a streaming reader
//! - **Lenient decoding**: malformed bytes are replaced, optional encoding detection
//!
//! ## Usage
//!
//! ```bash
//! # Pipe delimited, no filter
//! combo-extract -i dump.txt
//!
//! # Colon delimited, only "bank" sources
//! combo-extract -i dump1.txt,dump2.txt -d colon -s bank
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use combo_extract::cli::Delimiter;
//! use combo_extract::extractor::{Extractor, RunConfig};
//! use std::path::PathBuf;
//!
//! let config = RunConfig::new(Delimiter::Pipe, vec![PathBuf::from("dump.txt")])
//!     .with_site("bank")
//!     .with_output_dir("./output");
//!
//! let report = Extractor::new(config).run().unwrap();
//! println!("{} accounts saved in {}s", report.matched, report.elapsed_secs());
//! ```

pub mod cli;
pub mod dedup;
pub mod encoding;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod output;
pub mod parser;
pub mod progress;

pub use cli::{Args, Delimiter};
pub use error::ExtractError;
pub use extractor::{Extraction, Extractor, RunConfig, RunReport};
pub use parser::{parse_line, Record};

//! Output management module
//!
//! Formats accepted records as text blocks and writes them to the output
//! artifact with buffering.

use crate::filter::SiteFilter;
use crate::parser::Record;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default buffer size for file writing (8MB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Artifact name without a site filter
pub const OUTPUT_FILE_NAME: &str = "extracted_data.txt";

/// Line closing every record block
pub const BLOCK_SEPARATOR: &str = "=========================";

/// Name of the output artifact for an optional site filter
pub fn output_file_name(site: Option<&SiteFilter>) -> String {
    match site {
        Some(site) => format!("{}_{}", site.as_str(), OUTPUT_FILE_NAME),
        None => OUTPUT_FILE_NAME.to_string(),
    }
}

/// Human-readable block for one record
pub fn format_block(record: &Record) -> String {
    format!(
        "{}\nUser: {}\nPass: {}\n{}\n",
        record.source, record.identifier, record.secret, BLOCK_SEPARATOR
    )
}

/// Buffered writer for record blocks
pub struct OutputWriter {
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl OutputWriter {
    /// Create (or truncate) the output file
    pub fn new(path: &Path, buffer_size: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let writer = BufWriter::with_capacity(buffer_size, file);

        Ok(Self {
            writer,
            bytes_written: 0,
        })
    }

    /// Write one record block
    pub fn write_record(&mut self, record: &Record) -> std::io::Result<()> {
        let block = format_block(record);
        self.writer.write_all(block.as_bytes())?;
        self.bytes_written += block.len() as u64;
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Get bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl Drop for OutputWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Write every record to `path`, replacing prior content. Returns bytes written.
pub fn write_records(path: &Path, records: &[Record], buffer_size: usize) -> std::io::Result<u64> {
    let mut writer = OutputWriter::new(path, buffer_size)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(writer.bytes_written())
}

/// Ensure output directory exists
pub fn ensure_output_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

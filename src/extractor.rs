//! Extraction coordinator
//!
//! Streams every input file, parses lines on a fixed-size worker pool and
//! admits parsed records through the dedup table.
//!
//! A reader thread feeds line batches over a bounded channel. Each batch is
//! parsed in parallel; the parsed batch keeps input order, so admission into
//! the table walks records in file order, then line order. "First secret
//! wins" therefore depends on input position only, never on which worker
//! finished first.

use crate::cli::{Args, Delimiter, TextEncoding};
use crate::dedup::{DedupStats, DedupTable};
use crate::encoding::{LineReader, DEFAULT_CHUNK_SIZE};
use crate::error::{ExtractError, Result};
use crate::filter::SiteFilter;
use crate::output::{self, DEFAULT_BUFFER_SIZE};
use crate::parser::{LineParser, Record};
use crate::progress::{create_bytes_progress_bar, create_spinner, format_duration, ProcessingStats};

use bytesize::ByteSize;

use crossbeam_channel::{bounded, Sender};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

/// Lines handed to the pool per batch
pub const DEFAULT_BATCH_LINES: usize = 16 * 1024;

/// Batches read ahead of the parser
const QUEUE_DEPTH: usize = 4;

/// Worker count used when none is configured: `max(4, 2 x logical CPUs)`
pub fn default_pool_size() -> usize {
    (num_cpus::get() * 2).max(4)
}

/// Immutable settings for one extraction run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub delimiter: Delimiter,
    pub site: Option<SiteFilter>,
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Worker count; `None` means [`default_pool_size`]
    pub threads: Option<usize>,
    pub encoding: TextEncoding,
    /// Read chunk and output buffer size in bytes
    pub buffer_size: usize,
    pub batch_lines: usize,
    pub show_progress: bool,
}

impl RunConfig {
    pub fn new(delimiter: Delimiter, inputs: Vec<PathBuf>) -> Self {
        Self {
            delimiter,
            site: None,
            inputs,
            output_dir: PathBuf::from("."),
            threads: None,
            encoding: TextEncoding::Utf8,
            buffer_size: DEFAULT_CHUNK_SIZE,
            batch_lines: DEFAULT_BATCH_LINES,
            show_progress: false,
        }
    }

    /// Restrict output to sources containing `site`; blank input clears the filter
    pub fn with_site(mut self, site: &str) -> Self {
        self.site = SiteFilter::new(site);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_batch_lines(mut self, batch_lines: usize) -> Self {
        self.batch_lines = batch_lines;
        self
    }

    /// Build a run configuration from command-line arguments.
    ///
    /// Directory arguments are expanded here; a path that does not exist
    /// fails with [`ExtractError::InputNotFound`] before anything is read.
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let inputs = collect_inputs(&args.inputs, args.recursive, &args.get_extensions())?;

        Ok(Self {
            delimiter: args.delimiter,
            site: args.site_filter(),
            inputs,
            output_dir: args.get_output_dir(),
            threads: args.threads,
            encoding: args.encoding,
            buffer_size: args.parse_buffer_size()?,
            batch_lines: args.batch_lines,
            show_progress: !args.quiet,
        })
    }

    /// Number of workers this run will use
    pub fn pool_size(&self) -> usize {
        self.threads.unwrap_or_else(default_pool_size)
    }

    /// Where the artifact for this configuration is written
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(output::output_file_name(self.site.as_ref()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(ExtractError::InvalidConfig("no input files".to_string()));
        }
        if self.threads == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.batch_lines == 0 {
            return Err(ExtractError::InvalidConfig(
                "batch size must be at least 1 line".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ExtractError::InvalidConfig(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand input arguments into the ordered list of files to read.
///
/// Files are taken as given. Directories contribute files whose extension is
/// in `extensions` (any file when `extensions` is empty), sorted by name.
/// Symlinks are followed; an entry that cannot be read, or a link loop,
/// fails with [`ExtractError::Io`].
pub fn collect_inputs(paths: &[PathBuf], recursive: bool, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let walker = WalkDir::new(path).follow_links(true);
            let walker = if recursive { walker } else { walker.max_depth(1) };

            for entry in walker.sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
                    ExtractError::io(at, io::Error::from(e))
                })?;
                if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(ExtractError::InputNotFound { path: path.clone() });
        }
    }

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records accepted (unique identifiers written)
    pub matched: u64,
    pub elapsed: Duration,
    pub output_path: PathBuf,
    pub files: u64,
    pub bytes_read: u64,
    pub lines_read: u64,
    /// Lines that parsed into a record (after the site filter)
    pub parsed: u64,
    /// Parsed records dropped because their identifier was already taken
    pub duplicates: u64,
    pub pool_size: usize,
}

impl RunReport {
    /// Elapsed wall time in seconds, two decimals
    pub fn elapsed_secs(&self) -> String {
        format!("{:.2}", self.elapsed.as_secs_f64())
    }

    pub fn lines_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.lines_read as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Accepted records plus the run summary, without an output artifact
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Accepted records in admission order
    pub records: Vec<Record>,
    /// `output_path` names where [`Extractor::run`] would write
    pub report: RunReport,
}

struct Batch {
    lines: Vec<String>,
    /// Bytes consumed from the file once this batch was complete
    bytes_read: u64,
}

/// Per-run admission state: the dedup table and everything it accepted
struct Admission<F> {
    table: DedupTable,
    accepted: Vec<Record>,
    on_accept: F,
}

impl<F: FnMut(&Record)> Admission<F> {
    fn admit(&mut self, parsed: Vec<Option<Record>>) {
        for record in parsed.into_iter().flatten() {
            if self.table.insert_first(&record.identifier, &record.secret) {
                log::trace!("accepted record from {}", record.source);
                (self.on_accept)(&record);
                self.accepted.push(record);
            }
        }
    }
}

/// Drives the parser over every input and produces the report
pub struct Extractor {
    config: RunConfig,
}

impl Extractor {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the full pipeline and write the output artifact
    pub fn run(&self) -> Result<RunReport> {
        self.run_with(|_| {})
    }

    /// Like [`run`](Self::run), calling `on_accept` for every accepted
    /// record in admission order
    pub fn run_with<F>(&self, on_accept: F) -> Result<RunReport>
    where
        F: FnMut(&Record),
    {
        let stats = ProcessingStats::new();
        let (records, table) = self.extract(&stats, on_accept)?;

        let output_path = self.config.output_path();
        let bytes = self.write_output(&output_path, &records)?;
        log::debug!("wrote {} bytes to {:?}", bytes, output_path);

        let report = self.report(&stats, table.stats(), output_path);
        log::info!(
            "Saved {} accounts in {}",
            report.matched,
            format_duration(report.elapsed)
        );
        Ok(report)
    }

    /// Run parsing and deduplication only, returning the accepted records
    pub fn collect(&self) -> Result<Extraction> {
        let stats = ProcessingStats::new();
        let (records, table) = self.extract(&stats, |_| {})?;
        let report = self.report(&stats, table.stats(), self.config.output_path());
        Ok(Extraction { records, report })
    }

    fn report(&self, stats: &ProcessingStats, dedup: &DedupStats, output_path: PathBuf) -> RunReport {
        RunReport {
            matched: dedup.get_unique(),
            elapsed: stats.elapsed(),
            output_path,
            files: stats.get_processed_files(),
            bytes_read: stats.get_processed_bytes(),
            lines_read: stats.get_total_lines(),
            parsed: dedup.get_total(),
            duplicates: dedup.get_duplicates(),
            pool_size: self.config.pool_size(),
        }
    }

    /// Returns the accepted records and the table that admitted them
    fn extract<F>(&self, stats: &ProcessingStats, on_accept: F) -> Result<(Vec<Record>, DedupTable)>
    where
        F: FnMut(&Record),
    {
        self.config.validate()?;

        let pool_size = self.config.pool_size();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_size)
            .thread_name(|i| format!("combo-worker-{}", i))
            .build()?;
        log::info!("Using {} worker threads", pool_size);

        for path in &self.config.inputs {
            let size = fs::metadata(path).map_err(|e| ExtractError::io(path, e))?.len();
            stats.add_file(size);
        }
        log::info!(
            "Found {} files ({})",
            stats.get_total_files(),
            ByteSize(stats.get_total_bytes())
        );

        let pb = if self.config.show_progress {
            create_bytes_progress_bar(stats.get_total_bytes(), "Processing...")
        } else {
            ProgressBar::hidden()
        };

        let parser = LineParser::new(self.config.delimiter, self.config.site.clone());
        let mut admission = Admission {
            table: DedupTable::new(),
            accepted: Vec::new(),
            on_accept,
        };

        for path in &self.config.inputs {
            log::debug!("processing {:?}", path);
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }

            let bytes = self.process_file(path, &pool, &parser, &mut admission, stats, &pb)?;
            stats.complete_file(bytes);
        }

        pb.finish_and_clear();
        Ok((admission.accepted, admission.table))
    }

    /// Stream one file through the pool. Returns bytes read.
    fn process_file<F>(
        &self,
        path: &Path,
        pool: &ThreadPool,
        parser: &LineParser,
        admission: &mut Admission<F>,
        stats: &ProcessingStats,
        pb: &ProgressBar,
    ) -> Result<u64>
    where
        F: FnMut(&Record),
    {
        let reader = LineReader::open(path, self.config.encoding, self.config.buffer_size)
            .map_err(|e| ExtractError::io(path, e))?;
        let batch_lines = self.config.batch_lines;
        let base = pb.position();
        let (tx, rx) = bounded(QUEUE_DEPTH);

        thread::scope(|scope| {
            scope.spawn(move || read_batches(path, reader, batch_lines, tx));

            let mut bytes_read = 0;
            // Dropping `rx` on an early return stops the reader
            for batch in rx {
                let batch: Batch = batch.map_err(|e| ExtractError::io(path, e))?;

                let parsed: Vec<Option<Record>> =
                    pool.install(|| batch.lines.par_iter().map(|line| parser.parse(line)).collect());

                stats.add_lines(batch.lines.len() as u64);
                admission.admit(parsed);

                bytes_read = batch.bytes_read;
                pb.set_position(base + bytes_read);
            }

            Ok(bytes_read)
        })
    }

    fn write_output(&self, path: &Path, records: &[Record]) -> Result<u64> {
        output::ensure_output_dir(&self.config.output_dir)
            .map_err(|e| ExtractError::output(&self.config.output_dir, e))?;

        let spinner = if self.config.show_progress {
            create_spinner("Writing output...")
        } else {
            ProgressBar::hidden()
        };

        let buffer_size = self.config.buffer_size.min(DEFAULT_BUFFER_SIZE);
        let result = output::write_records(path, records, buffer_size).map_err(|e| ExtractError::output(path, e));
        spinner.finish_and_clear();
        result
    }
}

fn read_batches<R: Read>(
    path: &Path,
    mut reader: LineReader<R>,
    batch_lines: usize,
    tx: Sender<io::Result<Batch>>,
) {
    let mut lines = Vec::with_capacity(batch_lines);

    loop {
        match reader.next() {
            Some(Ok(line)) => {
                lines.push(line);
                if lines.len() >= batch_lines {
                    let batch = Batch {
                        lines: std::mem::replace(&mut lines, Vec::with_capacity(batch_lines)),
                        bytes_read: reader.bytes_read(),
                    };
                    if tx.send(Ok(batch)).is_err() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                let _ = tx.send(Err(e));
                return;
            }
            None => break,
        }
    }

    if reader.had_malformed() {
        log::warn!("{:?}: malformed byte sequences were replaced", path);
    }

    let _ = tx.send(Ok(Batch {
        lines,
        bytes_read: reader.bytes_read(),
    }));
}

//! Progress display module
//!
//! Styled console output, progress bars and run statistics.

use crate::extractor::RunReport;
use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                                                                              ║
║    ██████╗ ██████╗ ███╗   ███╗██████╗  ██████╗                               ║
║   ██╔════╝██╔═══██╗████╗ ████║██╔══██╗██╔═══██╗                              ║
║   ██║     ██║   ██║██╔████╔██║██████╔╝██║   ██║                              ║
║   ██║     ██║   ██║██║╚██╔╝██║██╔══██╗██║   ██║                              ║
║   ╚██████╗╚██████╔╝██║ ╚═╝ ██║██████╔╝╚██████╔╝                              ║
║    ╚═════╝ ╚═════╝ ╚═╝     ╚═╝╚═════╝  ╚═════╝                               ║
║                                                                              ║
║                 Parallel Combo List Parsing & Deduplication                  ║
║                                                              v1.0.0          ║
╚══════════════════════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.blue());
}

/// Print a section title, underlined
pub fn section(title: &str) {
    println!("\n{}\n{}", title.bold(), "─".repeat(title.chars().count()).dimmed());
}

/// Kind of an indented console status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A `key: value` style setting or fact
    Note,
    /// One entry of a listing
    Item,
    Done,
    Warn,
    /// Goes to stderr
    Fail,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Status::Note => "-",
            Status::Item => "*",
            Status::Done => "ok",
            Status::Warn => "!!",
            Status::Fail => "error:",
        }
    }
}

/// Render a status line without printing it
pub fn format_status(kind: Status, text: &str) -> String {
    let marker = kind.marker();
    match kind {
        Status::Note | Status::Item => format!("  {} {}", marker.dimmed(), text),
        Status::Done => format!("  {} {}", marker.green().bold(), text),
        Status::Warn => format!("  {} {}", marker.yellow().bold(), text.yellow()),
        Status::Fail => format!("{} {}", marker.red().bold(), text),
    }
}

pub fn status(kind: Status, text: &str) {
    let line = format_status(kind, text);
    if kind == Status::Fail {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// Create a styled spinner for indeterminate progress
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Create a bytes-based progress bar
pub fn create_bytes_progress_bar(total_bytes: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// File, byte and line counters for one extraction run. Record counts live
/// in [`DedupStats`](crate::dedup::DedupStats).
#[derive(Debug)]
pub struct ProcessingStats {
    pub total_files: AtomicU64,
    pub processed_files: AtomicU64,
    pub total_bytes: AtomicU64,
    pub processed_bytes: AtomicU64,
    pub total_lines: AtomicU64,
    pub start_time: Instant,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            total_files: AtomicU64::new(0),
            processed_files: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            processed_bytes: AtomicU64::new(0),
            total_lines: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn add_file(&self, size: u64) {
        self.total_files.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(size, Ordering::Relaxed);
    }

    pub fn complete_file(&self, bytes: u64) {
        self.processed_files.fetch_add(1, Ordering::Relaxed);
        self.processed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_lines(&self, count: u64) {
        self.total_lines.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_total_files(&self) -> u64 {
        self.total_files.load(Ordering::Relaxed)
    }

    pub fn get_processed_files(&self) -> u64 {
        self.processed_files.load(Ordering::Relaxed)
    }

    pub fn get_total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn get_processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    pub fn get_total_lines(&self) -> u64 {
        self.total_lines.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Print final statistics for a finished run
pub fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "═".repeat(60).green());
    println!("{}", "                    PROCESSING COMPLETE".green().bold());
    println!("{}", "═".repeat(60).green());
    println!();

    println!("  {} {}", "Files processed:".green(), report.files);
    println!("  {} {}", "Data processed: ".green(), ByteSize(report.bytes_read));
    println!();

    println!("  {} {}", "Total lines:    ".green(), format_number(report.lines_read));
    println!("  {} {}", "Parsed combos:  ".green(), format_number(report.parsed));
    println!("  {} {}", "Duplicates:     ".yellow(), format_number(report.duplicates));
    println!(
        "  {} {}",
        "Accounts saved: ".green().bold(),
        format_number(report.matched).green().bold()
    );

    println!();
    println!("  {} {} seconds", "Time taken:     ".green(), report.elapsed_secs());
    println!("  {} {:.2} lines/sec", "Throughput:     ".green(), report.lines_per_second());
    println!("  {} {}", "Results saved in".green(), report.output_path.display());
    println!();
    println!("{}", "═".repeat(60).green());
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_stats() {
        let stats = ProcessingStats::new();

        stats.add_file(100);
        stats.add_file(20);
        stats.add_lines(10);
        stats.complete_file(100);

        assert_eq!(stats.get_total_files(), 2);
        assert_eq!(stats.get_processed_files(), 1);
        assert_eq!(stats.get_total_bytes(), 120);
        assert_eq!(stats.get_processed_bytes(), 100);
        assert_eq!(stats.get_total_lines(), 10);
    }

    #[test]
    fn test_format_status() {
        colored::control::set_override(false);

        assert_eq!(format_status(Status::Note, "Threads: 4"), "  - Threads: 4");
        assert_eq!(format_status(Status::Item, "a.txt"), "  * a.txt");
        assert_eq!(format_status(Status::Fail, "boom"), "error: boom");
    }
}

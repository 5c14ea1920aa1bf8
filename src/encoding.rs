//! Encoding detection and lenient line decoding
//!
//! Input files are streamed in fixed-size chunks and decoded to UTF-8 with
//! `encoding_rs`. Malformed byte sequences are replaced with U+FFFD instead
//! of failing the read.

use crate::cli::TextEncoding;
use chardetng::EncodingDetector;
use encoding_rs::{CoderResult, Decoder, Encoding};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default read chunk size (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Bytes sampled for encoding detection
const DETECTION_SAMPLE: usize = 64 * 1024;

/// Result of encoding detection
#[derive(Debug, Clone)]
pub struct EncodingInfo {
    /// Detected encoding name
    pub name: &'static str,
    /// Confidence level (0.0 - 1.0)
    pub confidence: f32,
    /// The encoding_rs Encoding reference
    pub encoding: &'static Encoding,
}

impl Default for EncodingInfo {
    fn default() -> Self {
        Self {
            name: "UTF-8",
            confidence: 1.0,
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// Detect the encoding of a file by sampling its content
pub fn detect_encoding(path: &Path) -> io::Result<EncodingInfo> {
    let file = File::open(path)?;
    let mut sample = Vec::with_capacity(DETECTION_SAMPLE);
    file.take(DETECTION_SAMPLE as u64).read_to_end(&mut sample)?;

    Ok(detect_sample(&sample))
}

fn detect_sample(sample: &[u8]) -> EncodingInfo {
    if sample.is_empty() {
        return EncodingInfo::default();
    }

    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        return EncodingInfo {
            name: encoding.name(),
            confidence: 1.0,
            encoding,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let encoding = detector.guess(None, true);

    let confidence = if encoding == encoding_rs::UTF_8 {
        if std::str::from_utf8(sample).is_ok() {
            1.0
        } else {
            0.5
        }
    } else {
        0.8
    };

    EncodingInfo {
        name: encoding.name(),
        confidence,
        encoding,
    }
}

/// Streaming line iterator that decodes leniently.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`. The final line does not need a
/// terminating newline.
pub struct LineReader<R: Read> {
    inner: R,
    decoder: Decoder,
    chunk: Vec<u8>,
    pending: String,
    cursor: usize,
    bytes_read: u64,
    malformed: bool,
    eof: bool,
}

impl LineReader<File> {
    /// Open `path` for reading in the given decoding mode
    pub fn open(path: &Path, mode: TextEncoding, chunk_size: usize) -> io::Result<Self> {
        let encoding = match mode {
            TextEncoding::Utf8 => encoding_rs::UTF_8,
            TextEncoding::Auto => {
                let info = detect_encoding(path)?;
                log::debug!(
                    "{:?}: detected {} (confidence {:.1})",
                    path,
                    info.name,
                    info.confidence
                );
                info.encoding
            }
        };

        let file = File::open(path)?;
        Ok(Self::with_encoding(file, encoding, chunk_size))
    }
}

impl<R: Read> LineReader<R> {
    /// Wrap a reader; a BOM matching `encoding` (or any Unicode BOM) is
    /// stripped from the start of the stream.
    pub fn with_encoding(inner: R, encoding: &'static Encoding, chunk_size: usize) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder(),
            chunk: vec![0u8; chunk_size.max(1)],
            pending: String::new(),
            cursor: 0,
            bytes_read: 0,
            malformed: false,
            eof: false,
        }
    }

    /// Raw bytes consumed from the underlying reader so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether any malformed sequence has been replaced so far
    pub fn had_malformed(&self) -> bool {
        self.malformed
    }

    /// Read and decode the next chunk into `pending`
    fn fill(&mut self) -> io::Result<()> {
        // Drop already-returned lines once per chunk rather than once per line
        if self.cursor > 0 {
            self.pending.drain(..self.cursor);
            self.cursor = 0;
        }

        let len = loop {
            match self.inner.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        self.bytes_read += len as u64;
        let last = len == 0;
        if last {
            self.eof = true;
        }

        let mut src = &self.chunk[..len];
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 3 + 16);
            self.pending.reserve(needed);

            let (result, read, had_errors) = self.decoder.decode_to_string(src, &mut self.pending, last);
            self.malformed |= had_errors;
            src = &src[read..];

            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }

        Ok(())
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.pending[self.cursor..];
            let bytes = rest.as_bytes();

            if let Some(pos) = bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
                let width = match (bytes[pos], bytes.get(pos + 1)) {
                    (b'\r', Some(b'\n')) => Some(2),
                    // A trailing `\r` may be the first half of a `\r\n`
                    (b'\r', None) if !self.eof => None,
                    _ => Some(1),
                };

                if let Some(width) = width {
                    let line = rest[..pos].to_owned();
                    self.cursor += pos + width;
                    return Some(Ok(line));
                }
            } else if self.eof {
                if rest.is_empty() {
                    return None;
                }
                let line = rest.to_owned();
                self.cursor = self.pending.len();
                return Some(Ok(line));
            }

            if let Err(e) = self.fill() {
                // Report once, then stop
                self.eof = true;
                self.pending.clear();
                self.cursor = 0;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn lines_of(bytes: &[u8], chunk_size: usize) -> Vec<String> {
        LineReader::with_encoding(Cursor::new(bytes.to_vec()), encoding_rs::UTF_8, chunk_size)
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_utf8_detection() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "site.com|alice|pw1").unwrap();
        writeln!(file, "сайт.рф|борис|пароль").unwrap();

        let info = detect_encoding(file.path()).unwrap();
        assert_eq!(info.name, "UTF-8");
    }

    #[test]
    fn test_bom_detection() {
        let info = detect_sample(&[0xFF, 0xFE, b'a', 0]);
        assert_eq!(info.encoding, encoding_rs::UTF_16LE);
        assert_eq!(info.confidence, 1.0);
    }

    #[test]
    fn test_line_endings() {
        let lines = lines_of(b"line1\r\nline2\nline3", 64);
        assert_eq!(lines, vec!["line1", "line2", "line3"]);
    }

    #[test]
    fn test_cr_only_line_endings() {
        let lines = lines_of(b"a.com|u1|p1\rb.com|u2|p2\r", 64);
        assert_eq!(lines, vec!["a.com|u1|p1", "b.com|u2|p2"]);

        let lines = lines_of(b"a\rb\r\nc\nd\r\re", 64);
        assert_eq!(lines, vec!["a", "b", "c", "d", "", "e"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        // With 2-byte chunks the `\r` and `\n` of every terminator arrive separately
        let lines = lines_of(b"a\r\nbc\r\nd", 2);
        assert_eq!(lines, vec!["a", "bc", "d"]);

        let lines = lines_of(b"a\r\nb\r\n", 1);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let lines = lines_of(b"a\n\nb\n", 64);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_malformed_bytes_replaced() {
        let mut reader =
            LineReader::with_encoding(Cursor::new(b"ok\nbad\xFF\xFEline\nend\n".to_vec()), encoding_rs::UTF_8, 64);

        assert_eq!(reader.next().unwrap().unwrap(), "ok");
        assert_eq!(reader.next().unwrap().unwrap(), "bad\u{FFFD}\u{FFFD}line");
        assert_eq!(reader.next().unwrap().unwrap(), "end");
        assert!(reader.next().is_none());
        assert!(reader.had_malformed());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "é|ü|ß\nnext|line|here\n";
        let lines = lines_of(text.as_bytes(), 16);
        assert_eq!(lines, vec!["é|ü|ß", "next|line|here"]);

        // Smaller than any line: every char boundary lands mid-chunk
        let mut reader = LineReader::with_encoding(Cursor::new(text.as_bytes().to_vec()), encoding_rs::UTF_8, 1);
        assert_eq!(reader.next().unwrap().unwrap(), "é|ü|ß");
        assert!(!reader.had_malformed());
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let lines = lines_of(b"\xEF\xBB\xBFsite|user|pass\n", 64);
        assert_eq!(lines, vec!["site|user|pass"]);
    }

    #[test]
    fn test_bytes_read() {
        let data = b"a|b|c\nd|e|f\n";
        let mut reader = LineReader::with_encoding(Cursor::new(data.to_vec()), encoding_rs::UTF_8, 64);
        while reader.next().is_some() {}
        assert_eq!(reader.bytes_read(), data.len() as u64);
    }

    #[test]
    fn test_auto_mode_transcodes_utf16() {
        let mut file = NamedTempFile::new().unwrap();
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "bank.com|alice|pw1\r\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        file.write_all(&bytes).unwrap();

        let lines: Vec<String> = LineReader::open(file.path(), TextEncoding::Auto, 64)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(lines, vec!["bank.com|alice|pw1"]);
    }

    #[test]
    fn test_read_error_reported_once() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let mut reader = LineReader::with_encoding(Failing, encoding_rs::UTF_8, 64);
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}

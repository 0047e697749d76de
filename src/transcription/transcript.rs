//! Transcript formatting and the plain-text output file.

use std::io;
use std::path::{Path, PathBuf};

use crate::transcription::engine::Segment;

const SEPARATOR_WIDTH: usize = 60;

/// Format a timestamp as zero-padded `HH:MM:SS`.
///
/// Sub-second remainders are truncated, not rounded. Hours are unbounded
/// (no 24h wraparound).
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Format one segment as a transcript display line.
///
/// Leading/trailing whitespace is trimmed from the segment text.
pub fn format_segment_line(segment: &Segment) -> String {
    format!(
        "[{} -> {}]  {}",
        format_timestamp(segment.start_secs),
        format_timestamp(segment.end_secs),
        segment.text.trim()
    )
}

/// The output path for an input file: same location, extension replaced by `.txt`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("txt")
}

/// A complete transcript: header metadata plus formatted segment lines.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Source audio file name (not the full path)
    pub source_name: String,
    /// Language code reported by the engine
    pub language: String,
    /// Total audio duration in seconds
    pub duration_secs: f64,
    /// Formatted segment lines, in time order
    pub lines: Vec<String>,
}

impl Transcript {
    pub fn new(source_name: String, language: String, duration_secs: f64) -> Self {
        Self {
            source_name,
            language,
            duration_secs,
            lines: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Render the full file contents: header block, separator, segment lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Transcriptie: {}\n", self.source_name));
        out.push_str(&format!("Taal: {}\n", self.language));
        out.push_str(&format!("Duur: {}\n", format_timestamp(self.duration_secs)));
        out.push_str(&"=".repeat(SEPARATOR_WIDTH));
        out.push_str("\n\n");
        out.push_str(&self.lines.join("\n"));
        out
    }

    /// Write the transcript, creating or fully truncating the target file.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.render())
    }
}

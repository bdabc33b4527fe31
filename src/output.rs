use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Machine-readable output: pretty JSON on stdout, no progress rendering.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Single-line stderr counter for interactive runs.
pub struct TextProgress;

impl TextProgress {
    pub fn finish(&self, result: &RunResult) {
        eprintln!();
        eprintln!(
            "artists: {}  albums: {}  fetched: {}  skipped: {}  failed: {}",
            result.artists,
            result.albums,
            result.fetched,
            result.skipped,
            result.failed.len()
        );
        for failure in &result.failed {
            eprintln!(
                "could not retrieve {} by {}: {}",
                failure.name, failure.artist, failure.reason
            );
        }
    }
}

impl ProgressSink for TextProgress {
    fn event(&self, event: ProgressEvent) {
        let mut line = match event.total {
            Some(total) => format!("{} {}/{total}", event.stage, event.processed),
            None => format!("{} {}", event.stage, event.processed),
        };
        if let Some(label) = &event.label {
            line.push(' ');
            line.push_str(label);
        }
        eprint!("\r\x1b[2K{line}");
        let _ = io::stderr().flush();
    }
}

//! Buffered report sink for a single autofix call.

use tracing::info;

/// Collects autofix report lines for one record.
///
/// Lines are held back until the sink drops, then logged as one block under
/// the header, so a record's repairs always appear together with its outcome.
/// Nothing is logged when no line was pushed.
#[derive(Debug)]
pub struct ReportSink {
    header: String,
    lines: Vec<String>,
}

impl ReportSink {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Drop for ReportSink {
    fn drop(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        info!("{}", self.header);
        for line in &self.lines {
            info!("  {}", line);
        }
    }
}

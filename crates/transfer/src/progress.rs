use std::fmt::Display;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

/// Append-only, line-oriented progress output shared by all upload tasks.
///
/// Every write takes the inner lock for the whole line, so concurrent
/// tasks never interleave partial lines. Cloning is cheap and clones
/// share the same writer.
#[derive(Clone)]
pub struct ProgressSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ProgressSink {
    /// Wraps an arbitrary writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Progress on standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Discards everything (`--silent`).
    pub fn discard() -> Self {
        Self::new(std::io::sink())
    }

    /// Writes `msg` followed by a newline.
    pub fn line(&self, msg: impl Display) {
        self.write_bytes(format!("{msg}\n").as_bytes());
    }

    /// Writes raw bytes, e.g. a response body forwarded from the store.
    pub fn raw(&self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }

    fn write_bytes(&self, bytes: &[u8]) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Progress output is best effort; a closed stdout must not fail the run.
        if let Err(e) = writer.write_all(bytes).and_then(|()| writer.flush()) {
            warn!(error = %e, "failed to write progress output");
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// In-memory writer for capturing progress output.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buf = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Written output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_newline_terminated() {
        let buf = MemoryBuffer::new();
        let sink = ProgressSink::new(buf.clone());

        sink.line("first");
        sink.line(format_args!("{} Files", 2));

        assert_eq!(buf.contents(), "first\n2 Files\n");
    }

    #[test]
    fn raw_bytes_forwarded_verbatim() {
        let buf = MemoryBuffer::new();
        let sink = ProgressSink::new(buf.clone());

        sink.raw(b"<Error/>");
        sink.line("done");

        assert_eq!(buf.lines(), vec!["<Error/>done".to_string()]);
    }

    #[test]
    fn concurrent_lines_do_not_interleave() {
        let buf = MemoryBuffer::new();
        let sink = ProgressSink::new(buf.clone());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        sink.line(format_args!("thread-{t}-line-{i}-{}", "x".repeat(64)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let lines = buf.lines();
        assert_eq!(lines.len(), 400);
        for line in lines {
            assert!(line.starts_with("thread-"), "corrupted line: {line}");
            assert!(line.ends_with(&"x".repeat(64)), "corrupted line: {line}");
        }
    }

    #[test]
    fn discard_accepts_writes() {
        let sink = ProgressSink::discard();
        sink.line("ignored");
    }
}

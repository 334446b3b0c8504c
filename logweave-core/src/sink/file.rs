use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::Sink;
use crate::error::{IoResultExt, LogweaveResult, SinkError};
use crate::event::LogEvent;
use crate::format::Formatter;

/// Appends formatted events to a file, creating parent directories.
pub struct FileSink {
    path: PathBuf,
    formatter: Arc<dyn Formatter>,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn open(
        path: impl AsRef<Path>,
        formatter: Arc<dyn Formatter>,
        append: bool,
    ) -> LogweaveResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .with_path(&path)?;
        Ok(Self {
            path,
            formatter,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        let line = self.formatter.format_to_string(event);
        // A writer that panicked mid-write poisons the lock; keep using it.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "File"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "final flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputTemplate;
    use crate::level::Level;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_path(name: &str) -> PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("logweave_file_sink_{}_{}", std::process::id(), id))
            .join(name)
    }

    #[test]
    fn test_append_and_truncate() {
        let path = temp_path("logs/app.log");
        let formatter: Arc<dyn Formatter> = Arc::new(OutputTemplate::parse("{Message}{NewLine}"));

        {
            let sink = FileSink::open(&path, Arc::clone(&formatter), true).unwrap();
            sink.emit(&LogEvent::from_template(Level::Information, "one", vec![]))
                .unwrap();
        }
        {
            let sink = FileSink::open(&path, Arc::clone(&formatter), true).unwrap();
            sink.emit(&LogEvent::from_template(Level::Information, "two", vec![]))
                .unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        {
            let sink = FileSink::open(&path, formatter, false).unwrap();
            sink.emit(&LogEvent::from_template(Level::Information, "fresh", vec![]))
                .unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");

        if let Some(root) = path.parent().and_then(Path::parent) {
            let _ = fs::remove_dir_all(root);
        }
    }
}

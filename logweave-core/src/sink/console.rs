use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use super::Sink;
use crate::error::SinkError;
use crate::event::LogEvent;
use crate::format::Formatter;

/// Writes formatted events to stdout, stderr or any injected writer.
///
/// Each event is formatted outside the lock and written with one
/// `write_all`, so lines from concurrent emitters never interleave.
pub struct ConsoleSink {
    formatter: Arc<dyn Formatter>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout(formatter: Arc<dyn Formatter>) -> Self {
        Self::with_writer(formatter, Box::new(io::stdout()))
    }

    pub fn stderr(formatter: Arc<dyn Formatter>) -> Self {
        Self::with_writer(formatter, Box::new(io::stderr()))
    }

    pub fn with_writer(formatter: Arc<dyn Formatter>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            formatter,
            writer: Mutex::new(writer),
        }
    }
}

impl Sink for ConsoleSink {
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
        "Console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputTemplate;
    use crate::level::Level;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_formatted_lines() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(
            Arc::new(OutputTemplate::parse("{Level:u3} {Message}{NewLine}")),
            Box::new(buf.clone()),
        );
        sink.emit(&LogEvent::from_template(Level::Error, "first", vec![]))
            .unwrap();
        sink.emit(&LogEvent::from_template(Level::Debug, "second", vec![]))
            .unwrap();
        sink.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "ERR first\nDBG second\n");
    }

    #[test]
    fn test_keeps_writing_after_writer_panic() {
        struct PanicsOnce {
            buf: SharedBuf,
            panicked: bool,
        }

        impl Write for PanicsOnce {
            fn write(&mut self, data: &[u8]) -> io::Result<usize> {
                if !self.panicked {
                    self.panicked = true;
                    panic!("writer exploded");
                }
                self.buf.write(data)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let buf = SharedBuf::default();
        let sink = Arc::new(ConsoleSink::with_writer(
            Arc::new(OutputTemplate::parse("{Message}{NewLine}")),
            Box::new(PanicsOnce {
                buf: buf.clone(),
                panicked: false,
            }),
        ));

        let first = Arc::clone(&sink);
        let outcome = std::thread::spawn(move || {
            first.emit(&LogEvent::from_template(Level::Information, "lost", vec![]))
        })
        .join();
        assert!(outcome.is_err(), "first write should panic");

        sink.emit(&LogEvent::from_template(Level::Information, "kept", vec![]))
            .unwrap();
        sink.flush().unwrap();
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "kept\n");
    }
}

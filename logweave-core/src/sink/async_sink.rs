//! Background-thread wrapper with a bounded queue.
//!
//! Overflow policy: when the queue is full the event is dropped and counted
//! (default), or, with `block_when_full`, the emitter waits for space.
//! Dropping the sink drains the queue and joins the worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::{Sink, SinkRouter};
use crate::error::{LogweaveError, LogweaveResult, SinkError};
use crate::event::LogEvent;

pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

enum Message {
    Event(Box<LogEvent>),
    Flush(SyncSender<()>),
}

pub struct AsyncSink {
    sender: Option<SyncSender<Message>>,
    worker: Option<JoinHandle<()>>,
    inner: Arc<SinkRouter>,
    block_when_full: bool,
    dropped: AtomicU64,
}

impl AsyncSink {
    /// Spawn the worker that feeds `inner`.
    pub fn new(inner: SinkRouter, buffer_size: usize, block_when_full: bool) -> LogweaveResult<Self> {
        let (sender, receiver) = mpsc::sync_channel(buffer_size.max(1));
        let inner = Arc::new(inner);
        let shared = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("logweave-async".into())
            .spawn(move || run_worker(receiver, shared))
            .map_err(|e| LogweaveError::internal(format!("could not spawn async sink worker: {}", e)))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            inner,
            block_when_full,
            dropped: AtomicU64::new(0),
        })
    }

    /// Events discarded because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn run_worker(receiver: Receiver<Message>, inner: Arc<SinkRouter>) {
    for message in receiver {
        match message {
            Message::Event(event) => inner.dispatch(&event),
            Message::Flush(ack) => {
                inner.flush();
                let _ = ack.send(());
            }
        }
    }
    inner.flush();
    debug!("async sink worker stopped");
}

impl Sink for AsyncSink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        let sender = self.sender.as_ref().ok_or(SinkError::Closed)?;
        let message = Message::Event(Box::new(event.clone()));

        if self.block_when_full {
            return sender.send(message).map_err(|_| SinkError::Closed);
        }
        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 1000 == 0 {
                    warn!(dropped, "async sink queue full; event dropped");
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(SinkError::Closed),
        }
    }

    /// Waits until everything queued so far has been written and flushed.
    fn flush(&self) -> Result<(), SinkError> {
        let sender = self.sender.as_ref().ok_or(SinkError::Closed)?;
        let (ack, done) = mpsc::sync_channel(1);
        sender
            .send(Message::Flush(ack))
            .map_err(|_| SinkError::Closed)?;
        done.recv().map_err(|_| SinkError::Closed)
    }

    fn name(&self) -> &str {
        "Async"
    }

    fn inner(&self) -> Option<&SinkRouter> {
        Some(&self.inner)
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("async sink worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Level, LevelGate};
    use crate::sink::MemorySink;
    use std::sync::{Condvar, Mutex};

    fn event(n: usize) -> LogEvent {
        LogEvent::from_template(Level::Information, "event {n}", vec![n.into()])
    }

    /// Blocks every emit until released.
    struct Gate {
        open: Mutex<bool>,
        cv: Condvar,
        memory: MemorySink,
    }

    impl Sink for Gate {
        fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cv.wait(open).unwrap();
            }
            self.memory.emit(event)
        }
    }

    #[test]
    fn test_drain_on_drop() {
        let memory = MemorySink::new();
        let inner = SinkRouter::new().with(Arc::new(memory.clone()), LevelGate::default());
        {
            let sink = AsyncSink::new(inner, 100, false).unwrap();
            for n in 0..50 {
                sink.emit(&event(n)).unwrap();
            }
        }
        assert_eq!(memory.len(), 50);
    }

    #[test]
    fn test_flush_waits_for_worker() {
        let memory = MemorySink::new();
        let inner = SinkRouter::new().with(Arc::new(memory.clone()), LevelGate::default());
        let sink = AsyncSink::new(inner, 100, true).unwrap();
        for n in 0..10 {
            sink.emit(&event(n)).unwrap();
        }
        sink.flush().unwrap();
        assert_eq!(memory.len(), 10);
    }

    #[test]
    fn test_drop_and_count_when_full() {
        let gate = Arc::new(Gate {
            open: Mutex::new(false),
            cv: Condvar::new(),
            memory: MemorySink::new(),
        });
        let inner = SinkRouter::new().with(Arc::clone(&gate) as Arc<dyn Sink>, LevelGate::default());
        let sink = AsyncSink::new(inner, 2, false).unwrap();

        // One event can be held by the blocked worker, two more fit the queue.
        for n in 0..20 {
            sink.emit(&event(n)).unwrap();
        }
        let dropped = sink.dropped_count();
        assert!(dropped >= 17, "expected at least 17 drops, got {}", dropped);

        *gate.open.lock().unwrap() = true;
        gate.cv.notify_all();
        drop(sink);
        assert_eq!(gate.memory.len() as u64 + dropped, 20);
    }
}

//! Enrichers that read process and thread identity.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tracing::debug;

use super::Enricher;
use crate::event::LogEvent;

pub const THREAD_ID_PROPERTY: &str = "ThreadId";
pub const THREAD_NAME_PROPERTY: &str = "ThreadName";
pub const MACHINE_NAME_PROPERTY: &str = "MachineName";

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Small, stable per-thread number assigned on first use.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadIdEnricher;

impl Enricher for ThreadIdEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        event.add_or_update_property(THREAD_ID_PROPERTY, current_thread_id());
    }
}

/// Adds `ThreadName` when the current thread has one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadNameEnricher;

impl Enricher for ThreadNameEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        if let Some(name) = std::thread::current().name() {
            event.add_or_update_property(THREAD_NAME_PROPERTY, name);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MachineNameEnricher {
    name: String,
}

impl MachineNameEnricher {
    pub fn new() -> Self {
        Self {
            name: machine_name().to_string(),
        }
    }
}

impl Default for MachineNameEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for MachineNameEnricher {
    fn enrich(&self, event: &mut LogEvent) {
        event.add_or_update_property(MACHINE_NAME_PROPERTY, self.name.as_str());
    }
}

/// Machine name, resolved once per process.
///
/// Tries `HOSTNAME`, then `COMPUTERNAME`, then `/etc/hostname`, and falls
/// back to `"unknown"`.
pub fn machine_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(resolve_machine_name)
}

fn resolve_machine_name() -> String {
    for var in ["HOSTNAME", "COMPUTERNAME"] {
        if let Ok(name) = env::var(var) {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
    }

    match std::fs::read_to_string("/etc/hostname") {
        Ok(contents) if !contents.trim().is_empty() => return contents.trim().to_string(),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "could not read /etc/hostname"),
    }

    debug!("could not determine machine name, using 'unknown'");
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn event() -> LogEvent {
        LogEvent::from_template(Level::Information, "x", vec![])
    }

    #[test]
    fn test_thread_ids_are_stable_and_distinct() {
        let here = current_thread_id();
        assert_eq!(here, current_thread_id());
        let there = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_thread_name_only_when_named() {
        let named = std::thread::Builder::new()
            .name("worker-1".into())
            .spawn(|| {
                let mut e = event();
                ThreadNameEnricher.enrich(&mut e);
                e.property(THREAD_NAME_PROPERTY).cloned()
            })
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(named.and_then(|v| v.as_str().map(String::from)), Some("worker-1".into()));

        let unnamed = std::thread::spawn(|| {
            let mut e = event();
            ThreadNameEnricher.enrich(&mut e);
            e.property(THREAD_NAME_PROPERTY).is_some()
        })
        .join()
        .unwrap();
        assert!(!unnamed);
    }

    #[test]
    fn test_machine_name_not_empty() {
        let mut e = event();
        MachineNameEnricher::new().enrich(&mut e);
        let name = e.property(MACHINE_NAME_PROPERTY).and_then(|v| v.as_str()).unwrap();
        assert!(!name.is_empty());
    }
}

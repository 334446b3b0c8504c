//! Severity levels, shared level switches and level gates.
//!
//! A [`LevelSwitch`] is a reference-counted atomic cell. Cloning a switch
//! shares the cell, so every logger, sink or filter holding a clone observes
//! updates immediately. Concurrent `set` calls are last-writer-wins; reads
//! never tear because the level is stored as a single byte.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LogweaveError;

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    Verbose = 0,
    Debug = 1,
    #[default]
    Information = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    /// All levels in ascending severity.
    pub const ALL: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    /// Full level name, e.g. `Information`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// Three-letter moniker, e.g. `INF`.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Verbose => "VRB",
            Self::Debug => "DBG",
            Self::Information => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Verbose,
            1 => Self::Debug,
            2 => Self::Information,
            3 => Self::Warning,
            4 => Self::Error,
            _ => Self::Fatal,
        }
    }

    /// Render with an output-template format specifier.
    ///
    /// `u3` → `INF`, `w3` → `inf`, `u` → `INFORMATION`, `w` → `information`,
    /// `t` → `Information`, `t2` → `In`. Widths 1 and 2 cut the short moniker.
    /// Unknown specifiers fall back to the full name.
    pub fn format(self, spec: &str) -> String {
        let mut chars = spec.chars();
        let case = match chars.next() {
            Some(c @ ('u' | 'w' | 't')) => c,
            _ => return self.name().to_string(),
        };
        let width: Option<usize> = match chars.as_str() {
            "" => None,
            digits => match digits.parse() {
                Ok(w) if (1..=3).contains(&w) => Some(w),
                _ => return self.name().to_string(),
            },
        };

        let base: String = match width {
            None => self.name().to_string(),
            Some(3) => self.short_name().to_string(),
            Some(w) => self.short_name().chars().take(w).collect(),
        };

        match case {
            'u' => base.to_uppercase(),
            'w' => base.to_lowercase(),
            _ => {
                let lower = base.to_lowercase();
                let mut out = String::with_capacity(lower.len());
                let mut it = lower.chars();
                if let Some(first) = it.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(it.as_str());
                }
                out
            }
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = LogweaveError;

    /// Case-insensitive; accepts the usual aliases from other ecosystems
    /// (`trace`, `info`, `warn`, `critical`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" | "vrb" => Ok(Self::Verbose),
            "debug" | "dbg" => Ok(Self::Debug),
            "information" | "info" | "inf" => Ok(Self::Information),
            "warning" | "warn" | "wrn" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            "fatal" | "critical" | "ftl" => Ok(Self::Fatal),
            _ => Err(LogweaveError::InvalidLevel(s.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Shared, atomically updatable minimum level.
#[derive(Clone)]
pub struct LevelSwitch {
    cell: Arc<AtomicU8>,
}

impl LevelSwitch {
    pub fn new(initial: Level) -> Self {
        Self {
            cell: Arc::new(AtomicU8::new(initial as u8)),
        }
    }

    /// Current minimum level.
    pub fn minimum_level(&self) -> Level {
        Level::from_u8(self.cell.load(Ordering::Acquire))
    }

    /// Replace the minimum level. Last writer wins.
    pub fn set_minimum_level(&self, level: Level) {
        self.cell.store(level as u8, Ordering::Release);
    }

    /// Whether an event at `level` passes this switch.
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.minimum_level()
    }

    /// True when both handles share the same cell.
    pub fn same_switch(&self, other: &LevelSwitch) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Default for LevelSwitch {
    fn default() -> Self {
        Self::new(Level::Information)
    }
}

impl fmt::Debug for LevelSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelSwitch")
            .field("minimum_level", &self.minimum_level())
            .finish()
    }
}

/// A minimum-level check: either a fixed floor or a live switch.
///
/// Switch gates read the switch on every call, never caching.
#[derive(Debug, Clone)]
pub enum LevelGate {
    Static(Level),
    Switch(LevelSwitch),
}

impl LevelGate {
    pub fn allows(&self, level: Level) -> bool {
        match self {
            Self::Static(min) => level >= *min,
            Self::Switch(switch) => switch.is_enabled(level),
        }
    }

    /// The floor in effect right now.
    pub fn minimum_level(&self) -> Level {
        match self {
            Self::Static(min) => *min,
            Self::Switch(switch) => switch.minimum_level(),
        }
    }
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::Static(Level::Verbose)
    }
}

impl From<Level> for LevelGate {
    fn from(level: Level) -> Self {
        Self::Static(level)
    }
}

impl From<LevelSwitch> for LevelGate {
    fn from(switch: LevelSwitch) -> Self {
        Self::Switch(switch)
    }
}

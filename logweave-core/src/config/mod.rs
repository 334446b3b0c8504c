//! Configuration documents: schema, component registry and loading.
//!
//! A document is TOML or JSON, chosen by file extension. JSON documents may
//! be wrapped in a `Serilog` section, as host settings files usually are.

mod build;
mod registry;
mod schema;

pub use build::BuildContext;
pub use registry::{
    DestructureFactory, DestructureStep, EnricherFactory, FilterFactory, Registry, SinkFactory,
};
pub use schema::{
    json_to_value, ComponentArgs, ComponentConfig, ComponentList, LoggerConfig, MinimumLevelConfig,
};

use anyhow::{Context, Result};
use std::{fs, path::Path, path::PathBuf};

/// File names searched by [`find_config`], in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["logweave.toml", "logweave.json", "appsettings.json"];

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Loads a configuration document from `path`.
pub fn load_config(path: &Path) -> Result<LoggerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let cfg = if is_json(path) {
        LoggerConfig::from_json_str(&content)
    } else {
        LoggerConfig::from_toml_str(&content)
    };
    cfg.with_context(|| format!("Invalid {}", path.display()))
}

/// First of [`CONFIG_FILE_NAMES`] present in `root`, if any.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_selects_format() {
        assert!(is_json(Path::new("appsettings.JSON")));
        assert!(!is_json(Path::new("logweave.toml")));
        assert!(!is_json(Path::new("logweave")));
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/logweave.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }
}

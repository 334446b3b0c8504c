//! logweave CLI - demo host for the logweave event pipeline.
//!
//! Features:
//! - Pipeline configured in code, or from a TOML/JSON settings document
//! - Built-in sample settings (`--sample`)
//! - Custom destructuring policy and filter registered by name
//! - Rayon-powered concurrent emitters (`--threads`)
//! - Runtime level switch changes (`--switch-level`)

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use logweave_core::{
    args, find_config, init_self_diagnostics, load_config, Arg, ConsoleSink, Destructurer,
    Level, LevelSwitch, LogContext, LogContextEnricher, LogEvent, Logger, LoggerConfig,
    LoggerConfiguration, MachineNameEnricher, OutputTemplate, Property, Registry,
    ThreadIdEnricher, ThreadNameEnricher, TypedPolicy, Value,
};

/// Output template used when configuring in code.
const CONSOLE_TEMPLATE: &str = "{Timestamp:yyyy-MM-dd HH:mm:ss.fff} [{Level:u3}] ({Application}/{SourceContext}/{MachineName}/{ThreadId}/{ThreadName}) {Message:lj}{NewLine}{Exception}";

/// Source context of the demo events.
const PROGRAM_CONTEXT: &str = "LogweaveDemo.Program";

/// Settings document compiled into the binary.
const SAMPLE_SETTINGS: &str = include_str!("../appsettings.json");

#[derive(Parser, Debug)]
#[command(author, version, about = "Demo host for the logweave structured log pipeline")]
pub struct Cli {
    /// Settings document (TOML or JSON, by extension)
    #[arg(long, value_name = "FILE", conflicts_with = "sample")]
    config: Option<PathBuf>,

    /// Use the built-in sample settings document
    #[arg(long)]
    sample: bool,

    /// Look for logweave.toml / logweave.json / appsettings.json in this directory
    #[arg(long, value_name = "DIR", conflicts_with_all = ["config", "sample"])]
    discover: Option<PathBuf>,

    /// Emit self-diagnostics as JSON on stderr
    #[arg(long)]
    json_self_log: bool,

    /// Run the demo on this many threads at once
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Set `$controlSwitch` to this level before emitting
    #[arg(long, value_name = "LEVEL")]
    switch_level: Option<Level>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Person {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginData {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FiveDeep {
    five_deep: Two,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Two {
    two: Three,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Three {
    three: Four,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Four {
    four: Five,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Five {
    five: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TwentyChars {
    twenty_chars: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TenItems {
    ten_items: Vec<&'static str>,
}

/// Keeps only the user name of a [`LoginData`].
fn custom_policy() -> TypedPolicy<LoginData, impl Fn(&LoginData, &Destructurer) -> Value + Send + Sync> {
    TypedPolicy::new(|login: &LoginData, _: &Destructurer| {
        Value::structure(
            Some("LoginData"),
            vec![Property::new("Username", login.username.as_str())],
        )
    })
}

/// Accepts every event.
fn custom_filter(_: &LogEvent) -> bool {
    true
}

/// Built-in components plus the demo's custom policy and filter.
fn demo_registry() -> Registry {
    let mut registry = Registry::with_defaults();
    registry
        .add_policy("CustomPolicy", Arc::new(custom_policy()))
        .add_filter("CustomFilter", Arc::new(custom_filter));
    registry
}

fn configure_in_code() -> Logger {
    let control = LevelSwitch::new(Level::Verbose);
    LoggerConfiguration::new()
        .write_to(ConsoleSink::stdout(Arc::new(OutputTemplate::parse(CONSOLE_TEMPLATE))))
        .minimum_level_controlled_by(control.clone())
        .level_switch("$controlSwitch", control)
        .override_level(PROGRAM_CONTEXT, Level::Verbose)
        .enrich(LogContextEnricher)
        .enrich_with_property("Application", "Logweave Sample")
        .enrich(MachineNameEnricher::new())
        .enrich(ThreadIdEnricher)
        .enrich(ThreadNameEnricher)
        .destructure_with(custom_policy())
        .create_logger()
}

fn configure_from_document(config: &LoggerConfig) -> Result<Logger> {
    config
        .build(&demo_registry())
        .map_err(|e| anyhow!("Failed to build pipeline: {}", e))
}

fn build_logger(cli: &Cli) -> Result<Logger> {
    if cli.sample {
        let config = LoggerConfig::from_json_str(SAMPLE_SETTINGS).context("Invalid built-in sample settings")?;
        return configure_from_document(&config);
    }
    let path = match (&cli.config, &cli.discover) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(
            find_config(dir).ok_or_else(|| anyhow!("No settings document found in {}", dir.display()))?,
        ),
        (None, None) => None,
    };
    match path {
        Some(path) => configure_from_document(&load_config(&path)?),
        None => Ok(configure_in_code()),
    }
}

/// The demo events: one greeting per level, then one capture per cap.
fn run_demo(logger: &Logger) {
    let logger = logger.for_context(PROGRAM_CONTEXT);

    logger.verbose("Hello, {name}!", args!["World"]);
    logger.debug("Hello, {name}!", args!["World"]);
    logger.information("Hello, {name}!", args!["World"]);
    logger.warning("Hello, {name}!", args!["World"]);
    logger.error("Hello, {name}!", args!["World"]);

    logger.information("Hello, {@object}", args![Arg::capture(Person { name: "Bill".into() })]);

    let _scope = LogContext::push_property("Demo", "destructuring");

    logger.information(
        "Destructure with max object nesting depth: {@NestedObject}",
        args![Arg::capture(FiveDeep {
            five_deep: Two {
                two: Three {
                    three: Four {
                        four: Five { five: "the end" },
                    },
                },
            },
        })],
    );
    logger.information(
        "Destructure with max string length: {@LongString}",
        args![Arg::capture(TwentyChars {
            twenty_chars: "0123456789abcdefghij",
        })],
    );
    logger.information(
        "Destructure with max collection count: {@BigData}",
        args![Arg::capture(TenItems {
            ten_items: vec!["one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten"],
        })],
    );
    logger.information(
        "Destructure with policy to strip password: {@LoginData}",
        args![Arg::capture(LoginData {
            username: "BGates".into(),
            password: "isityearoflinuxyet".into(),
        })],
    );
}

/// Runs the demo on a thread named like the host's main thread, or on a
/// pool of `threads` workers.
fn emit(logger: &Logger, threads: usize) -> Result<()> {
    if threads <= 1 {
        let worker = logger.clone();
        std::thread::Builder::new()
            .name("Main thread".into())
            .spawn(move || run_demo(&worker))
            .context("Failed to spawn demo thread")?
            .join()
            .map_err(|_| anyhow!("Demo thread panicked"))?;
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("Worker {}", i))
        .build()
        .context("Failed to build worker pool")?;
    pool.install(|| (0..threads).into_par_iter().for_each(|_| run_demo(logger)));
    Ok(())
}

/// Sink failures anywhere in the pipeline, nested sinks included.
fn failure_report(logger: &Logger) -> Vec<String> {
    logger
        .pipeline()
        .sinks()
        .failures()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| format!("  - {}: {}", name, count))
        .collect()
}

fn report_failures(logger: &Logger) {
    let lines = failure_report(logger);
    if lines.is_empty() {
        return;
    }
    eprintln!(
        "WARN: {} sink failure(s):",
        logger.pipeline().sinks().total_failures()
    );
    for line in lines {
        eprintln!("{}", line);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let logger = build_logger(cli)?;

    if let Some(level) = cli.switch_level {
        let switch = logger
            .level_switch("$controlSwitch")
            .ok_or_else(|| anyhow!("Pipeline declares no $controlSwitch"))?;
        switch.set_minimum_level(level);
    }

    emit(&logger, cli.threads)?;
    logger.flush();
    report_failures(&logger);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Self-diagnostics on stderr, respects LOGWEAVE_SELFLOG
    init_self_diagnostics(cli.json_self_log);

    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logweave_core::{MemorySink, Sink, SinkError, SubLoggerSink, SOURCE_CONTEXT_PROPERTY};

    fn memory_logger(memory: &MemorySink) -> Logger {
        LoggerConfiguration::new()
            .minimum_level(Level::Verbose)
            .destructure_with(custom_policy())
            .max_depth(3)
            .max_string_length(10)
            .max_collection_count(5)
            .write_to(memory.clone())
            .create_logger()
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["logweave", "--sample", "--threads", "4", "--switch-level", "warn"]);
        assert!(cli.sample);
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.switch_level, Some(Level::Warning));
    }

    #[test]
    fn test_cli_rejects_conflicting_sources() {
        assert!(Cli::try_parse_from(["logweave", "--sample", "--config", "x.toml"]).is_err());
    }

    #[test]
    fn test_demo_emits_every_event() {
        let memory = MemorySink::new();
        run_demo(&memory_logger(&memory));

        let events = memory.events();
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| {
            e.property(SOURCE_CONTEXT_PROPERTY).and_then(Value::as_str) == Some(PROGRAM_CONTEXT)
        }));
        assert_eq!(events[5].render_message(), "Hello, Person { Name: \"Bill\" }");
    }

    #[test]
    fn test_custom_policy_strips_password() {
        let memory = MemorySink::new();
        run_demo(&memory_logger(&memory));

        let messages = memory.messages();
        let login = messages.last().unwrap();
        assert!(login.contains("BGates"));
        assert!(!login.contains("isityearoflinuxyet"), "password leaked: {}", login);
    }

    #[test]
    fn test_demo_on_worker_pool() {
        let memory = MemorySink::new();
        emit(&memory_logger(&memory), 3).unwrap();
        assert_eq!(memory.len(), 30);
    }

    #[test]
    fn test_sample_settings_build() {
        let config = LoggerConfig::from_json_str(SAMPLE_SETTINGS).unwrap();
        let logger = configure_from_document(&config).unwrap();
        assert!(logger.level_switch("$controlSwitch").is_some());
        assert!(logger.filter_switch("$filterSwitch").is_some());
        assert_eq!(logger.pipeline().destructurer().limits().max_depth, 3);
    }

    #[test]
    fn test_toml_sample_parses() {
        let text = include_str!("../logweave.toml");
        let config = LoggerConfig::from_toml_str(text).unwrap();
        assert_eq!(config.enrich.len(), 4);
        assert_eq!(config.destructure.len(), 5);
        assert_eq!(config.sinks().unwrap().len(), 3);
    }

    #[test]
    fn test_failure_report_includes_nested_sinks() {
        struct Broken;

        impl Sink for Broken {
            fn emit(&self, _: &LogEvent) -> Result<(), SinkError> {
                Err(SinkError::Format("unwritable".into()))
            }

            fn name(&self) -> &str {
                "Broken"
            }
        }

        let nested = LoggerConfiguration::new()
            .minimum_level(Level::Verbose)
            .write_to(Broken)
            .build_pipeline();
        let logger = LoggerConfiguration::new()
            .write_to(SubLoggerSink::new(nested))
            .create_logger();
        logger.warning("nowhere to go", args![]);

        assert_eq!(failure_report(&logger), vec!["  - Logger/Broken: 1".to_string()]);
    }

    #[test]
    fn test_sample_without_custom_policy_fails() {
        let config = LoggerConfig::from_json_str(SAMPLE_SETTINGS).unwrap();
        let err = config.build(&Registry::with_defaults()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown destructuring policy 'LogweaveDemo.CustomPolicy, LogweaveDemo'"
        );
    }
}

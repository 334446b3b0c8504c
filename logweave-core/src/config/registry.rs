//! Named component factories.
//!
//! Every name that can appear in a configuration document resolves through a
//! [`Registry`], once, while the pipeline is built. Unknown names are errors.
//!
//! # Built-ins
//! ```text
//! Enrich       FromLogContext WithThreadId WithThreadName WithMachineName
//!              WithProperty AtLevel When
//! Filter       ByIncludingOnly ByExcluding ControlledBy ByMinimumLevel With
//! Destructure  With ToMaximumDepth ToMaximumStringLength
//!              ToMaximumCollectionCount MaskProperties
//! WriteTo      Console File Logger Async Conditional
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::build::BuildContext;
use super::schema::ComponentArgs;
use crate::capture::{DestructuringPolicy, MaskPropertiesPolicy};
use crate::enrich::{
    ConditionalEnricher, Enricher, EventPredicate, LevelRestrictedEnricher, LogContextEnricher,
    MachineNameEnricher, PropertyEnricher, ThreadIdEnricher, ThreadNameEnricher,
};
use crate::error::{ComponentKind, LogweaveError, LogweaveResult};
use crate::event::LogEvent;
use crate::filter::{Expr, ExpressionFilter, Filter, LevelFilter, SwitchFilter};
use crate::format::{CompactJsonFormatter, Formatter, OutputTemplate};
use crate::level::Level;
use crate::sink::{ConditionalSink, ConsoleSink, Sink, SubLoggerSink};

/// Output of a `Destructure` entry.
#[derive(Clone)]
pub enum DestructureStep {
    Policy(Arc<dyn DestructuringPolicy>),
    MaxDepth(usize),
    MaxStringLength(usize),
    MaxCollectionCount(usize),
}

pub type EnricherFactory =
    Arc<dyn Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Enricher>> + Send + Sync>;
pub type FilterFactory =
    Arc<dyn Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Filter>> + Send + Sync>;
pub type DestructureFactory =
    Arc<dyn Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<DestructureStep> + Send + Sync>;
pub type SinkFactory =
    Arc<dyn Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Sink>> + Send + Sync>;

#[derive(Clone)]
pub struct Registry {
    enrichers: HashMap<String, EnricherFactory>,
    filters: HashMap<String, FilterFactory>,
    destructure: HashMap<String, DestructureFactory>,
    sinks: HashMap<String, SinkFactory>,
    /// Targets of `Filter: With { filter }`
    named_filters: HashMap<String, Arc<dyn Filter>>,
    /// Targets of `Destructure: With { policy }`
    named_policies: HashMap<String, Arc<dyn DestructuringPolicy>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Candidate keys for a possibly type-qualified name:
/// `"MyApp.CustomFilter, MyApp"` → full text, `"MyApp.CustomFilter"`, `"CustomFilter"`.
fn type_name_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![key(name)];
    let type_part = name.split(',').next().unwrap_or(name).trim();
    candidates.push(key(type_part));
    if let Some(short) = type_part.rsplit('.').next() {
        candidates.push(key(short));
    }
    candidates.dedup();
    candidates
}

impl Registry {
    /// An empty registry, without even the built-ins.
    pub fn empty() -> Self {
        Self {
            enrichers: HashMap::new(),
            filters: HashMap::new(),
            destructure: HashMap::new(),
            sinks: HashMap::new(),
            named_filters: HashMap::new(),
            named_policies: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    pub fn register_enricher<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Enricher>> + Send + Sync + 'static,
    {
        self.enrichers.insert(key(name), Arc::new(factory));
        self
    }

    pub fn register_filter<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        self.filters.insert(key(name), Arc::new(factory));
        self
    }

    pub fn register_destructure<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<DestructureStep> + Send + Sync + 'static,
    {
        self.destructure.insert(key(name), Arc::new(factory));
        self
    }

    pub fn register_sink<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(ComponentArgs<'_>, &BuildContext<'_>) -> LogweaveResult<Arc<dyn Sink>> + Send + Sync + 'static,
    {
        self.sinks.insert(key(name), Arc::new(factory));
        self
    }

    /// Make an existing sink instance available under `name`.
    pub fn add_sink(&mut self, name: &str, sink: Arc<dyn Sink>) -> &mut Self {
        self.register_sink(name, move |_, _| Ok(sink.clone()))
    }

    /// Make a filter available to `With { filter = "<name>" }`.
    pub fn add_filter(&mut self, name: &str, filter: Arc<dyn Filter>) -> &mut Self {
        self.named_filters.insert(key(name), filter);
        self
    }

    /// Make a policy available to `With { policy = "<name>" }`.
    pub fn add_policy(&mut self, name: &str, policy: Arc<dyn DestructuringPolicy>) -> &mut Self {
        self.named_policies.insert(key(name), policy);
        self
    }

    pub fn enricher(&self, name: &str) -> LogweaveResult<&EnricherFactory> {
        self.enrichers
            .get(&key(name))
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Enricher, name))
    }

    pub fn filter(&self, name: &str) -> LogweaveResult<&FilterFactory> {
        self.filters
            .get(&key(name))
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Filter, name))
    }

    pub fn destructure(&self, name: &str) -> LogweaveResult<&DestructureFactory> {
        self.destructure
            .get(&key(name))
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Destructure, name))
    }

    pub fn sink(&self, name: &str) -> LogweaveResult<&SinkFactory> {
        self.sinks
            .get(&key(name))
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Sink, name))
    }

    pub fn named_filter(&self, name: &str) -> LogweaveResult<Arc<dyn Filter>> {
        type_name_candidates(name)
            .iter()
            .find_map(|k| self.named_filters.get(k).cloned())
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Filter, name))
    }

    pub fn named_policy(&self, name: &str) -> LogweaveResult<Arc<dyn DestructuringPolicy>> {
        type_name_candidates(name)
            .iter()
            .find_map(|k| self.named_policies.get(k).cloned())
            .ok_or_else(|| LogweaveError::unknown(ComponentKind::Policy, name))
    }

    fn register_builtins(&mut self) {
        self.register_enricher("FromLogContext", |_, _| Ok(Arc::new(LogContextEnricher)))
            .register_enricher("WithThreadId", |_, _| Ok(Arc::new(ThreadIdEnricher)))
            .register_enricher("WithThreadName", |_, _| Ok(Arc::new(ThreadNameEnricher)))
            .register_enricher("WithMachineName", |_, _| Ok(Arc::new(MachineNameEnricher::new())))
            .register_enricher("WithProperty", with_property)
            .register_enricher("AtLevel", at_level)
            .register_enricher("When", when);

        self.register_filter("ByIncludingOnly", |args, _| {
            Ok(Arc::new(ExpressionFilter::including_only(args.required_str("expression")?)?))
        })
        .register_filter("ByExcluding", |args, _| {
            Ok(Arc::new(ExpressionFilter::excluding(args.required_str("expression")?)?))
        })
        .register_filter("ControlledBy", |args, ctx| {
            Ok(Arc::new(SwitchFilter(ctx.filter_switch(args.required_str("switch")?)?)))
        })
        .register_filter("ByMinimumLevel", |args, ctx| {
            let gate = match args.str("levelSwitch")? {
                Some(name) => ctx.level_switch(name)?.into(),
                None => args.required_str("minimumLevel")?.parse::<Level>()?.into(),
            };
            Ok(Arc::new(LevelFilter(gate)))
        })
        .register_filter("With", |args, ctx| {
            ctx.registry().named_filter(args.required_str("filter")?)
        });

        self.register_destructure("With", |args, ctx| {
            Ok(DestructureStep::Policy(ctx.registry().named_policy(args.required_str("policy")?)?))
        })
        .register_destructure("ToMaximumDepth", |args, _| {
            Ok(DestructureStep::MaxDepth(args.required_usize("maximumDestructuringDepth")?))
        })
        .register_destructure("ToMaximumStringLength", |args, _| {
            Ok(DestructureStep::MaxStringLength(args.required_usize("maximumStringLength")?))
        })
        .register_destructure("ToMaximumCollectionCount", |args, _| {
            Ok(DestructureStep::MaxCollectionCount(args.required_usize("maximumCollectionCount")?))
        })
        .register_destructure("MaskProperties", |args, _| {
            let names = args.strings("names")?;
            let mask = args.str("mask")?.unwrap_or(MaskPropertiesPolicy::DEFAULT_MASK);
            Ok(DestructureStep::Policy(Arc::new(MaskPropertiesPolicy::new(names, mask))))
        });

        self.register_sink("Console", console)
            .register_sink("Logger", |args, ctx| {
                let nested = args.logger_config("configureLogger")?;
                Ok(Arc::new(SubLoggerSink::new(ctx.build_pipeline(&nested)?)))
            })
            .register_sink("Conditional", |args, ctx| {
                let predicate = predicate(args, "expression")?;
                let inner = ctx.build_sinks(&args.components("configureSink")?)?;
                Ok(Arc::new(ConditionalSink::new(predicate, inner)))
            });

        #[cfg(feature = "file")]
        self.register_sink("File", file);

        #[cfg(feature = "async-sink")]
        self.register_sink("Async", async_wrapper);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn names<V>(map: &HashMap<String, V>) -> Vec<&str> {
            let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }
        f.debug_struct("Registry")
            .field("enrichers", &names(&self.enrichers))
            .field("filters", &names(&self.filters))
            .field("destructure", &names(&self.destructure))
            .field("sinks", &names(&self.sinks))
            .field("named_filters", &names(&self.named_filters))
            .field("named_policies", &names(&self.named_policies))
            .finish()
    }
}

fn predicate(args: ComponentArgs<'_>, key: &str) -> LogweaveResult<EventPredicate> {
    let expr = Expr::parse(args.required_str(key)?)?;
    Ok(Arc::new(move |event: &LogEvent| expr.is_match(event)))
}

fn with_property(args: ComponentArgs<'_>, _: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Enricher>> {
    let name = args.required_str("name")?;
    let value = args
        .value("value")
        .ok_or_else(|| LogweaveError::invalid_argument(args.component(), "missing required argument 'value'"))?;
    Ok(Arc::new(PropertyEnricher::new(name, value)))
}

fn at_level(args: ComponentArgs<'_>, ctx: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Enricher>> {
    let gate = match args.str("levelSwitch")? {
        Some(name) => ctx.level_switch(name)?.into(),
        None => ctx.gate(args.required_str("enrichFromLevel")?)?,
    };
    let inner = ctx.build_enrichers(&args.components("configureEnricher")?)?;
    Ok(Arc::new(LevelRestrictedEnricher::new(gate, inner)))
}

fn when(args: ComponentArgs<'_>, ctx: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Enricher>> {
    let predicate = predicate(args, "expression")?;
    let inner = ctx.build_enrichers(&args.components("configureEnricher")?)?;
    Ok(Arc::new(ConditionalEnricher::new(predicate, inner)))
}

/// `formatter = "json"` (or a compact-JSON type name) selects JSON output,
/// otherwise `outputTemplate` is used.
fn formatter(args: ComponentArgs<'_>) -> LogweaveResult<Arc<dyn Formatter>> {
    match args.str("formatter")? {
        None => {}
        Some(name) if name.eq_ignore_ascii_case("text") => {}
        Some(name) => {
            let lowered = name.to_ascii_lowercase();
            if lowered == "json" || lowered.contains("compactjson") {
                return Ok(Arc::new(CompactJsonFormatter::new()));
            }
            return Err(LogweaveError::invalid_argument(
                args.component(),
                format!("unknown formatter '{}'", name),
            ));
        }
    }
    Ok(Arc::new(match args.str("outputTemplate")? {
        Some(text) => OutputTemplate::parse(text),
        None => OutputTemplate::default(),
    }))
}

fn console(args: ComponentArgs<'_>, _: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Sink>> {
    let formatter = formatter(args)?;
    Ok(Arc::new(if args.bool("standardError")?.unwrap_or(false) {
        ConsoleSink::stderr(formatter)
    } else {
        ConsoleSink::stdout(formatter)
    }))
}

#[cfg(feature = "file")]
fn file(args: ComponentArgs<'_>, _: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Sink>> {
    let path = args.required_str("path")?;
    let append = args.bool("append")?.unwrap_or(true);
    Ok(Arc::new(crate::sink::FileSink::open(path, formatter(args)?, append)?))
}

#[cfg(feature = "async-sink")]
fn async_wrapper(args: ComponentArgs<'_>, ctx: &BuildContext<'_>) -> LogweaveResult<Arc<dyn Sink>> {
    let inner = ctx.build_sinks(&args.components("configure")?)?;
    let buffer_size = args
        .usize("bufferSize")?
        .unwrap_or(crate::sink::DEFAULT_BUFFER_SIZE);
    let block_when_full = args.bool("blockWhenFull")?.unwrap_or(false);
    Ok(Arc::new(crate::sink::AsyncSink::new(inner, buffer_size, block_when_full)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let registry = Registry::with_defaults();
        assert!(registry.enricher("withthreadid").is_ok());
        assert!(registry.sink("CONSOLE").is_ok());
    }

    #[test]
    fn test_unknown_names_report_their_kind() {
        let registry = Registry::with_defaults();
        let err = registry.sink("Seq").err().unwrap();
        assert_eq!(err.to_string(), "Unknown sink 'Seq'");
        let err = registry.named_policy("Nope").err().unwrap();
        assert!(matches!(
            err,
            LogweaveError::UnknownComponent {
                kind: ComponentKind::Policy,
                ..
            }
        ));
    }

    #[test]
    fn test_type_qualified_names_resolve() {
        let mut registry = Registry::empty();
        registry.add_filter("CustomFilter", Arc::new(|_: &LogEvent| true));
        assert!(registry
            .named_filter("SerilogExample.CustomFilter, SerilogExample")
            .is_ok());
        assert!(registry.named_filter("Other.Filter").is_err());
    }

    #[test]
    fn test_type_name_candidates() {
        assert_eq!(
            type_name_candidates("A.B.Policy, A"),
            vec!["a.b.policy, a", "a.b.policy", "policy"]
        );
        assert_eq!(type_name_candidates("Policy"), vec!["policy"]);
    }
}

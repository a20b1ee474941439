use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use crate::module::{InitCtx, Module};

/// Core modules driven by the lifecycle, in init order.
///
/// The HTTP server is not a module; it starts once every module has booted.
const CORE_MODULE_ORDER: &[&str] = &["db"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Start,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "initialize",
            Phase::Start => "start",
            Phase::Stop => "stop",
        })
    }
}

/// Holds core and custom modules and drives them through init, start and stop.
///
/// Core modules boot before custom ones and stop after them.
#[derive(Default)]
pub struct ModuleRegistry {
    core_modules: Vec<Arc<dyn Module>>,
    custom_modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an infrastructure module. Only names in the core order are driven.
    pub fn register_core(&mut self, module: Arc<dyn Module>) {
        if !CORE_MODULE_ORDER.contains(&module.name()) {
            tracing::warn!(
                module = module.name(),
                "core module is not part of the lifecycle order and will not be driven"
            );
        }
        self.core_modules.push(module);
    }

    /// Register an application module; custom modules run in registration order.
    pub fn register_custom(&mut self, module: Arc<dyn Module>) {
        self.custom_modules.push(module);
    }

    /// Every registered module, core first.
    pub fn modules(&self) -> Vec<&Arc<dyn Module>> {
        self.core_modules
            .iter()
            .chain(self.custom_modules.iter())
            .collect()
    }

    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules().into_iter().find(|module| module.name() == name)
    }

    pub fn core_module_count(&self) -> usize {
        self.core_modules.len()
    }

    pub fn custom_module_count(&self) -> usize {
        self.custom_modules.len()
    }

    fn ordered_core_modules(&self) -> Vec<&Arc<dyn Module>> {
        CORE_MODULE_ORDER
            .iter()
            .filter_map(|&name| self.core_modules.iter().find(|m| m.name() == name))
            .collect()
    }

    async fn drive<'m>(
        &self,
        phase: Phase,
        kind: &str,
        modules: impl IntoIterator<Item = &'m Arc<dyn Module>>,
        ctx: Option<&InitCtx<'_>>,
    ) -> anyhow::Result<()> {
        // Booting halts at the first failure; stopping carries on and reports the first one
        let mut first_failure = None;
        for module in modules {
            tracing::info!(module = module.name(), %phase, "{} module", kind);

            let outcome = match (phase, ctx) {
                (Phase::Init, Some(ctx)) => module.init(ctx).await,
                (Phase::Start, Some(ctx)) => module.start(ctx).await,
                (Phase::Stop, _) => module.stop().await,
                (_, None) => anyhow::bail!("{phase} requires an init context"),
            };
            let Err(err) = outcome
                .with_context(|| format!("failed to {phase} {kind} module '{}'", module.name()))
            else {
                continue;
            };
            if phase != Phase::Stop {
                return Err(err);
            }
            tracing::error!(module = module.name(), error = %format!("{err:#}"), "module failed to stop");
            first_failure.get_or_insert(err);
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Init then start every module: core before custom in each phase.
    pub async fn boot(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            core = ?CORE_MODULE_ORDER,
            custom = self.custom_modules.len(),
            "booting modules"
        );
        for phase in [Phase::Init, Phase::Start] {
            self.drive(phase, "core", self.ordered_core_modules(), Some(ctx))
                .await?;
            self.drive(phase, "custom", &self.custom_modules, Some(ctx))
                .await?;
        }
        Ok(())
    }

    /// Stop every module in reverse: custom modules first, then core.
    ///
    /// Every module is asked to stop even after a failure; the first error is returned.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("stopping modules");
        let custom = self
            .drive(Phase::Stop, "custom", self.custom_modules.iter().rev(), None)
            .await;
        let core = self
            .drive(
                Phase::Stop,
                "core",
                self.ordered_core_modules().into_iter().rev(),
                None,
            )
            .await;
        custom.and(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::sync::Mutex;

    struct RecordingModule {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingModule {
        fn record(&self, event: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event));
        }
    }

    #[async_trait::async_trait]
    impl Module for RecordingModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.record("init");
            Ok(())
        }

        async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.record("start");
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.record("stop");
            Ok(())
        }
    }

    struct FailingModule;

    #[async_trait::async_trait]
    impl Module for FailingModule {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    struct StubbornModule;

    #[async_trait::async_trait]
    impl Module for StubbornModule {
        fn name(&self) -> &'static str {
            "stubborn"
        }

        async fn stop(&self) -> anyhow::Result<()> {
            anyhow::bail!("still busy")
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_core_after_custom_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(RecordingModule {
            name: "db",
            log: log.clone(),
        }));
        registry.register_custom(Arc::new(RecordingModule {
            name: "books",
            log: log.clone(),
        }));
        registry.register_custom(Arc::new(StubbornModule));

        let err = registry.shutdown().await.unwrap_err();
        assert!(err.to_string().contains("stubborn"));

        let events = log.lock().unwrap().clone();
        assert_eq!(events, vec!["books:stop", "db:stop"]);
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty()); // No modules registered yet
    }

    #[test]
    fn test_get_module_searches_core_and_custom() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(RecordingModule {
            name: "db",
            log: log.clone(),
        }));
        registry.register_custom(Arc::new(RecordingModule {
            name: "books",
            log,
        }));

        assert_eq!(registry.core_module_count(), 1);
        assert_eq!(registry.custom_module_count(), 1);
        assert!(registry.get_module("db").is_some());
        assert!(registry.get_module("books").is_some());
        assert!(registry.get_module("users").is_none());
    }

    #[tokio::test]
    async fn test_module_lifecycle_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        registry.register_custom(Arc::new(RecordingModule {
            name: "books",
            log: log.clone(),
        }));
        registry.register_custom(Arc::new(RecordingModule {
            name: "rentals",
            log: log.clone(),
        }));
        registry.register_core(Arc::new(RecordingModule {
            name: "db",
            log: log.clone(),
        }));

        registry.boot(&ctx).await.unwrap();
        registry.shutdown().await.unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "db:init",
                "books:init",
                "rentals:init",
                "db:start",
                "books:start",
                "rentals:start",
                "rentals:stop",
                "books:stop",
                "db:stop",
            ]
        );
    }

    #[tokio::test]
    async fn test_init_failure_names_the_module() {
        let mut registry = ModuleRegistry::new();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };
        registry.register_custom(Arc::new(FailingModule));

        let err = registry.boot(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("failing"));
    }
}

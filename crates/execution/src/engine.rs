//! The run driver - resolves an ordered plan and executes it step by step.

use crate::dependency::DependencyIndex;
use crate::filter::GroupFilter;
use crate::registry::{index_by_id, UnitRegistry};
use crate::sequencer::Sequencer;
use initflow_core::{LifecycleEvent, ResolveError, Unit, UnitFactory, UnitId, UnitSource};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, error, info};

/// Owns a validated unit set and drives dependency-ordered runs over it.
///
/// Construction performs registration (and so can fail on invalid
/// input); [`run`](Self::run) performs the remaining resolution steps
/// and hands back a [`Run`]. The manager is reusable: running the same
/// input twice produces identical ordering and identical events.
#[derive(Debug)]
pub struct InitializationManager {
    units: Vec<Box<dyn Unit>>,
    index: HashMap<UnitId, usize>,
    dependents: DependencyIndex,
}

impl InitializationManager {
    /// Build a manager from already-constructed unit sources.
    pub fn new(sources: Vec<UnitSource>) -> Result<Self, ResolveError> {
        Self::build(UnitRegistry::new(), sources)
    }

    /// Build a manager that resolves named sources through `factory`.
    pub fn with_factory(
        sources: Vec<UnitSource>,
        factory: Box<dyn UnitFactory>,
    ) -> Result<Self, ResolveError> {
        Self::build(UnitRegistry::new().with_factory(factory), sources)
    }

    fn build(registry: UnitRegistry, sources: Vec<UnitSource>) -> Result<Self, ResolveError> {
        let units = registry.register(sources).map_err(|err| {
            error!(%err, "unit registration failed");
            err
        })?;
        let index = index_by_id(&units);
        let dependents = DependencyIndex::build(&units);
        info!(units = units.len(), "initializer units registered");

        Ok(Self {
            units,
            index,
            dependents,
        })
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units that declared `id` as a dependency (diagnostic index).
    pub fn dependents_of(&self, id: UnitId) -> &[UnitId] {
        self.dependents.dependents_of(id)
    }

    /// Resolve an ordered run restricted to `groups` (empty runs every
    /// unit) and return its event pump.
    ///
    /// All fatal resolution errors surface here, before any unit
    /// executes. Consuming the returned [`Run`] drives execution.
    pub fn run(&mut self, groups: &[String]) -> Result<Run<'_>, ResolveError> {
        let selected = GroupFilter::new(groups.iter().cloned())
            .select(&self.units, &self.index)
            .map_err(|err| {
                error!(%err, "group filtering failed");
                err
            })?;

        let ordered = Sequencer::new()
            .order(&self.units, &selected)
            .map_err(|err| {
                error!(%err, "sequencing failed");
                err
            })?;

        info!(
            selected = ordered.len(),
            total = self.units.len(),
            "run resolved"
        );

        Ok(Run {
            units: &mut self.units,
            queue: ordered.into(),
            running: None,
        })
    }
}

/// A resolved run, executed lazily as its events are consumed.
///
/// Each unit contributes two events: `BeforeInitialize` when it is taken
/// off the queue, then `Success` or `Failed` once `initialize` has run.
/// The unit only executes when the caller asks for that second event, so
/// dropping the `Run` halts further execution. A unit failure is caught
/// and reported; the remaining units still run.
#[derive(Debug)]
pub struct Run<'a> {
    units: &'a mut [Box<dyn Unit>],
    queue: VecDeque<usize>,
    running: Option<usize>,
}

impl Run<'_> {
    /// Produce the next lifecycle event, or `None` once the run is done.
    pub async fn next_event(&mut self) -> Option<LifecycleEvent> {
        if let Some(pos) = self.running.take() {
            let unit = &mut self.units[pos];
            let id = unit.id();

            return Some(match unit.initialize().await {
                Ok(()) => {
                    debug!(unit = %id, "unit initialized");
                    LifecycleEvent::Success { unit: id }
                }
                Err(error) => {
                    error!(unit = %id, %error, "unit failed to initialize");
                    LifecycleEvent::Failed { unit: id, error }
                }
            });
        }

        let pos = self.queue.pop_front()?;
        let unit = self.units[pos].id();
        self.running = Some(pos);
        Some(LifecycleEvent::BeforeInitialize { unit })
    }

    /// Units not yet started (excludes one mid-step).
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Drive the run to completion and summarize it.
    pub async fn finish(mut self) -> RunSummary {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        RunSummary::from_events(events)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Every lifecycle event, in emission order.
    pub events: Vec<LifecycleEvent>,
    /// Units that initialized without error.
    pub succeeded: usize,
    /// Units whose `initialize` failed.
    pub failed: usize,
}

impl RunSummary {
    fn from_events(events: Vec<LifecycleEvent>) -> Self {
        let succeeded = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Success { .. }))
            .count();
        let failed = events.iter().filter(|e| e.is_failure()).count();

        Self {
            events,
            succeeded,
            failed,
        }
    }

    /// Whether every executed unit succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use initflow_core::UnitError;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn note(log: &Log, entry: &'static str) {
        log.lock().unwrap().push(entry);
    }

    struct Schema {
        log: Log,
    }

    #[async_trait]
    impl Unit for Schema {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "schema");
            Ok(())
        }
    }

    struct Migrations {
        log: Log,
    }

    #[async_trait]
    impl Unit for Migrations {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "migrations");
            Err(anyhow::anyhow!("migration 7 failed").into())
        }

        fn dependencies(&self) -> Option<Vec<UnitId>> {
            Some(vec![UnitId::of::<Schema>()])
        }
    }

    struct SeedData {
        log: Log,
    }

    #[async_trait]
    impl Unit for SeedData {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "seed");
            Ok(())
        }

        fn dependencies(&self) -> Option<Vec<UnitId>> {
            Some(vec![UnitId::of::<Migrations>()])
        }
    }

    fn pipeline(log: &Log) -> InitializationManager {
        InitializationManager::new(vec![
            UnitSource::instance(SeedData { log: log.clone() }),
            UnitSource::instance(Schema { log: log.clone() }),
            UnitSource::instance(Migrations { log: log.clone() }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_unit() {
        let log: Log = Log::default();
        let mut manager = pipeline(&log);

        let summary = manager.run(&[]).unwrap().finish().await;

        let schema = UnitId::of::<Schema>();
        let migrations = UnitId::of::<Migrations>();
        let seed = UnitId::of::<SeedData>();
        assert_eq!(
            summary.events,
            vec![
                LifecycleEvent::BeforeInitialize { unit: schema },
                LifecycleEvent::Success { unit: schema },
                LifecycleEvent::BeforeInitialize { unit: migrations },
                LifecycleEvent::Failed {
                    unit: migrations,
                    error: UnitError::new("migration 7 failed"),
                },
                LifecycleEvent::BeforeInitialize { unit: seed },
                LifecycleEvent::Success { unit: seed },
            ]
        );
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_succeeded());
        // the failed unit never blocked its dependent
        assert_eq!(*log.lock().unwrap(), vec!["schema", "migrations", "seed"]);
    }

    #[tokio::test]
    async fn test_reruns_are_deterministic() {
        let log: Log = Log::default();
        let mut manager = pipeline(&log);

        let first = manager.run(&[]).unwrap().finish().await;
        let second = manager.run(&[]).unwrap().finish().await;
        assert_eq!(first.events, second.events);
    }

    #[tokio::test]
    async fn test_consumption_drives_execution() {
        let log: Log = Log::default();
        let mut manager = pipeline(&log);

        let mut run = manager.run(&[]).unwrap();
        assert_eq!(run.remaining(), 3);

        // the before event alone runs nothing
        let before = run.next_event().await.unwrap();
        assert_eq!(
            before,
            LifecycleEvent::BeforeInitialize {
                unit: UnitId::of::<Schema>()
            }
        );
        assert!(log.lock().unwrap().is_empty());

        // asking for the second event executes exactly one unit
        run.next_event().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["schema"]);

        // dropping the run halts everything else
        drop(run);
        assert_eq!(*log.lock().unwrap(), vec!["schema"]);
    }

    struct DemoUsers {
        log: Log,
    }

    #[async_trait]
    impl Unit for DemoUsers {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "demo-users");
            Ok(())
        }

        fn groups(&self) -> Option<Vec<String>> {
            Some(vec!["demo".to_string(), "smoke".to_string()])
        }
    }

    struct DemoOrders {
        log: Log,
    }

    #[async_trait]
    impl Unit for DemoOrders {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "demo-orders");
            Ok(())
        }

        fn dependencies(&self) -> Option<Vec<UnitId>> {
            Some(vec![UnitId::of::<DemoUsers>()])
        }

        fn groups(&self) -> Option<Vec<String>> {
            Some(vec!["demo".to_string()])
        }
    }

    #[tokio::test]
    async fn test_group_run_executes_only_matching_units() {
        let log: Log = Log::default();
        let mut manager = InitializationManager::new(vec![
            UnitSource::instance(Schema { log: log.clone() }),
            UnitSource::instance(DemoOrders { log: log.clone() }),
            UnitSource::instance(DemoUsers { log: log.clone() }),
        ])
        .unwrap();

        let summary = manager
            .run(&["demo".to_string()])
            .unwrap()
            .finish()
            .await;

        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded, 2);
        // Schema has no groups and stays out; DemoUsers runs before its
        // dependent despite appearing later in the input
        assert_eq!(*log.lock().unwrap(), vec!["demo-users", "demo-orders"]);
    }

    struct OrdersNeedMigrations {
        log: Log,
    }

    #[async_trait]
    impl Unit for OrdersNeedMigrations {
        fn id(&self) -> UnitId {
            UnitId::of::<Self>()
        }

        async fn initialize(&mut self) -> Result<(), UnitError> {
            note(&self.log, "orders");
            Ok(())
        }

        fn dependencies(&self) -> Option<Vec<UnitId>> {
            Some(vec![UnitId::of::<Migrations>()])
        }

        fn groups(&self) -> Option<Vec<String>> {
            Some(vec!["demo".to_string(), "smoke".to_string()])
        }
    }

    #[tokio::test]
    async fn test_grouped_run_rejects_ungrouped_dependency() {
        // Migrations exists in the full set but declares no groups, so a
        // grouped run that pulls in its dependent must fail before
        // anything executes.
        let log: Log = Log::default();
        let mut manager = InitializationManager::new(vec![
            UnitSource::instance(Schema { log: log.clone() }),
            UnitSource::instance(Migrations { log: log.clone() }),
            UnitSource::instance(DemoUsers { log: log.clone() }),
            UnitSource::instance(OrdersNeedMigrations { log: log.clone() }),
        ])
        .unwrap();

        let err = manager.run(&["demo".to_string()]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::DependencyNotGrouped {
                unit: UnitId::of::<OrdersNeedMigrations>(),
                dependency: UnitId::of::<Migrations>(),
            }
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dependents_index_is_exposed() {
        let log: Log = Log::default();
        let manager = pipeline(&log);

        assert_eq!(
            manager.dependents_of(UnitId::of::<Schema>()),
            &[UnitId::of::<Migrations>()]
        );
        assert!(manager.dependents_of(UnitId::of::<SeedData>()).is_empty());
        assert_eq!(manager.len(), 3);
        assert!(!manager.is_empty());
    }

    struct NamedFactory {
        log: Log,
    }

    impl UnitFactory for NamedFactory {
        fn build(&self, name: &str) -> Option<Box<dyn Unit>> {
            match name {
                "schema" => Some(Box::new(Schema {
                    log: self.log.clone(),
                })),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn test_named_sources_run_through_factory() {
        let log: Log = Log::default();
        let mut manager = InitializationManager::with_factory(
            vec![UnitSource::named("schema")],
            Box::new(NamedFactory { log: log.clone() }),
        )
        .unwrap();

        let summary = manager.run(&[]).unwrap().finish().await;
        assert!(summary.all_succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["schema"]);
    }

    #[test]
    fn test_invalid_source_fails_at_construction() {
        let err = InitializationManager::new(vec![UnitSource::named("schema")]).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUnit { .. }));
    }
}

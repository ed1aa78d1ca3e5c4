//! Runtime - drives World, Dispatcher and Router one step at a time

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::{CommandDispatcher, CommandRouter, CommandStats};
use crate::config::{RuntimeConfig, UnroutedPolicy};
use crate::ecs::{Store, System, SystemRunReport, World};
use crate::error::{HiveError, Result};
use crate::snapshot::{Snapshot, SnapshotRegistry};

/// Statistics for a single step
#[derive(Clone, Debug)]
pub struct StepReport {
    pub step: u64,
    pub duration: Duration,
    pub systems: Vec<SystemRunReport>,
    pub commands: CommandStats,
    pub unrouted: usize,
}

impl StepReport {
    pub fn routed(&self) -> usize {
        self.commands.values().sum()
    }
}

/// Owns the world, the command queue and the router.
///
/// ```ignore
/// let mut runtime = Runtime::new();
/// let e = runtime.world_mut().create_entity();
/// runtime.world_mut().add_component(e, Position { x: 0, y: 0 });
/// runtime.register(MovementSystem::default(), 5);
/// runtime.router_mut().register(handle_move)?;
/// runtime.step()?;
/// ```
pub struct Runtime {
    world: World,
    dispatcher: CommandDispatcher,
    router: CommandRouter,
    config: RuntimeConfig,
    steps: u64,
    history: VecDeque<StepReport>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            world: World::with_store(Store::with_max_free_ids(config.max_free_ids)),
            dispatcher: CommandDispatcher::new(),
            router: CommandRouter::new(),
            config,
            steps: 0,
            history: VecDeque::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher {
        &mut self.dispatcher
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut CommandRouter {
        &mut self.router
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Completed steps
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn register(&mut self, system: impl System + 'static, priority: i32) {
        self.world.register(system, priority);
    }

    /// Execute one step.
    ///
    /// 1. Systems run in priority order and may dispatch commands.
    /// 2. Queued commands are routed, including ones dispatched by handlers.
    /// 3. The step counter advances.
    ///
    /// Any failure returns before the counter advances. When a system fails,
    /// commands dispatched by the aborted step are discarded; commands queued
    /// before the step began stay queued.
    pub fn step(&mut self) -> Result<StepReport> {
        let start = Instant::now();
        let queued = self.dispatcher.len();
        let systems = match self.world.step(&mut self.dispatcher) {
            Ok(systems) => systems,
            Err(err) => {
                self.dispatcher.truncate(queued);
                return Err(err);
            }
        };

        let mut commands = CommandStats::new();
        let mut unrouted = 0;
        let policy = self.config.unrouted;
        let Self { world, router, dispatcher, .. } = self;
        dispatcher.process(|command, queue| {
            let kind = command.kind();
            if router.route(command, world, queue)? {
                *commands.entry(kind).or_insert(0) += 1;
                return Ok(());
            }
            unrouted += 1;
            match policy {
                UnroutedPolicy::Drop => Ok(()),
                UnroutedPolicy::Warn => {
                    warn!(command = %kind, "no handler registered, command dropped");
                    Ok(())
                }
                UnroutedPolicy::Error => Err(HiveError::Unrouted(kind.name())),
            }
        })?;

        self.world.advance_step();
        self.steps = self.world.step_count();

        let report = StepReport {
            step: self.steps,
            duration: start.elapsed(),
            systems,
            commands,
            unrouted,
        };
        debug!(
            step = report.step,
            routed = report.routed(),
            unrouted = report.unrouted,
            duration = ?report.duration,
            "step complete"
        );
        self.remember(report.clone());
        Ok(report)
    }

    /// Run `steps` steps, stopping at the first failure
    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Most recent step reports, oldest first
    pub fn recent_reports(&self) -> impl Iterator<Item = &StepReport> {
        self.history.iter()
    }

    /// Average step time over the kept reports
    pub fn average_step_time(&self) -> Option<Duration> {
        if self.history.is_empty() {
            return None;
        }
        let total: Duration = self.history.iter().map(|report| report.duration).sum();
        Some(total / self.history.len() as u32)
    }

    pub fn snapshot(&self, registry: &SnapshotRegistry) -> Result<Snapshot> {
        registry.capture(&self.world)
    }

    pub fn restore(&mut self, registry: &SnapshotRegistry, snapshot: &Snapshot) -> Result<()> {
        registry.restore(snapshot, &mut self.world)
    }

    fn remember(&mut self, report: StepReport) {
        if self.config.report_history == 0 {
            return;
        }
        while self.history.len() >= self.config.report_history {
            self.history.pop_front();
        }
        self.history.push_back(report);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

//! Conway's Game of Life as a host of the runtime.
//!
//! Every cell is an entity with [`Position`] and [`Cell`]. [`LifeSystem`]
//! reads the current generation and dispatches [`SetCell`] commands for the
//! cells that change; the commands are applied after the step's systems have
//! run, so the whole generation is computed from a consistent state.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandDispatcher};
use crate::config::{LoggingConfig, RuntimeConfig};
use crate::ecs::{Component, EntityId, System, World};
use crate::error::HiveError;
use crate::events::Event;
use crate::resources::Resource;
use crate::runtime::Runtime;
use crate::snapshot::SnapshotRegistry;

const ALIVE: char = 'O';
const DEAD: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub alive: bool,
}
impl Component for Cell {}

/// Grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
}
impl Resource for GridConfig {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation(pub u64);
impl Resource for Generation {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCell {
    pub entity: EntityId,
    pub alive: bool,
}
impl Command for SetCell {}

/// Emitted once per generation, before the generation's commands apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationAdvanced {
    pub generation: u64,
    pub alive: usize,
}
impl Event for GenerationAdvanced {}

fn default_density() -> f64 {
    0.25
}

fn default_steps() -> u64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeScenario {
    pub name: String,
    pub seed: u64,
    pub rows: u32,
    pub cols: u32,
    #[serde(default = "default_density")]
    pub density: f64,
    #[serde(default = "default_steps")]
    pub steps: u64,
    /// Place a glider in the middle of the grid after seeding
    #[serde(default)]
    pub glider: bool,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LifeScenario {
    /// Parse a scenario. `density` must be a finite number.
    pub fn from_yaml_str(text: &str) -> crate::Result<Self> {
        let scenario: Self = serde_yaml::from_str(text)?;
        if !scenario.density.is_finite() {
            return Err(HiveError::InvalidScenario(format!(
                "density must be finite, got {}",
                scenario.density
            )));
        }
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::from_yaml_str(&crate::config::read_to_string(path.as_ref())?)
    }
}

/// Create one entity per cell, alive with probability `density`.
///
/// `density` is clamped to `0.0..=1.0`; a non-finite value seeds an empty grid.
pub fn spawn_grid(
    world: &mut World,
    rows: u32,
    cols: u32,
    density: f64,
    seed: u64,
) -> Vec<EntityId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let density = if density.is_finite() {
        density.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut entities = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            let entity = world.create_entity();
            world.add_component(entity, Position { row, col });
            world.add_component(
                entity,
                Cell {
                    alive: rng.gen_bool(density),
                },
            );
            entities.push(entity);
        }
    }
    world.resources_mut().register(GridConfig { rows, cols });
    world.resources_mut().register(Generation(0));
    entities
}

/// Computes the next generation with wrap-around edges.
pub struct LifeSystem;

impl LifeSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LifeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifeSystem {
    fn name(&self) -> &str {
        "life"
    }

    fn update(&mut self, world: &mut World, dispatcher: &mut CommandDispatcher) -> Result<()> {
        let GridConfig { rows, cols } = *world.resources().get::<GridConfig>()?;
        let grid = grid_lookup(world);

        let mut alive_next = 0;
        for (&(row, col), &(entity, alive)) in &grid {
            let neighbors = live_neighbors(&grid, row, col, rows, cols);
            let next = matches!((alive, neighbors), (true, 2) | (true, 3) | (false, 3));
            if next {
                alive_next += 1;
            }
            if next != alive {
                dispatcher.dispatch(SetCell { entity, alive: next });
            }
        }

        let generation = {
            let generation = world.resources_mut().get_mut::<Generation>()?;
            generation.0 += 1;
            generation.0
        };
        world.emit(
            &GenerationAdvanced {
                generation,
                alive: alive_next,
            },
            dispatcher,
        );
        Ok(())
    }
}

pub fn apply_set_cell(
    command: &SetCell,
    world: &mut World,
    _: &mut CommandDispatcher,
) -> Result<()> {
    if let Some(cell) = world.get_component_mut::<Cell>(command.entity) {
        cell.alive = command.alive;
    }
    Ok(())
}

/// Register the life system and the `SetCell` handler.
pub fn install(runtime: &mut Runtime) -> crate::Result<()> {
    runtime.register(LifeSystem::new(), 0);
    runtime.router_mut().register(apply_set_cell)
}

/// Seed the grid described by `scenario` and install the simulation.
pub fn setup(runtime: &mut Runtime, scenario: &LifeScenario) -> crate::Result<()> {
    let world = runtime.world_mut();
    spawn_grid(world, scenario.rows, scenario.cols, scenario.density, scenario.seed);
    if scenario.glider {
        place_glider(world, scenario.rows / 2, scenario.cols / 2);
    }
    install(runtime)
}

pub fn snapshot_registry() -> crate::Result<SnapshotRegistry> {
    let mut registry = SnapshotRegistry::new();
    registry.register_component::<Position>("Position")?;
    registry.register_component::<Cell>("Cell")?;
    registry.register_resource::<GridConfig>("GridConfig")?;
    registry.register_resource::<Generation>("Generation")?;
    Ok(registry)
}

/// Set the cell at (`row`, `col`); returns false if there is none.
pub fn set_cell_at(world: &mut World, row: u32, col: u32, alive: bool) -> bool {
    let target = world
        .query::<(Position, Cell)>()
        .into_iter()
        .find(|(_, pos, _)| pos.row == row && pos.col == col)
        .map(|(entity, _, _)| entity);
    match target.and_then(|entity| world.get_component_mut::<Cell>(entity)) {
        Some(cell) => {
            cell.alive = alive;
            true
        }
        None => false,
    }
}

/// Stamp a glider with its top-left corner at (`top`, `left`), wrapping.
pub fn place_glider(world: &mut World, top: u32, left: u32) {
    let Ok(&GridConfig { rows, cols }) = world.resources().get::<GridConfig>() else {
        return;
    };
    if rows == 0 || cols == 0 {
        return;
    }
    for (dr, dc) in [(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)] {
        set_cell_at(world, (top + dr) % rows, (left + dc) % cols, true);
    }
}

pub fn alive_count(world: &World) -> usize {
    world
        .get_components::<Cell>()
        .iter()
        .filter(|(_, cell)| cell.alive)
        .count()
}

/// Text rendering, one line per row.
pub fn render(world: &World) -> String {
    let empty = GridConfig { rows: 0, cols: 0 };
    let GridConfig { rows, cols } = *world.resources().get_or(&empty);
    let mut lines = vec![vec![DEAD; cols as usize]; rows as usize];
    for (_, pos, cell) in world.query::<(Position, Cell)>() {
        if cell.alive && pos.row < rows && pos.col < cols {
            lines[pos.row as usize][pos.col as usize] = ALIVE;
        }
    }
    lines
        .into_iter()
        .map(|line| line.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn grid_lookup(world: &World) -> BTreeMap<(u32, u32), (EntityId, bool)> {
    world
        .query::<(Position, Cell)>()
        .into_iter()
        .map(|(entity, pos, cell)| ((pos.row, pos.col), (entity, cell.alive)))
        .collect()
}

fn live_neighbors(
    grid: &BTreeMap<(u32, u32), (EntityId, bool)>,
    row: u32,
    col: u32,
    rows: u32,
    cols: u32,
) -> u32 {
    let mut count = 0;
    for dr in -1i64..=1 {
        for dc in -1i64..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let r = (row as i64 + dr).rem_euclid(rows as i64) as u32;
            let c = (col as i64 + dc).rem_euclid(cols as i64) as u32;
            if grid.get(&(r, c)).is_some_and(|(_, alive)| *alive) {
                count += 1;
            }
        }
    }
    count
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use hive::{
    life::{self, GenerationAdvanced, LifeScenario},
    logging::init_logging,
    CommandDispatcher, Runtime, World,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Conway's Life on the hive runtime")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/life.yaml")]
    scenario: PathBuf,

    /// Override step count (uses scenario default when omitted)
    #[arg(long)]
    steps: Option<u64>,

    /// Override the seed used to populate the grid
    #[arg(long)]
    seed: Option<u64>,

    /// Write a snapshot of the final state to this file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Only print the final grid
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut scenario = LifeScenario::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    init_logging(&scenario.logging)?;
    let steps = cli.steps.unwrap_or(scenario.steps);

    let mut runtime = Runtime::with_config(scenario.runtime.clone());
    life::setup(&mut runtime, &scenario)?;
    runtime.world_mut().events_mut().on(
        |event: &GenerationAdvanced, _: &mut World, _: &mut CommandDispatcher| {
            info!(generation = event.generation, alive = event.alive, "generation advanced");
            Ok(())
        },
    );

    info!(scenario = %scenario.name, seed = scenario.seed, steps, "starting run");
    for _ in 0..steps {
        runtime.step()?;
        if !cli.quiet {
            println!("{}\n", life::render(runtime.world()));
        }
    }
    if cli.quiet {
        println!("{}", life::render(runtime.world()));
    }

    if let Some(path) = cli.snapshot {
        let registry = life::snapshot_registry()?;
        runtime.snapshot(&registry)?.save(&path)?;
        info!(path = %path.display(), "snapshot written");
    }

    println!(
        "Scenario '{}' completed {} steps, {} cells alive.",
        scenario.name,
        runtime.steps(),
        life::alive_count(runtime.world())
    );
    if let Some(avg) = runtime.average_step_time() {
        println!("Average step time: {avg:?}");
    }

    Ok(())
}

//! Belief Mesh Driver
//!
//! Seeds a population of agents, runs rounds of belief revision over the
//! relevance topology, journals every delivery and writes a final snapshot.
//!
//! Examples:
//!   belief_mesh --rounds 50 --agents 12
//!   belief_mesh --config mesh.toml --output-dir output/
//!   belief_mesh --print-default-config > mesh.toml

use clap::Parser;
use mesh_core::{MeshConfig, MeshError, MessageJournal, RelevanceMode, Scenario};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Belief mesh driver
#[derive(Parser, Debug)]
#[command(name = "belief_mesh")]
#[command(about = "Runs a seeded multi-agent belief mesh")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed, overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Number of agents, overrides the config file
    #[arg(long)]
    agents: Option<usize>,

    /// Number of rounds, overrides the config file
    #[arg(long)]
    rounds: Option<u32>,

    /// Connect agents when either one finds the other relevant
    #[arg(long)]
    either: bool,

    /// Directory for the journal and snapshot
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<(), MeshError> {
    let args = Args::parse();
    init_tracing();

    if args.print_default_config {
        print!("{}", MeshConfig::default_toml()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => MeshConfig::from_file(path)?,
        None => MeshConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.scenario.seed = seed;
    }
    if let Some(agents) = args.agents {
        config.scenario.agent_count = agents;
    }
    if let Some(rounds) = args.rounds {
        config.scenario.rounds = rounds;
    }
    if args.either {
        config.topology.relevance_mode = RelevanceMode::Either;
    }

    fs::create_dir_all(&args.output_dir)?;
    let mut journal = MessageJournal::new(args.output_dir.join("messages.jsonl"))?;

    let mut scenario = Scenario::from_config(&config)?;
    let rounds = scenario.run(&mut journal)?;
    journal.flush()?;

    for round in &rounds {
        if let (Some(speaker), Some(proposition)) = (&round.speaker, &round.proposition) {
            let delivered = round.delivery.as_ref().map_or(0, |d| d.delivered_count);
            tracing::info!(
                round = round.round,
                speaker = %speaker,
                proposition = %proposition,
                cascaded = round.cascaded,
                delivered,
                edges = round.edges,
                "round"
            );
        }
    }

    let stats = scenario.system().topology().read().stats();
    tracing::info!(
        agents = stats.agent_count,
        edges = stats.edge_count,
        isolated = stats.isolated_agents.len(),
        journal_entries = journal.entry_count(),
        "run complete"
    );

    scenario
        .snapshot()
        .write_to(&args.output_dir.join("mesh_snapshot.json"))?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

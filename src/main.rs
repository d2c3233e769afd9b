//! # tour-planner
//!
//! Reads a problem file, plans a closed tour from the first waypoint through
//! all others and prints the visiting order.

use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::PathBuf;

use tour_planner::distance::{DEFAULT_BROUTER_PROFILE, DEFAULT_BROUTER_URL};
use tour_planner::report::{generate_plot, render_route};
use tour_planner::{read_problem, BrouterProvider, CancellationToken, HaversineProvider, TourPlanner};

#[derive(Parser)]
#[command(name = "tour-planner")]
#[command(about = "Plans a short round trip through a set of waypoints")]
#[command(long_about = "Plans a short round trip through a set of waypoints.

The problem file is JSON with a \"waypoints\" list ({latitude, longitude, name});
the first waypoint is where the tour starts and ends. For real runs against a
routing service, --mutation-probability 0.3 --max-stagnant-attempts 1000 are
good starting values.")]
struct Cli {
    /// Problem file (JSON)
    problem: PathBuf,

    /// Where pairwise distances come from
    #[arg(long, value_enum, default_value_t = ProviderKind::Haversine)]
    provider: ProviderKind,

    /// BRouter endpoint used with --provider brouter
    #[arg(long, default_value = DEFAULT_BROUTER_URL)]
    brouter_url: String,

    /// BRouter routing profile
    #[arg(long, default_value = DEFAULT_BROUTER_PROFILE)]
    profile: String,

    /// Seed for a reproducible search
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    mutation_probability: Option<f64>,

    #[arg(long)]
    max_stagnant_attempts: Option<usize>,

    #[arg(long)]
    population_size: Option<usize>,

    #[arg(long)]
    max_generations: Option<usize>,

    /// Concurrent distance queries
    #[arg(long)]
    workers: Option<usize>,

    /// Write a PNG of the route to this path
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    /// Great-circle distance, no network
    Haversine,
    /// Track length from a BRouter routing service
    Brouter,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let mut problem = read_problem(&cli.problem)?;
    info!("Problem: {} ({} waypoints)", problem.name, problem.waypoints.len());

    // Command line settings win over the problem file
    let optimizer = &mut problem.optimizer;
    if let Some(p) = cli.mutation_probability {
        optimizer.mutation_probability = p;
    }
    if let Some(k) = cli.max_stagnant_attempts {
        optimizer.max_stagnant_attempts = k;
    }
    if let Some(size) = cli.population_size {
        optimizer.population_size = size;
    }
    if cli.max_generations.is_some() {
        optimizer.max_generations = cli.max_generations;
    }
    if cli.workers.is_some() {
        problem.matrix.workers = cli.workers;
    }

    let planner = TourPlanner::from_problem(&problem)?;

    let cancel = CancellationToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted by user. Finishing gracefully...");
        handler_cancel.cancel();
    })?;

    let mut rng = match cli.seed {
        Some(seed) => {
            info!("Using seed: {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let planned = match cli.provider {
        ProviderKind::Haversine => planner.plan(&problem.waypoints, &HaversineProvider, &mut rng, &cancel)?,
        ProviderKind::Brouter => {
            let provider = BrouterProvider::new(cli.brouter_url, cli.profile)?;
            planner.plan(&problem.waypoints, &provider, &mut rng, &cancel)?
        }
    };

    println!("\nTour for {}:", problem.name);
    print!("{}", render_route(&planned, &problem.waypoints));

    if let Some(path) = &cli.plot {
        generate_plot(&planned, &problem.waypoints, &problem.name, path)?;
    }

    Ok(())
}

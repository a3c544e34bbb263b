use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use traffic_auction::simulation::{
    CarKind, ConsoleRenderer, ProtocolKind, RandomTrips, RouteStyle, ScriptedTrips, SimConfig, Simulator,
    TripGenerator, DEFAULT_HIGH_COST, DEFAULT_HIGH_PRIORITY_PROBABILITY, DEFAULT_OPTIMAL_PROBABILITY,
    VALUATION_HORIZON,
};

#[derive(Parser)]
#[command(name = "traffic_auction")]
#[command(about = "Signal-free intersection simulation with auction-based right-of-way")]
struct Cli {
    /// Conflict resolution protocol: random, vcg, button, greedy, greedy_random, generalized_greedy_<k>
    #[arg(long, default_value = "random")]
    protocol: String,

    /// Bidding strategy of every car: random, truthful, aggressive, statistically_aggressive
    #[arg(long, default_value = "truthful")]
    car: String,

    /// Strategy of one tracked car (the last car id), reported separately
    #[arg(long)]
    my_car: Option<String>,

    #[arg(long, default_value_t = 100)]
    num_cars: usize,

    #[arg(long, default_value_t = 10)]
    num_rounds: usize,

    /// Streets per axis; the board is 2 * num_roads + 1 cells wide
    #[arg(long, default_value_t = 5)]
    num_roads: usize,

    /// Cost per iteration of a high-priority car
    #[arg(long, default_value_t = DEFAULT_HIGH_COST)]
    high_cost: f64,

    #[arg(long, default_value_t = DEFAULT_HIGH_PRIORITY_PROBABILITY)]
    high_priority_probability: f64,

    /// Trip file; overrides --num-cars and --num-roads
    #[arg(long)]
    config_filename: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// 1 logs per round, 2 also prints the board every iteration, 3 traces every conflict
    #[arg(short, long, default_value_t = 0)]
    verbose: u8,

    /// Let cars escalate regardless of their reward balance
    #[arg(long)]
    force_unlimited_reward: bool,

    /// Lookahead horizon used by the button protocol
    #[arg(long, default_value_t = VALUATION_HORIZON)]
    lookahead: usize,

    /// Probability that greedy_random resolves a conflict greedily
    #[arg(long, default_value_t = DEFAULT_OPTIMAL_PROBABILITY)]
    optimal_probability: f64,

    /// Generate routes with one turn instead of straight crossings
    #[arg(long)]
    turning_routes: bool,
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(cli.verbose))).init();

    let mut config = SimConfig {
        protocol: cli.protocol.parse::<ProtocolKind>()?,
        car_kind: cli.car.parse::<CarKind>()?,
        my_car_kind: cli.my_car.as_deref().map(str::parse::<CarKind>).transpose()?,
        num_cars: cli.num_cars,
        num_roads: cli.num_roads,
        num_rounds: cli.num_rounds,
        high_cost: cli.high_cost,
        high_priority_probability: cli.high_priority_probability,
        force_unlimited_reward: cli.force_unlimited_reward,
        button_horizon: cli.lookahead,
        optimal_probability: cli.optimal_probability,
        seed: cli.seed,
        verbosity: cli.verbose,
    };

    let trips: Box<dyn TripGenerator> = match &cli.config_filename {
        Some(path) => {
            let scripted = ScriptedTrips::from_file(path)?;
            config.num_cars = scripted.num_cars();
            config.num_roads = scripted.num_roads();
            info!("loaded {} trips from {}", scripted.num_cars(), path);
            Box::new(scripted)
        }
        None => {
            let style = if cli.turning_routes {
                RouteStyle::Turning
            } else {
                RouteStyle::Straight
            };
            Box::new(
                RandomTrips::new(config.width(), config.height(), config.high_priority_probability, config.seed)
                    .with_style(style),
            )
        }
    };

    let mut simulator = Simulator::new(config.clone(), trips).context("Invalid simulation configuration")?;
    let renderer = ConsoleRenderer::new(simulator.context());
    simulator.add_observer(Box::new(renderer));
    let summary = simulator.run().context("Simulation aborted")?;

    println!("CONFIGURATION: {}", config);
    println!("{}", summary);
    Ok(())
}

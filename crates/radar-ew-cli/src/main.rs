//! Command-line runner for the radar/EW closed-loop simulation.
//!
//! Runs the sensor and effector threads for a fixed number of ticks and
//! prints an end-of-run summary. Log verbosity follows `RUST_LOG`.

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use radar_ew_signal::TargetTruth;
use radar_ew_sim::{CfarKind, SimConfig, SimError, Simulation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CfarArg {
    /// Cell-averaging CFAR.
    Ca,
    /// Ordered-statistic CFAR.
    Os,
}

/// Closed-loop radar sensor / EW effector simulation.
#[derive(Debug, Parser)]
#[command(name = "radar-ew", version, about)]
struct Args {
    /// Number of sensor ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Sensor tick rate in Hz.
    #[arg(long, default_value_t = 20.0)]
    rate_hz: f64,

    /// RNG seed (synthesis and EW perturbations).
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// CFAR estimator.
    #[arg(long, value_enum, default_value_t = CfarArg::Ca)]
    cfar: CfarArg,

    /// Number of simulated targets (1-8).
    #[arg(long, default_value_t = 2)]
    targets: usize,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn scenario(count: usize) -> Vec<TargetTruth> {
    // A spread of ranges and closing rates; odd indices recede.
    (0..count.clamp(1, 8))
        .map(|i| {
            let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
            TargetTruth {
                range_m: 900.0 + 700.0 * i as f64,
                velocity_mps: sign * (20.0 + 12.0 * i as f64),
                snr_db: 24.0,
            }
        })
        .collect()
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(&args) {
        tracing::error!(%err, "run aborted");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let cfar_kind = match args.cfar {
        CfarArg::Ca => CfarKind::CellAveraging,
        CfarArg::Os => CfarKind::OrderedStatistic,
    };

    let config = SimConfig::builder()
        .tick_rate_hz(args.rate_hz)
        .seed(args.seed)
        .cfar_kind(cfar_kind)
        .targets(scenario(args.targets))
        .build();

    let summary = Simulation::new(config)?.run(args.ticks)?;

    if args.json {
        // Summary serialization cannot fail; it is plain data.
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::error!(%err, "summary serialization failed"),
        }
        return Ok(());
    }

    println!("ticks run            {}", summary.ticks);
    println!("frames published     {}", summary.frames_published);
    println!("confirmed tracks     {}", summary.confirmed_tracks);
    println!("live tracks          {}", summary.live_tracks);
    println!(
        "intel queue          published {} / delivered {} / dropped {}",
        summary.bus.intel_published, summary.bus.intel_delivered, summary.bus.intel_dropped
    );
    println!(
        "attack queue         published {} / delivered {} / dropped {}",
        summary.bus.attack_published, summary.bus.attack_delivered, summary.bus.attack_dropped
    );
    println!("effector decisions   {}", summary.effector_decisions);
    for status in &summary.health {
        println!(
            "subsystem {:9} {} (failures {}, last error {})",
            status.name,
            status.state,
            status.failure_count,
            status.last_error.as_deref().unwrap_or("none")
        );
    }
    Ok(())
}

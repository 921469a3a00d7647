//! Velocity Chain Binary
//!
//! Builds a 1D trajectory of positions linked by constant-velocity constraints, evaluates
//! every residual block on noisy positions, then snaps the positions back onto the
//! constant-velocity line through `Values::retract` and evaluates again.
//!
//! # Usage
//! ```bash
//! cargo run --release --bin velocity_chain
//!
//! # Longer chain, serial evaluation:
//! cargo run --release --bin velocity_chain -- --steps 10000 --sequential
//!
//! # Softer constraint and larger perturbation:
//! cargo run --release --bin velocity_chain -- --mu 10 --noise 0.5
//! ```

use clap::Parser;
use geofactor::{
    EvaluationConfig, ResidualBlock, Values, VelocityConstraint, evaluate_blocks, init_logger,
    total_error,
};
use nalgebra::DVector;
use std::collections::HashMap;
use std::error::Error;
use std::time::Instant;
use tracing::info;

/// Evaluate a chain of constant-velocity constraints
#[derive(Parser)]
#[command(name = "velocity_chain")]
#[command(about = "Evaluate a chain of constant-velocity constraints")]
struct Args {
    /// Number of constraints in the chain
    #[arg(short = 'n', long, default_value_t = 1000)]
    steps: usize,

    /// Time step between consecutive positions
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Penalty weight of every constraint
    #[arg(long, default_value_t = 1000.0)]
    mu: f64,

    /// True velocity of the trajectory
    #[arg(short = 'v', long, default_value_t = 2.0)]
    velocity: f64,

    /// Amplitude of the uniform noise added to every position
    #[arg(long, default_value_t = 0.05)]
    noise: f64,

    /// Evaluate blocks on the current thread only
    #[arg(long)]
    sequential: bool,
}

fn position_key(i: usize) -> String {
    format!("x{i}")
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_logger();

    info!("GEOFACTOR VELOCITY CHAIN");
    info!("");

    let mut values = Values::new();
    values.insert("v", args.velocity);
    for i in 0..=args.steps {
        let perturbation = (rand::random::<f64>() * 2.0 - 1.0) * args.noise;
        values.insert(
            position_key(i),
            i as f64 * args.velocity * args.dt + perturbation,
        );
    }

    let blocks = (0..args.steps)
        .map(|i| {
            let factor = VelocityConstraint::new(
                position_key(i),
                position_key(i + 1),
                "v",
                args.dt,
                args.mu,
            )?;
            Ok(ResidualBlock::new(i, Box::new(factor)))
        })
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;

    let config = EvaluationConfig::default().with_parallel(!args.sequential);

    info!("Problem statistics:");
    info!("  Residual blocks: {}", blocks.len());
    info!("  Variables: {}", values.len());
    info!("  Tangent dimension: {}", values.dimension());
    info!("  Parallel: {}", config.parallel);
    info!("");

    let start = Instant::now();
    let noisy = evaluate_blocks(&blocks, &values, &config)?;
    info!(
        "Noisy positions:    total error = {:.6e} ({:?})",
        total_error(&noisy),
        start.elapsed()
    );

    // Move every position onto x0 + i·v·dt.
    let x0 = values
        .try_get(&position_key(0))?
        .as_scalar()
        .ok_or("x0 is not a scalar")?;
    let mut deltas = HashMap::new();
    for i in 1..=args.steps {
        let key = position_key(i);
        let current = values.try_get(&key)?.as_scalar().ok_or("position is not a scalar")?;
        let target = x0 + i as f64 * args.velocity * args.dt;
        deltas.insert(key, DVector::from_element(1, target - current));
    }
    let corrected = values.retract(&deltas)?;

    let start = Instant::now();
    let smoothed = evaluate_blocks(&blocks, &corrected, &config)?;
    info!(
        "Corrected positions: total error = {:.6e} ({:?})",
        total_error(&smoothed),
        start.elapsed()
    );

    Ok(())
}

//! # Geofactor
//!
//! Manifold-valued parameters and analytic residual factors for nonlinear least squares.
//!
//! ## Features
//!
//! - **Manifold contract**: fixed tangent dimension, `retract`, `local_coordinates` and
//!   tolerance-based `equals` for every parameter type
//! - **Epipolar parameters**: general and calibrated fundamental matrices with 7 DOF, built
//!   on SO(3), S² and essential-matrix charts
//! - **Residual factors**: per-variable analytic Jacobians computed only on request
//! - **Parallel evaluation**: residual blocks evaluated on the rayon thread pool against a
//!   read-only variable store

pub mod core;
pub mod error;
pub mod factors;
pub mod logger;
pub mod manifold;

// Re-export core types
pub use core::noise_model::{ConstrainedNoise, IsotropicNoise, NoiseModel};
pub use core::residual_block::{
    BlockEvaluation, EvaluationConfig, ResidualBlock, evaluate_blocks, total_error,
};
pub use core::variable::{Value, Values};
pub use error::{GeofactorError, GeofactorResult};

// Re-export factor types
pub use factors::{
    Factor, FactorError, FactorResult, JacobianRequest, Linearization, VelocityConstraint,
};

// Re-export logger
pub use logger::{init_logger, init_logger_with_level};

// Re-export manifold types
pub use manifold::{
    EpipolarGeometry, Manifold, ManifoldError, ManifoldResult, essential::EssentialMatrix,
    fundamental::FundamentalMatrix, simple_fundamental::SimpleFundamentalMatrix, so3::SO3,
    unit3::Unit3,
};

//! Core evaluation components for the geofactor library
//!
//! This module contains the pieces an external optimizer drives on every iteration:
//! - Noise models that whiten factor residuals
//! - The keyed store of manifold-valued variables
//! - Residual blocks and the (optionally parallel) evaluation pass over them

pub mod noise_model;
pub mod residual_block;
pub mod variable;

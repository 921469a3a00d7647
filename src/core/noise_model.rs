//! Weighting models that turn raw factor residuals into the quantities the solver minimizes.
//!
//! A factor only produces a raw residual `r` and its Jacobians. The noise model attached to
//! it whitens both and defines the weighted cost:
//!
//! ```text
//! cost = ½ · ‖r‖²_Σ
//! ```
//!
//! # Available Models
//!
//! - [`IsotropicNoise`]: every row divided by the same standard deviation σ
//! - [`ConstrainedNoise`]: rows with σ = 0 are hard constraints, penalized with weight μ
//!
//! # Example
//!
//! ```
//! use geofactor::core::noise_model::{ConstrainedNoise, NoiseModel};
//! use nalgebra::dvector;
//!
//! let hard = ConstrainedNoise::all(1, 1000.0).unwrap();
//! assert!(hard.is_constrained());
//! let whitened = hard.whiten(&dvector![0.2]);
//! assert!((hard.squared_mahalanobis_distance(&dvector![0.2]) - 40.0).abs() < 1e-9);
//! assert!((whitened.norm_squared() - 40.0).abs() < 1e-9);
//! ```

use crate::error::{GeofactorError, GeofactorResult};
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;
use tracing::warn;

/// Weighting applied to a factor residual.
///
/// Implementations are immutable and shared between threads during parallel evaluation.
pub trait NoiseModel: Debug + Send + Sync {
    /// Residual dimension this model expects.
    fn dim(&self) -> usize;

    /// Whiten a raw residual, so that `whiten(r).norm_squared()` is the weighted distance.
    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64>;

    /// Whiten a Jacobian block row-wise, consistently with [`NoiseModel::whiten`].
    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64>;

    /// Weighted squared norm of a raw residual.
    fn squared_mahalanobis_distance(&self, residual: &DVector<f64>) -> f64;

    /// Cost contribution ½ · ‖r‖²_Σ.
    fn error(&self, residual: &DVector<f64>) -> f64 {
        0.5 * self.squared_mahalanobis_distance(residual)
    }

    /// Whether any row is a hard constraint.
    fn is_constrained(&self) -> bool {
        false
    }
}

/// Isotropic Gaussian noise with standard deviation σ on every row.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicNoise {
    dim: usize,
    sigma: f64,
}

impl IsotropicNoise {
    /// Create an isotropic model.
    ///
    /// # Returns
    ///
    /// `Ok(IsotropicNoise)` if sigma > 0, otherwise an error
    pub fn new(dim: usize, sigma: f64) -> GeofactorResult<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(GeofactorError::InvalidInput(
                "sigma needs to be larger than zero".to_string(),
            ));
        }
        Ok(IsotropicNoise { dim, sigma })
    }

    /// Standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl NoiseModel for IsotropicNoise {
    fn dim(&self) -> usize {
        self.dim
    }

    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        residual / self.sigma
    }

    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        jacobian / self.sigma
    }

    fn squared_mahalanobis_distance(&self, residual: &DVector<f64>) -> f64 {
        residual.norm_squared() / (self.sigma * self.sigma)
    }
}

/// Diagonal noise where rows with σ = 0 are hard constraints.
///
/// Constrained rows are scaled by `√μᵢ` and contribute `μᵢ · rᵢ²` to the distance; the
/// remaining rows behave like a diagonal Gaussian `(rᵢ / σᵢ)²`. Large μ approximates an
/// infinite-weight equality constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedNoise {
    sigmas: DVector<f64>,
    mu: DVector<f64>,
}

/// Penalty weight used when none is specified.
pub const DEFAULT_CONSTRAINT_MU: f64 = 1000.0;

fn check_mu(mu: f64) -> GeofactorResult<()> {
    if !mu.is_finite() || mu <= 0.0 {
        warn!("rejecting constraint weight mu = {mu}");
        return Err(GeofactorError::InvalidInput(format!(
            "mu needs to be larger than zero, got {mu}"
        )));
    }
    Ok(())
}

impl ConstrainedNoise {
    /// Every one of the `dim` rows is a hard constraint with penalty weight `mu`.
    ///
    /// # Returns
    ///
    /// `Ok(ConstrainedNoise)` if mu > 0, otherwise an error
    pub fn all(dim: usize, mu: f64) -> GeofactorResult<Self> {
        check_mu(mu)?;
        Ok(ConstrainedNoise {
            sigmas: DVector::zeros(dim),
            mu: DVector::from_element(dim, mu),
        })
    }

    /// Mix hard (σ = 0) and soft (σ > 0) rows sharing one penalty weight `mu`.
    pub fn mixed_sigmas(sigmas: DVector<f64>, mu: f64) -> GeofactorResult<Self> {
        check_mu(mu)?;
        if let Some(bad) = sigmas.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(GeofactorError::InvalidInput(format!(
                "sigmas must be non-negative, got {bad}"
            )));
        }
        let dim = sigmas.len();
        Ok(ConstrainedNoise {
            sigmas,
            mu: DVector::from_element(dim, mu),
        })
    }

    /// Per-row standard deviations (0 for constrained rows).
    pub fn sigmas(&self) -> &DVector<f64> {
        &self.sigmas
    }

    /// Per-row penalty weights.
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// Whether row `i` is a hard constraint.
    pub fn constrained(&self, i: usize) -> bool {
        self.sigmas[i] == 0.0
    }

    /// Row scale applied by whitening: `√μᵢ` on constrained rows, `1 / σᵢ` elsewhere.
    fn row_scale(&self, i: usize) -> f64 {
        if self.constrained(i) {
            self.mu[i].sqrt()
        } else {
            1.0 / self.sigmas[i]
        }
    }
}

impl NoiseModel for ConstrainedNoise {
    fn dim(&self) -> usize {
        self.sigmas.len()
    }

    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(residual.len(), |i, _| residual[i] * self.row_scale(i))
    }

    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        let mut whitened = jacobian.clone();
        for i in 0..whitened.nrows() {
            whitened.row_mut(i).scale_mut(self.row_scale(i));
        }
        whitened
    }

    fn squared_mahalanobis_distance(&self, residual: &DVector<f64>) -> f64 {
        residual
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if self.constrained(i) {
                    self.mu[i] * r * r
                } else {
                    let w = r / self.sigmas[i];
                    w * w
                }
            })
            .sum()
    }

    fn is_constrained(&self) -> bool {
        self.sigmas.iter().any(|s| *s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_constrained_all() -> GeofactorResult<()> {
        let model = ConstrainedNoise::all(2, 50.0)?;
        assert_eq!(model.dim(), 2);
        assert!(model.is_constrained());
        assert!(model.constrained(0) && model.constrained(1));

        let residual = dvector![0.1, -0.2];
        let scale = 50.0_f64.sqrt();
        assert!((model.whiten(&residual) - &residual * scale).norm() < TOLERANCE);
        let expected = 50.0 * (0.01 + 0.04);
        assert!((model.squared_mahalanobis_distance(&residual) - expected).abs() < TOLERANCE);
        assert!((model.error(&residual) - 0.5 * expected).abs() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_constrained_rejects_non_positive_mu() {
        for mu in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ConstrainedNoise::all(1, mu),
                Err(GeofactorError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_constrained_mixed_sigmas() -> GeofactorResult<()> {
        let model = ConstrainedNoise::mixed_sigmas(dvector![0.0, 0.5], 10.0)?;
        assert!(model.constrained(0));
        assert!(!model.constrained(1));

        let residual = dvector![0.3, 0.4];
        let scale = 10.0_f64.sqrt();
        let whitened = model.whiten(&residual);
        assert!((&whitened - dvector![0.3 * scale, 0.8]).norm() < TOLERANCE);
        let expected = 10.0 * 0.09 + 0.64;
        assert!((model.squared_mahalanobis_distance(&residual) - expected).abs() < TOLERANCE);
        assert!((whitened.norm_squared() - expected).abs() < TOLERANCE);

        let jacobian = dmatrix![1.0, -1.0; 2.0, 4.0];
        let whitened = model.whiten_jacobian(&jacobian);
        assert!((whitened - dmatrix![scale, -scale; 4.0, 8.0]).norm() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_constrained_rejects_negative_sigma() {
        assert!(ConstrainedNoise::mixed_sigmas(dvector![0.0, -0.1], 1.0).is_err());
    }

    #[test]
    fn test_isotropic_noise() -> GeofactorResult<()> {
        let model = IsotropicNoise::new(2, 0.5)?;
        assert!(!model.is_constrained());
        assert_eq!(model.sigma(), 0.5);
        assert!((model.whiten(&dvector![1.0, 2.0]) - dvector![2.0, 4.0]).norm() < TOLERANCE);
        assert!((model.squared_mahalanobis_distance(&dvector![1.0, 0.0]) - 4.0).abs() < TOLERANCE);
        assert!(IsotropicNoise::new(2, 0.0).is_err());
        Ok(())
    }
}

//! Calibrated two-view fundamental matrix.
//!
//! Parameterized by an essential matrix `E` and the focal lengths `fa`, `fb` of the left and
//! right cameras (7 degrees of freedom). The principal points `ca`, `cb` are convenience
//! attributes: they enter the dense matrix but are never perturbed by `retract` nor
//! reported by `local_coordinates`.
//!
//! ```text
//! F = Ka · E · Kb⁻¹,   K = [f 0 cx; 0 f cy; 0 0 1]
//! ```
//!
//! Tangent vectors are ordered `[E (5), fa (1), fb (1)]`.

use super::{
    EpipolarGeometry, Manifold, ManifoldError, ManifoldResult, check_tangent_dimension,
    essential::EssentialMatrix,
};
use nalgebra::{DVector, Matrix3, Point2};
use std::fmt;
use tracing::warn;

/// Essential matrix plus per-camera focal lengths and fixed principal points.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFundamentalMatrix {
    e: EssentialMatrix,
    fa: f64,
    fb: f64,
    ca: Point2<f64>,
    cb: Point2<f64>,
}

impl Default for SimpleFundamentalMatrix {
    /// Default essential matrix, unit focal lengths, principal points at the origin.
    fn default() -> Self {
        SimpleFundamentalMatrix {
            e: EssentialMatrix::default(),
            fa: 1.0,
            fb: 1.0,
            ca: Point2::origin(),
            cb: Point2::origin(),
        }
    }
}

impl fmt::Display for SimpleFundamentalMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimpleFundamentalMatrix(E: {}, fa: {:.4}, fb: {:.4}, ca: [{:.4}, {:.4}], cb: [{:.4}, {:.4}])",
            self.e, self.fa, self.fb, self.ca.x, self.ca.y, self.cb.x, self.cb.y
        )
    }
}

fn check_focal_length(name: &str, focal: f64) -> ManifoldResult<()> {
    if !focal.is_finite() || focal <= 0.0 {
        warn!("rejecting focal length {name} = {focal}");
        return Err(ManifoldError::InvalidElement(format!(
            "focal length {name} must be positive and finite, got {focal}"
        )));
    }
    Ok(())
}

fn check_principal_point(name: &str, c: &Point2<f64>) -> ManifoldResult<()> {
    if !c.x.is_finite() || !c.y.is_finite() {
        warn!("rejecting principal point {name} = ({}, {})", c.x, c.y);
        return Err(ManifoldError::InvalidElement(format!(
            "principal point {name} must be finite, got ({}, {})",
            c.x, c.y
        )));
    }
    Ok(())
}

impl SimpleFundamentalMatrix {
    /// Create from an essential matrix, focal lengths and principal points.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidElement`] if a focal length is not positive or a principal
    /// point is not finite.
    pub fn new(
        e: EssentialMatrix,
        fa: f64,
        fb: f64,
        ca: Point2<f64>,
        cb: Point2<f64>,
    ) -> ManifoldResult<Self> {
        check_focal_length("fa", fa)?;
        check_focal_length("fb", fb)?;
        check_principal_point("ca", &ca)?;
        check_principal_point("cb", &cb)?;
        Ok(SimpleFundamentalMatrix { e, fa, fb, ca, cb })
    }

    /// Create with both principal points at the origin.
    pub fn with_focal_lengths(e: EssentialMatrix, fa: f64, fb: f64) -> ManifoldResult<Self> {
        Self::new(e, fa, fb, Point2::origin(), Point2::origin())
    }

    /// Essential matrix.
    pub fn essential(&self) -> &EssentialMatrix {
        &self.e
    }

    /// Left focal length.
    pub fn fa(&self) -> f64 {
        self.fa
    }

    /// Right focal length.
    pub fn fb(&self) -> f64 {
        self.fb
    }

    /// Left principal point.
    pub fn ca(&self) -> &Point2<f64> {
        &self.ca
    }

    /// Right principal point.
    pub fn cb(&self) -> &Point2<f64> {
        &self.cb
    }

    /// Left calibration matrix.
    pub fn ka(&self) -> Matrix3<f64> {
        calibration(self.fa, &self.ca)
    }

    /// Right calibration matrix.
    pub fn kb(&self) -> Matrix3<f64> {
        calibration(self.fb, &self.cb)
    }
}

fn calibration(focal: f64, principal_point: &Point2<f64>) -> Matrix3<f64> {
    Matrix3::new(
        focal,
        0.0,
        principal_point.x,
        0.0,
        focal,
        principal_point.y,
        0.0,
        0.0,
        1.0,
    )
}

/// Closed-form inverse of a calibration matrix.
fn calibration_inverse(focal: f64, principal_point: &Point2<f64>) -> Matrix3<f64> {
    let inv_f = 1.0 / focal;
    Matrix3::new(
        inv_f,
        0.0,
        -principal_point.x * inv_f,
        0.0,
        inv_f,
        -principal_point.y * inv_f,
        0.0,
        0.0,
        1.0,
    )
}

impl Manifold for SimpleFundamentalMatrix {
    const DIM: usize = 7;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        let e = self.e.retract(&delta.rows(0, 5).into_owned())?;
        let fa = self.fa + delta[5];
        let fb = self.fb + delta[6];
        // principal points are copied through untouched
        Self::new(e, fa, fb, self.ca, self.cb)
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        let mut result = DVector::zeros(Self::DIM);
        result
            .rows_mut(0, 5)
            .copy_from(&self.e.local_coordinates(&other.e));
        result[5] = other.fa - self.fa;
        result[6] = other.fb - self.fb;
        result
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        self.e.equals(&other.e, tolerance)
            && (self.fa - other.fa).abs() < tolerance
            && (self.fb - other.fb).abs() < tolerance
            && (self.ca - other.ca).norm() < tolerance
            && (self.cb - other.cb).norm() < tolerance
    }
}

impl EpipolarGeometry for SimpleFundamentalMatrix {
    /// `Ka · E · Kb⁻¹`
    fn matrix(&self) -> Matrix3<f64> {
        self.ka() * self.e.matrix() * calibration_inverse(self.fb, &self.cb)
    }
}

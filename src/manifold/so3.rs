//! SO3 - Special Orthogonal Group in 3D
//!
//! Rotation chart used by the two-view parameters. Elements are stored as nalgebra unit
//! quaternions; tangent elements are axis-angle vectors in R³ (direction is the rotation
//! axis, magnitude the angle).
//!
//! The chart is the right perturbation model:
//!
//! ```text
//! retract(R, θ)          = R · Exp(θ)
//! local_coordinates(R,Q) = Log(Rᵀ · Q)
//! ```

use super::{
    DEFAULT_TOLERANCE, Manifold, ManifoldError, ManifoldResult, SMALL_ANGLE_THRESHOLD,
    check_tangent_dimension,
};
use nalgebra::{DVector, Matrix3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};
use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// Maximum deviation from orthonormality accepted when building from a raw matrix.
const ORTHONORMALITY_TOLERANCE: f64 = 1e-6;

/// SO(3) group element representing rotations in 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct SO3 {
    quaternion: UnitQuaternion<f64>,
}

impl Display for SO3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let q = self.quaternion.quaternion();
        write!(
            f,
            "SO3(quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            q.w, q.i, q.j, q.k
        )
    }
}

impl Default for SO3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl SO3 {
    /// Get the identity rotation.
    pub fn identity() -> Self {
        SO3 {
            quaternion: UnitQuaternion::identity(),
        }
    }

    /// Create a new SO(3) element from a unit quaternion.
    #[inline]
    pub fn new(quaternion: UnitQuaternion<f64>) -> Self {
        SO3 { quaternion }
    }

    /// Create SO(3) from quaternion coefficients in nalgebra convention `[w, x, y, z]`.
    ///
    /// The coefficients are normalized.
    pub fn from_quaternion_wxyz(w: f64, x: f64, y: f64, z: f64) -> Self {
        SO3::new(UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)))
    }

    /// Create SO(3) from Euler angles (roll, pitch, yaw).
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64) -> Self {
        SO3::new(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Create SO(3) from axis-angle representation.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let unit_axis = Unit::new_normalize(*axis);
        SO3::new(UnitQuaternion::from_axis_angle(&unit_axis, angle))
    }

    /// Create SO(3) from a dense rotation matrix.
    ///
    /// # Errors
    /// [`ManifoldError::InvalidElement`] if the matrix is not orthonormal with determinant +1.
    pub fn from_rotation_matrix(matrix: &Matrix3<f64>) -> ManifoldResult<Self> {
        let orthogonality = (matrix.transpose() * matrix - Matrix3::identity()).norm();
        if !orthogonality.is_finite() || orthogonality > ORTHONORMALITY_TOLERANCE {
            return Err(ManifoldError::InvalidElement(format!(
                "rotation matrix is not orthonormal (‖RᵀR - I‖ = {orthogonality:e})"
            )));
        }
        let determinant = matrix.determinant();
        if (determinant - 1.0).abs() > ORTHONORMALITY_TOLERANCE {
            return Err(ManifoldError::InvalidElement(format!(
                "rotation matrix must have determinant +1, got {determinant}"
            )));
        }
        let rotation = Rotation3::from_matrix_unchecked(*matrix);
        Ok(SO3::new(UnitQuaternion::from_rotation_matrix(&rotation)))
    }

    /// Generate a random rotation (angles up to ~1 rad per axis).
    pub fn random() -> Self {
        SO3::new(UnitQuaternion::from_scaled_axis(Vector3::new(
            rand::random::<f64>() * 2.0 - 1.0,
            rand::random::<f64>() * 2.0 - 1.0,
            rand::random::<f64>() * 2.0 - 1.0,
        )))
    }

    /// Get the quaternion representation.
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Get the rotation matrix (3x3).
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.quaternion.to_rotation_matrix().into_inner()
    }

    /// Compute the inverse rotation Rᵀ.
    pub fn inverse(&self) -> Self {
        SO3 {
            quaternion: self.quaternion.inverse(),
        }
    }

    /// Compose this rotation with another: R₁ · R₂.
    pub fn compose(&self, other: &Self) -> Self {
        SO3 {
            quaternion: self.quaternion * other.quaternion,
        }
    }

    /// Relative rotation R₁ᵀ · R₂.
    pub fn between(&self, other: &Self) -> Self {
        self.inverse().compose(other)
    }

    /// Rotate a vector.
    pub fn act(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.quaternion * vector
    }

    /// Logarithmic map to the axis-angle tangent vector.
    ///
    /// θu = Log(q) = (2 / ‖v‖) · v · atan2(‖v‖, w)
    pub fn log(&self) -> SO3Tangent {
        let q = self.quaternion.quaternion();
        let sin_angle_squared = q.i * q.i + q.j * q.j + q.k * q.k;

        let log_coeff = if sin_angle_squared > SMALL_ANGLE_THRESHOLD {
            let sin_angle = sin_angle_squared.sqrt();
            let cos_angle = q.w;

            // q and -q encode the same rotation; keep the angle in [-π, π]
            let two_angle = 2.0
                * if cos_angle < 0.0 {
                    f64::atan2(-sin_angle, -cos_angle)
                } else {
                    f64::atan2(sin_angle, cos_angle)
                };

            two_angle / sin_angle
        } else {
            2.0
        };

        SO3Tangent::new(Vector3::new(
            q.i * log_coeff,
            q.j * log_coeff,
            q.k * log_coeff,
        ))
    }

    /// Geodesic distance (rotation angle of Rᵀ · Q).
    pub fn distance(&self, other: &Self) -> f64 {
        self.between(other).log().angle()
    }

    /// Approximate equality using [`DEFAULT_TOLERANCE`].
    pub fn is_approx(&self, other: &Self) -> bool {
        self.equals(other, DEFAULT_TOLERANCE)
    }
}

impl Manifold for SO3 {
    const DIM: usize = 3;

    fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Self> {
        check_tangent_dimension(delta, Self::DIM)?;
        let tangent = SO3Tangent::new(Vector3::new(delta[0], delta[1], delta[2]));
        Ok(self.compose(&tangent.exp()))
    }

    fn local_coordinates(&self, other: &Self) -> DVector<f64> {
        let theta = self.between(other).log().axis_angle();
        DVector::from_column_slice(theta.as_slice())
    }

    fn equals(&self, other: &Self, tolerance: f64) -> bool {
        self.distance(other) < tolerance
    }
}

/// SO(3) tangent space element (axis-angle vector).
#[derive(Debug, Clone, PartialEq)]
pub struct SO3Tangent {
    data: Vector3<f64>,
}

impl Display for SO3Tangent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "so3(axis-angle: [{:.4}, {:.4}, {:.4}])",
            self.data.x, self.data.y, self.data.z
        )
    }
}

impl SO3Tangent {
    /// Create a new SO3Tangent from axis-angle vector.
    #[inline]
    pub fn new(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent { data: axis_angle }
    }

    /// Get the axis-angle vector.
    #[inline]
    pub fn axis_angle(&self) -> Vector3<f64> {
        self.data
    }

    /// Get the angle of rotation.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.data.norm()
    }

    /// Exponential map: q = Exp(θu) = cos(θ/2) + u sin(θ/2).
    pub fn exp(&self) -> SO3 {
        let theta_squared = self.data.norm_squared();

        let quaternion = if theta_squared > SMALL_ANGLE_THRESHOLD {
            UnitQuaternion::from_scaled_axis(self.data)
        } else {
            UnitQuaternion::from_quaternion(Quaternion::new(
                1.0,
                self.data.x / 2.0,
                self.data.y / 2.0,
                self.data.z / 2.0,
            ))
        };

        SO3 { quaternion }
    }
}

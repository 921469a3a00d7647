//! Heterogeneous variable values and the keyed store factors read from.
//!
//! [`Value`] is the tagged union over every manifold type in the crate, so one store can
//! hold rotations, fundamental matrices and plain scalars side by side. [`Values`] maps
//! variable keys to values and is treated as read-only while factors are evaluated:
//! updates go through [`Values::retract`], which builds a new store.

use crate::error::{GeofactorError, GeofactorResult};
use crate::manifold::{
    Manifold, ManifoldError, ManifoldResult, essential::EssentialMatrix,
    fundamental::FundamentalMatrix, simple_fundamental::SimpleFundamentalMatrix, so3::SO3,
    unit3::Unit3,
};
use nalgebra::DVector;
use std::collections::HashMap;
use tracing::debug;

/// A single variable value on one of the supported manifolds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Real scalar (1 DOF)
    Scalar(f64),
    /// 3D rotation (3 DOF)
    Rotation(SO3),
    /// Direction on the unit sphere (2 DOF)
    Direction(Unit3),
    /// Essential matrix (5 DOF)
    Essential(EssentialMatrix),
    /// General fundamental matrix (7 DOF)
    Fundamental(FundamentalMatrix),
    /// Calibrated fundamental matrix (7 DOF)
    SimpleFundamental(SimpleFundamentalMatrix),
}

impl Value {
    /// Tangent-space dimension.
    pub fn dimension(&self) -> usize {
        match self {
            Value::Scalar(_) => <f64 as Manifold>::DIM,
            Value::Rotation(_) => SO3::DIM,
            Value::Direction(_) => Unit3::DIM,
            Value::Essential(_) => EssentialMatrix::DIM,
            Value::Fundamental(_) => FundamentalMatrix::DIM,
            Value::SimpleFundamental(_) => SimpleFundamentalMatrix::DIM,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Rotation(_) => "rotation",
            Value::Direction(_) => "direction",
            Value::Essential(_) => "essential",
            Value::Fundamental(_) => "fundamental",
            Value::SimpleFundamental(_) => "simple_fundamental",
        }
    }

    /// Apply a tangent increment, producing a new value of the same variant.
    pub fn retract(&self, delta: &DVector<f64>) -> ManifoldResult<Value> {
        Ok(match self {
            Value::Scalar(x) => Value::Scalar(x.retract(delta)?),
            Value::Rotation(r) => Value::Rotation(r.retract(delta)?),
            Value::Direction(d) => Value::Direction(d.retract(delta)?),
            Value::Essential(e) => Value::Essential(e.retract(delta)?),
            Value::Fundamental(f) => Value::Fundamental(f.retract(delta)?),
            Value::SimpleFundamental(f) => Value::SimpleFundamental(f.retract(delta)?),
        })
    }

    /// Tangent vector from `self` to `other`.
    ///
    /// # Errors
    /// [`ManifoldError::TypeMismatch`] if the two values are different variants.
    pub fn local_coordinates(&self, other: &Value) -> ManifoldResult<DVector<f64>> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(a.local_coordinates(b)),
            (Value::Rotation(a), Value::Rotation(b)) => Ok(a.local_coordinates(b)),
            (Value::Direction(a), Value::Direction(b)) => Ok(a.local_coordinates(b)),
            (Value::Essential(a), Value::Essential(b)) => Ok(a.local_coordinates(b)),
            (Value::Fundamental(a), Value::Fundamental(b)) => Ok(a.local_coordinates(b)),
            (Value::SimpleFundamental(a), Value::SimpleFundamental(b)) => {
                Ok(a.local_coordinates(b))
            }
            _ => Err(ManifoldError::TypeMismatch {
                expected: self.type_name(),
                actual: other.type_name(),
            }),
        }
    }

    /// Approximate equality; values of different variants are never equal.
    pub fn equals(&self, other: &Value, tolerance: f64) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a.equals(b, tolerance),
            (Value::Rotation(a), Value::Rotation(b)) => a.equals(b, tolerance),
            (Value::Direction(a), Value::Direction(b)) => a.equals(b, tolerance),
            (Value::Essential(a), Value::Essential(b)) => a.equals(b, tolerance),
            (Value::Fundamental(a), Value::Fundamental(b)) => a.equals(b, tolerance),
            (Value::SimpleFundamental(a), Value::SimpleFundamental(b)) => a.equals(b, tolerance),
            _ => false,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x)
    }
}

impl From<SO3> for Value {
    fn from(rotation: SO3) -> Self {
        Value::Rotation(rotation)
    }
}

impl From<Unit3> for Value {
    fn from(direction: Unit3) -> Self {
        Value::Direction(direction)
    }
}

impl From<EssentialMatrix> for Value {
    fn from(essential: EssentialMatrix) -> Self {
        Value::Essential(essential)
    }
}

impl From<FundamentalMatrix> for Value {
    fn from(fundamental: FundamentalMatrix) -> Self {
        Value::Fundamental(fundamental)
    }
}

impl From<SimpleFundamentalMatrix> for Value {
    fn from(fundamental: SimpleFundamentalMatrix) -> Self {
        Value::SimpleFundamental(fundamental)
    }
}

/// Keyed collection of variable values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    values: HashMap<String, Value>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Like [`Values::get`], but a missing key is an error.
    pub fn try_get(&self, key: &str) -> GeofactorResult<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| GeofactorError::MissingVariable(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Total tangent dimension of all stored values.
    pub fn dimension(&self) -> usize {
        self.values.values().map(Value::dimension).sum()
    }

    /// Apply per-key tangent increments and return the updated store.
    ///
    /// Keys without an increment are copied unchanged; `self` is never modified.
    ///
    /// # Errors
    /// [`GeofactorError::MissingVariable`] for an increment whose key is not stored, or the
    /// underlying manifold error for a wrong-sized increment.
    pub fn retract(&self, deltas: &HashMap<String, DVector<f64>>) -> GeofactorResult<Values> {
        if let Some(unknown) = deltas.keys().find(|k| !self.values.contains_key(*k)) {
            return Err(GeofactorError::MissingVariable(unknown.clone()));
        }
        let values = self
            .values
            .iter()
            .map(|(key, value)| -> GeofactorResult<(String, Value)> {
                let updated = match deltas.get(key) {
                    Some(delta) => value.retract(delta)?,
                    None => value.clone(),
                };
                Ok((key.clone(), updated))
            })
            .collect::<GeofactorResult<HashMap<_, _>>>()?;
        debug!("retracted {} of {} variables", deltas.len(), self.len());
        Ok(Values { values })
    }

    /// Per-key tangent vectors from `self` to `other`.
    ///
    /// # Errors
    /// [`GeofactorError::MissingVariable`] if `other` lacks a key of `self`, or
    /// [`ManifoldError::TypeMismatch`] (converted) when the variants differ.
    pub fn local_coordinates(
        &self,
        other: &Values,
    ) -> GeofactorResult<HashMap<String, DVector<f64>>> {
        self.values
            .iter()
            .map(|(key, value)| -> GeofactorResult<(String, DVector<f64>)> {
                let target = other.try_get(key)?;
                Ok((key.clone(), value.local_coordinates(target)?))
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Values {
            values: iter.into_iter().collect(),
        }
    }
}

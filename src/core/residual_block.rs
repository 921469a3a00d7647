use nalgebra as na;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::core::variable::{Value, Values};
use crate::error::GeofactorResult;
use crate::factors::{Factor, FactorError, JacobianRequest};

/// Options for one evaluation pass over a set of residual blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Evaluate blocks on the rayon thread pool.
    pub parallel: bool,
    /// Compute and whiten the stacked Jacobian of every block.
    pub compute_jacobians: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            parallel: true,
            compute_jacobians: true,
        }
    }
}

impl EvaluationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_jacobians(mut self, compute_jacobians: bool) -> Self {
        self.compute_jacobians = compute_jacobians;
        self
    }
}

/// Whitened result of evaluating one residual block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEvaluation {
    pub residual_block_id: usize,
    pub residual: na::DVector<f64>,
    /// Whitened Jacobian with one column block per factor variable, in key order.
    pub jacobian: Option<na::DMatrix<f64>>,
    /// ½ · ‖r‖²_Σ of the raw residual.
    pub error: f64,
}

/// A factor together with its position in the problem.
#[derive(Debug, Clone)]
pub struct ResidualBlock {
    pub residual_block_id: usize,
    pub factor: Box<dyn Factor>,
}

impl ResidualBlock {
    pub fn new(residual_block_id: usize, factor: Box<dyn Factor>) -> Self {
        ResidualBlock {
            residual_block_id,
            factor,
        }
    }

    /// Look up the block's variables, linearize the factor and apply its noise model.
    pub fn evaluate(
        &self,
        values: &Values,
        config: &EvaluationConfig,
    ) -> GeofactorResult<BlockEvaluation> {
        let variables = self
            .factor
            .keys()
            .iter()
            .map(|key| values.try_get(key))
            .collect::<GeofactorResult<Vec<&Value>>>()?;

        let request = if config.compute_jacobians {
            JacobianRequest::all(variables.len())
        } else {
            JacobianRequest::none()
        };
        let linearization = self.factor.linearize(&variables, request)?;

        let noise = self.factor.noise_model();
        let rows = linearization.residual.len();
        let jacobian_rows = linearization.jacobians.iter().flatten().map(|j| j.nrows());
        if let Some(actual) = std::iter::once(rows)
            .chain(jacobian_rows)
            .find(|actual| *actual != noise.dim())
        {
            return Err(FactorError::ResidualDimension {
                expected: noise.dim(),
                actual,
            }
            .into());
        }
        let error = noise.error(&linearization.residual);
        let jacobian = linearization
            .stacked_jacobian()
            .map(|j| noise.whiten_jacobian(&j));
        trace!(
            "residual block {} error = {:.6e}",
            self.residual_block_id, error
        );

        Ok(BlockEvaluation {
            residual_block_id: self.residual_block_id,
            residual: noise.whiten(&linearization.residual),
            jacobian,
            error,
        })
    }
}

/// Evaluate every block against the same read-only `values`, in block order.
pub fn evaluate_blocks(
    blocks: &[ResidualBlock],
    values: &Values,
    config: &EvaluationConfig,
) -> GeofactorResult<Vec<BlockEvaluation>> {
    debug!(
        "evaluating {} residual blocks ({})",
        blocks.len(),
        if config.parallel { "parallel" } else { "serial" }
    );
    if config.parallel {
        blocks
            .par_iter()
            .map(|block| block.evaluate(values, config))
            .collect()
    } else {
        blocks
            .iter()
            .map(|block| block.evaluate(values, config))
            .collect()
    }
}

/// Sum of the weighted errors of all evaluated blocks.
pub fn total_error(evaluations: &[BlockEvaluation]) -> f64 {
    evaluations.iter().map(|e| e.error).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::noise_model::{IsotropicNoise, NoiseModel};
    use crate::error::GeofactorError;
    use crate::factors::{FactorResult, Linearization, VelocityConstraint};
    use crate::manifold::so3::SO3;

    fn chain(steps: usize) -> (Vec<ResidualBlock>, Values) {
        let mut values = Values::new();
        values.insert("v", 1.0);
        for i in 0..=steps {
            values.insert(format!("x{i}"), 0.1 * i as f64 + 0.01 * (i % 3) as f64);
        }
        let blocks = (0..steps)
            .map(|i| {
                let factor =
                    VelocityConstraint::new(format!("x{i}"), format!("x{}", i + 1), "v", 0.1, 10.0)
                        .unwrap();
                ResidualBlock::new(i, Box::new(factor))
            })
            .collect();
        (blocks, values)
    }

    #[test]
    fn test_evaluation_config_builder() {
        let config = EvaluationConfig::new()
            .with_parallel(false)
            .with_jacobians(false);
        assert!(!config.parallel);
        assert!(!config.compute_jacobians);
        assert_eq!(
            EvaluationConfig::default(),
            EvaluationConfig {
                parallel: true,
                compute_jacobians: true
            }
        );
    }

    #[test]
    fn test_block_evaluation() {
        let mut values = Values::new();
        values.insert("a", 0.0);
        values.insert("b", 0.3);
        values.insert("v", 2.0);
        let factor = VelocityConstraint::new("a", "b", "v", 0.1, 100.0).unwrap();
        let block = ResidualBlock::new(7, Box::new(factor));

        let evaluation = block.evaluate(&values, &EvaluationConfig::default()).unwrap();
        assert_eq!(evaluation.residual_block_id, 7);
        // constrained rows are whitened by √mu = 10
        assert!((evaluation.residual[0] + 1.0).abs() < 1e-12);
        assert!((evaluation.error - 0.5 * 100.0 * 0.01).abs() < 1e-9);
        let jacobian = evaluation.jacobian.clone().unwrap();
        assert_eq!(jacobian.shape(), (1, 3));
        assert!((jacobian - na::dmatrix![10.0, -10.0, 1.0]).norm() < 1e-12);

        let without = block
            .evaluate(&values, &EvaluationConfig::default().with_jacobians(false))
            .unwrap();
        assert!(without.jacobian.is_none());
        assert_eq!(without.residual, evaluation.residual);
    }

    #[test]
    fn test_whitened_residual_matches_error() {
        let mut values = Values::new();
        values.insert("a", 0.0);
        values.insert("b", 0.1);
        values.insert("v", 0.0);
        let factor = VelocityConstraint::new("a", "b", "v", 0.1, 1000.0).unwrap();
        let block = ResidualBlock::new(0, Box::new(factor));

        let evaluation = block.evaluate(&values, &EvaluationConfig::default()).unwrap();
        assert!((evaluation.error - 5.0).abs() < 1e-9);
        assert!((0.5 * evaluation.residual.norm_squared() - evaluation.error).abs() < 1e-9);

        // the linear model J·δ must reproduce the whitened residual change
        let jacobian = evaluation.jacobian.unwrap();
        let step = na::dvector![0.0, -0.1, 0.0];
        assert!(((&jacobian * &step)[0] + evaluation.residual[0]).abs() < 1e-9);
    }

    /// Declares a 1-row noise model but returns two residual rows.
    #[derive(Debug, Clone)]
    struct OversizedFactor {
        keys: Vec<String>,
        noise: IsotropicNoise,
    }

    impl Factor for OversizedFactor {
        fn keys(&self) -> &[String] {
            &self.keys
        }

        fn residual_dim(&self) -> usize {
            1
        }

        fn linearize(
            &self,
            _values: &[&Value],
            _request: JacobianRequest,
        ) -> FactorResult<Linearization> {
            Ok(Linearization::new(na::dvector![0.3, 0.4], vec![None]))
        }

        fn noise_model(&self) -> &dyn NoiseModel {
            &self.noise
        }
    }

    #[test]
    fn test_residual_dimension_mismatch_is_reported() {
        let mut values = Values::new();
        values.insert("a", 0.0);
        let factor = OversizedFactor {
            keys: vec!["a".to_string()],
            noise: IsotropicNoise::new(1, 1.0).unwrap(),
        };
        let blocks = vec![ResidualBlock::new(0, Box::new(factor))];

        for parallel in [false, true] {
            let config = EvaluationConfig::default().with_parallel(parallel);
            let result = evaluate_blocks(&blocks, &values, &config);
            assert_eq!(
                result,
                Err(GeofactorError::from(FactorError::ResidualDimension {
                    expected: 1,
                    actual: 2
                }))
            );
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let (blocks, values) = chain(64);
        let parallel = evaluate_blocks(&blocks, &values, &EvaluationConfig::default()).unwrap();
        let serial = evaluate_blocks(
            &blocks,
            &values,
            &EvaluationConfig::default().with_parallel(false),
        )
        .unwrap();
        assert_eq!(parallel, serial);
        assert!(
            parallel
                .iter()
                .enumerate()
                .all(|(i, e)| e.residual_block_id == i)
        );
        assert!((total_error(&parallel) - total_error(&serial)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let (blocks, values) = chain(2);
        let pruned: Values = values
            .keys()
            .into_iter()
            .filter(|k| *k != "x2")
            .map(|k| (k.to_string(), values.get(k).cloned().unwrap()))
            .collect();
        let result = evaluate_blocks(&blocks, &pruned, &EvaluationConfig::default());
        assert_eq!(
            result,
            Err(GeofactorError::MissingVariable("x2".to_string()))
        );
    }

    #[test]
    fn test_wrong_variable_type_is_reported() {
        let mut values = Values::new();
        values.insert("a", 0.0);
        values.insert("b", 0.0);
        values.insert("v", SO3::identity());
        let factor = VelocityConstraint::new("a", "b", "v", 0.1, 1.0).unwrap();
        let blocks = vec![ResidualBlock::new(0, Box::new(factor))];
        let result = evaluate_blocks(&blocks, &values, &EvaluationConfig::default());
        assert!(matches!(result, Err(GeofactorError::Factor(_))));
    }
}

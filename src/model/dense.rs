//! Reference dense classifier adapter.
//!
//! A two-layer network stored as JSON: a hidden dense layer whose output is
//! the embedding head, and an output dense layer followed by softmax that is
//! the probability head. The embedding layer is named explicitly in the
//! artifact, so nothing has to be discovered by walking a layer graph.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::EmbeddingModel;
use crate::error::ModelError;

/// Elementwise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// Fully connected layer: `y = activation(x · Wᵀ + b)`.
///
/// `weights` is stored row-per-output-unit, i.e. `units × inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    pub fn units(&self) -> usize {
        self.weights.len()
    }

    pub fn inputs(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if self.weights.is_empty() || self.inputs() == 0 {
            return Err(format!("{name} layer has no weights"));
        }
        if self.weights.iter().any(|row| row.len() != self.inputs()) {
            return Err(format!("{name} layer has ragged weight rows"));
        }
        if self.bias.len() != self.units() {
            return Err(format!(
                "{name} layer bias has {} entries, expected {}",
                self.bias.len(),
                self.units()
            ));
        }
        Ok(())
    }

    fn weight_matrix(&self) -> Array2<f32> {
        let mut w = Array2::zeros((self.units(), self.inputs()));
        for (i, row) in self.weights.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                w[[i, j]] = *v;
            }
        }
        w
    }

    fn forward(&self, input: ArrayView2<'_, f32>) -> Array2<f32> {
        let bias = Array1::from(self.bias.clone());
        let mut out = input.dot(&self.weight_matrix().t()) + &bias;
        let activation = self.activation;
        out.mapv_inplace(|x| activation.apply(x));
        out
    }
}

/// Dense classifier exposing its hidden layer as the embedding head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSoftmaxModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub hidden: DenseLayer,
    pub output: DenseLayer,
}

fn default_model_name() -> String {
    "dense-softmax".to_string()
}

impl DenseSoftmaxModel {
    /// Builds a model after checking that the two layers fit together.
    pub fn new(name: impl Into<String>, hidden: DenseLayer, output: DenseLayer) -> Result<Self, String> {
        let model = Self {
            name: name.into(),
            hidden,
            output,
        };
        model.validate()?;
        Ok(model)
    }

    /// Parses and validates a JSON model artifact.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let model: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.hidden.validate("hidden")?;
        self.output.validate("output")?;
        if self.output.inputs() != self.hidden.units() {
            return Err(format!(
                "output layer expects {} inputs but hidden layer has {} units",
                self.output.inputs(),
                self.hidden.units()
            ));
        }
        Ok(())
    }

    pub fn input_dim(&self) -> usize {
        self.hidden.inputs()
    }

    pub fn num_classes(&self) -> usize {
        self.output.units()
    }

    fn check_input(&self, batch: &ArrayView2<'_, f32>) -> Result<(), ModelError> {
        if batch.ncols() != self.input_dim() {
            return Err(ModelError::InputWidth {
                expected: self.input_dim(),
                actual: batch.ncols(),
            });
        }
        Ok(())
    }
}

/// Row-wise numerically stable softmax.
fn softmax_rows(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|x| (x - max).exp());
        let sum: f32 = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|x| x / sum);
        }
    }
    logits
}

impl EmbeddingModel for DenseSoftmaxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_probabilities(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError> {
        self.check_input(&batch)?;
        let hidden = self.hidden.forward(batch);
        Ok(softmax_rows(self.output.forward(hidden.view())))
    }

    fn predict_embeddings(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, ModelError> {
        self.check_input(&batch)?;
        Ok(self.hidden.forward(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tiny_model() -> DenseSoftmaxModel {
        DenseSoftmaxModel::new(
            "tiny",
            DenseLayer {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, -1.0]],
                bias: vec![0.0, 0.0, 0.0],
                activation: Activation::Relu,
            },
            DenseLayer {
                weights: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                bias: vec![0.0, 0.0],
                activation: Activation::Linear,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_embeddings_are_hidden_layer_output() {
        let model = tiny_model();
        let embs = model
            .predict_embeddings(array![[2.0_f32, 1.0], [0.0, 3.0]].view())
            .unwrap();

        assert_eq!(embs, array![[2.0_f32, 1.0, 1.0], [0.0, 3.0, 0.0]]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = tiny_model();
        let probs = model
            .predict_probabilities(array![[2.0_f32, 1.0], [0.0, 3.0], [1.0, 1.0]].view())
            .unwrap();

        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|p| *p >= 0.0));
        }
        assert!(probs[[0, 0]] > probs[[0, 1]]);
        assert!(probs[[1, 1]] > probs[[1, 0]]);
        assert!((probs[[2, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_input_width() {
        let err = tiny_model()
            .predict_embeddings(array![[1.0_f32, 2.0, 3.0]].view())
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::InputWidth {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_from_json_validates_layer_fit() {
        let json = r#"{
            "hidden": {"weights": [[1.0, 0.0]], "bias": [0.0], "activation": "tanh"},
            "output": {"weights": [[1.0, 1.0], [0.5, 0.5]], "bias": [0.0, 0.0]}
        }"#;
        let err = DenseSoftmaxModel::from_json(json).unwrap_err();
        assert!(err.contains("output layer expects 2 inputs"));
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"{
            "hidden": {"weights": [[1.0, 0.0]], "bias": [0.0]},
            "output": {"weights": [[1.0], [-1.0]], "bias": [0.0, 0.0]}
        }"#;
        let model = DenseSoftmaxModel::from_json(json).unwrap();
        assert_eq!(model.name, "dense-softmax");
        assert_eq!(model.hidden.activation, Activation::Linear);
        assert_eq!(model.num_classes(), 2);
    }
}

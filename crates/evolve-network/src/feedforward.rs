//! Fixed-topology feed-forward network.
//!
//! `inputs → hidden (tanh) → outputs (tanh)`, optionally with Elman context memory:
//! the previous step's hidden state feeds back into the hidden layer through its own
//! weight matrix.
//!
//! All parameters live in one flat vector so a genetic algorithm can treat the
//! network as a plain weight vector. The layout is
//! `w_ih | b_h | w_ho | b_o | [w_hh]`, row-major, with `w_hh` present only when
//! memory is enabled.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Layer sizes of a [`FeedForwardNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkShape {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub use_memory: bool,
}

impl Default for NetworkShape {
    fn default() -> Self {
        Self {
            input_size: 3,
            hidden_size: 16,
            output_size: 2,
            use_memory: false,
        }
    }
}

impl NetworkShape {
    /// Total number of trainable parameters.
    #[must_use]
    pub fn weight_count(&self) -> usize {
        let Self {
            input_size: i,
            hidden_size: h,
            output_size: o,
            use_memory,
        } = *self;
        i * h + h + h * o + o + if use_memory { h * h } else { 0 }
    }

    /// Draws a parameter vector scaled to the fan-in of each layer.
    ///
    /// The scale is `sqrt(8 / fan_in)` for the feed-forward weights (wide on purpose:
    /// game sensors are sparse), `sqrt(2 / hidden)` for context weights, and biases
    /// are uniform in `[-0.5, 0.5]`.
    pub fn random_weights<R>(&self, rng: &mut R) -> Vec<f32>
    where
        R: Rng + ?Sized,
    {
        #[expect(clippy::cast_precision_loss)]
        let scale = |fan_in: usize, numerator: f32| (numerator / fan_in.max(1) as f32).sqrt();
        let ih = scale(self.input_size, 8.0);
        let ho = scale(self.hidden_size, 8.0);
        let hh = scale(self.hidden_size, 2.0);

        let mut weights = Vec::with_capacity(self.weight_count());
        let mut fill = |count: usize, range: f32| {
            weights.extend((0..count).map(|_| rng.random_range(-range..=range)));
        };
        fill(self.input_size * self.hidden_size, ih);
        fill(self.hidden_size, 0.5);
        fill(self.hidden_size * self.output_size, ho);
        fill(self.output_size, 0.5);
        if self.use_memory {
            fill(self.hidden_size * self.hidden_size, hh);
        }
        weights
    }
}

/// On-disk form of a [`FeedForwardNetwork`]: its shape and flat weights.
///
/// With memory enabled the weights include the context matrix `w_hh`; the
/// context activations themselves are per-episode state and are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub shape: NetworkShape,
    pub weights: Vec<f32>,
}

impl NetworkRecord {
    /// Whether the weight vector has exactly the length the shape needs.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.weights.len() == self.shape.weight_count()
    }

    #[must_use]
    pub fn into_network(self) -> FeedForwardNetwork {
        FeedForwardNetwork::from_weights(self.shape, &self.weights)
    }
}

/// A fixed-topology network evaluated from a flat weight vector.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    shape: NetworkShape,
    weights: Vec<f32>,
    prev_hidden: Vec<f32>,
    hidden: Vec<f32>,
    output: Vec<f32>,
}

impl FeedForwardNetwork {
    /// Builds a network from `weights`.
    ///
    /// A short vector is padded with zeros and a long one truncated, so any weight
    /// vector yields a usable network.
    #[must_use]
    pub fn from_weights(shape: NetworkShape, weights: &[f32]) -> Self {
        let mut owned = weights.to_vec();
        owned.resize(shape.weight_count(), 0.0);
        Self {
            shape,
            weights: owned,
            prev_hidden: vec![0.0; shape.hidden_size],
            hidden: vec![0.0; shape.hidden_size],
            output: vec![0.0; shape.output_size],
        }
    }

    #[must_use]
    pub fn shape(&self) -> NetworkShape {
        self.shape
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[must_use]
    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            shape: self.shape,
            weights: self.weights.clone(),
        }
    }

    /// Runs one step. Missing inputs read as 0.
    pub fn forward(&mut self, inputs: &[f32]) -> &[f32] {
        let NetworkShape {
            input_size,
            hidden_size,
            output_size,
            use_memory,
        } = self.shape;
        let (w_ih, rest) = self.weights.split_at(input_size * hidden_size);
        let (b_h, rest) = rest.split_at(hidden_size);
        let (w_ho, rest) = rest.split_at(hidden_size * output_size);
        let (b_o, w_hh) = rest.split_at(output_size);

        for (h, hidden) in self.hidden.iter_mut().enumerate() {
            let row = &w_ih[h * input_size..(h + 1) * input_size];
            let mut sum = b_h[h];
            for (i, w) in row.iter().enumerate() {
                sum += w * inputs.get(i).copied().unwrap_or(0.0);
            }
            if use_memory {
                let context = &w_hh[h * hidden_size..(h + 1) * hidden_size];
                sum += context
                    .iter()
                    .zip(&self.prev_hidden)
                    .map(|(w, p)| w * p)
                    .sum::<f32>();
            }
            *hidden = sum.tanh();
        }
        if use_memory {
            self.prev_hidden.copy_from_slice(&self.hidden);
        }

        for (o, output) in self.output.iter_mut().enumerate() {
            let row = &w_ho[o * hidden_size..(o + 1) * hidden_size];
            let sum = b_o[o]
                + row
                    .iter()
                    .zip(&self.hidden)
                    .map(|(w, h)| w * h)
                    .sum::<f32>();
            *output = sum.tanh();
        }
        &self.output
    }

    /// Clears the Elman context before a fresh episode.
    pub fn reset_memory(&mut self) {
        self.prev_hidden.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_weight_count() {
        let mut shape = NetworkShape {
            input_size: 3,
            hidden_size: 4,
            output_size: 2,
            use_memory: false,
        };
        assert_eq!(shape.weight_count(), 12 + 4 + 8 + 2);
        shape.use_memory = true;
        assert_eq!(shape.weight_count(), 12 + 4 + 8 + 2 + 16);

        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(shape.random_weights(&mut rng).len(), shape.weight_count());
    }

    #[test]
    fn test_forward_matches_hand_computation() {
        let shape = NetworkShape {
            input_size: 2,
            hidden_size: 1,
            output_size: 1,
            use_memory: false,
        };
        // w_ih = [1, -1], b_h = [0.1], w_ho = [2], b_o = [-0.2]
        let mut network = FeedForwardNetwork::from_weights(shape, &[1.0, -1.0, 0.1, 2.0, -0.2]);
        let hidden = (1.0_f32 - 0.5 + 0.1).tanh();
        let expected = (2.0 * hidden - 0.2).tanh();
        assert!((network.forward(&[1.0, 0.5])[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_memory_carries_state_until_reset() {
        let shape = NetworkShape {
            input_size: 1,
            hidden_size: 1,
            output_size: 1,
            use_memory: true,
        };
        // w_ih = [1], b_h = [0], w_ho = [1], b_o = [0], w_hh = [1]
        let mut network = FeedForwardNetwork::from_weights(shape, &[1.0, 0.0, 1.0, 0.0, 1.0]);
        let first = network.forward(&[0.5])[0];
        let second = network.forward(&[0.5])[0];
        assert!(second > first);

        network.reset_memory();
        assert!((network.forward(&[0.5])[0] - first).abs() < 1e-6);
    }

    #[test]
    fn test_record_keeps_context_weights() {
        let shape = NetworkShape {
            input_size: 2,
            hidden_size: 3,
            output_size: 1,
            use_memory: true,
        };
        let mut rng = Pcg32::seed_from_u64(9);
        let mut network = FeedForwardNetwork::from_weights(shape, &shape.random_weights(&mut rng));
        let record = network.to_record();
        assert!(record.is_complete());

        let json = serde_json::to_string(&record).unwrap();
        let restored: NetworkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);

        let mut copy = restored.into_network();
        for input in [[0.3, -0.2], [0.1, 0.9], [-1.0, 0.4]] {
            let expected = network.forward(&input).to_vec();
            assert_eq!(copy.forward(&input), expected.as_slice());
        }
    }

    #[test]
    fn test_short_weight_vector_is_padded() {
        let shape = NetworkShape::default();
        let mut network = FeedForwardNetwork::from_weights(shape, &[]);
        assert_eq!(network.weights().len(), shape.weight_count());
        assert!(network.forward(&[1.0, 2.0, 3.0]).iter().all(|v| v.abs() < f32::EPSILON));
    }
}

//! Genome shape and mutation parameters.

use serde::{Deserialize, Serialize};

/// Parameters controlling genome creation, mutation and crossover.
///
/// Every field has a default, so a partial JSON document only overrides the
/// values it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    /// Number of input nodes (sensor values fed by the game).
    pub input_count: usize,
    /// Number of output nodes (actions read by the game).
    pub output_count: usize,
    /// Allow connections that close a cycle.
    pub allow_recurrent: bool,

    /// Initial and replacement weights are drawn from `[-weight_init_range, weight_init_range]`.
    pub weight_init_range: f32,
    /// Weights are clamped to `[-weight_clamp, weight_clamp]` after mutation.
    pub weight_clamp: f32,
    /// Probability that a genome's weights are mutated at all.
    pub weight_mutation_rate: f32,
    /// Standard deviation of the Gaussian weight perturbation.
    pub weight_mutation_strength: f32,
    /// Per-connection probability of a full reset instead of a perturbation.
    pub weight_replace_rate: f32,

    /// Probability that a genome's biases are mutated at all.
    pub bias_mutation_rate: f32,
    /// Standard deviation of the Gaussian bias perturbation.
    pub bias_mutation_strength: f32,

    /// Probability of an add-connection mutation.
    pub add_connection_rate: f32,
    /// Probability of an add-node mutation.
    pub add_node_rate: f32,
    /// Probability of flipping the enabled flag of one random connection.
    pub toggle_enable_rate: f32,
    /// Probability that a matching gene disabled in either parent stays disabled.
    pub disabled_gene_inherit_rate: f32,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            input_count: 3,
            output_count: 2,
            allow_recurrent: false,
            weight_init_range: 1.0,
            weight_clamp: 4.0,
            weight_mutation_rate: 0.8,
            weight_mutation_strength: 0.5,
            weight_replace_rate: 0.1,
            bias_mutation_rate: 0.3,
            bias_mutation_strength: 0.2,
            add_connection_rate: 0.05,
            add_node_rate: 0.03,
            toggle_enable_rate: 0.01,
            disabled_gene_inherit_rate: 0.75,
        }
    }
}

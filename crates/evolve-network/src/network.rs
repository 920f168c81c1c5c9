//! Evaluable network compiled from a [`Genome`].
//!
//! Compilation keeps enabled connections only; disabled connections do not exist in
//! the compiled graph. Nodes are evaluated in a precomputed order: a topological
//! order when the enabled graph is acyclic, otherwise a depth-first order in which
//! every edge pointing backwards (including self loops) is a back-edge.
//!
//! Back-edges read the activation stored by the previous [`NeatNetwork::forward`]
//! call, which is how recurrent genomes carry memory between steps. When a cyclic
//! genome is compiled without recurrence the back-edges are left out.
//!
//! # Example
//!
//! ```
//! use evolve_network::{genome::Genome, network::NeatNetwork};
//!
//! let genome = Genome::empty(2, 1);
//! let mut network = NeatNetwork::from_genome(&genome, false);
//! assert_eq!(network.forward(&[1.0, 0.5]), &[0.0]);
//! ```

use std::collections::{HashMap, VecDeque};

use crate::{
    gene::{NodeId, NodeType},
    genome::Genome,
};

#[derive(Debug, Clone, Copy)]
struct Link {
    from: usize,
    weight: f32,
    recurrent: bool,
}

/// A compiled variable-topology network with tanh activations.
#[derive(Debug, Clone)]
pub struct NeatNetwork {
    biases: Vec<f32>,
    input_indices: Vec<usize>,
    output_indices: Vec<usize>,
    /// Non-input nodes in evaluation order.
    order: Vec<usize>,
    incoming: Vec<Vec<Link>>,
    activations: Vec<f32>,
    previous: Vec<f32>,
    outputs: Vec<f32>,
    connection_count: usize,
    has_back_edges: bool,
}

impl NeatNetwork {
    /// Compiles a genome.
    ///
    /// With `recurrent` set, edges that close a cycle read the previous step's
    /// activations; without it they are dropped.
    #[must_use]
    pub fn from_genome(genome: &Genome, recurrent: bool) -> Self {
        let nodes = genome.nodes();
        let index_of: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let edges = genome
            .connections()
            .iter()
            .filter(|c| c.enabled)
            .filter_map(|c| Some((*index_of.get(&c.in_id)?, *index_of.get(&c.out_id)?, c.weight)))
            .collect::<Vec<_>>();

        let order = topological_order(nodes.len(), &edges)
            .unwrap_or_else(|| depth_first_order(genome, &edges));
        let mut position = vec![0; nodes.len()];
        for (pos, &node) in order.iter().enumerate() {
            position[node] = pos;
        }

        let is_input = |i: usize| nodes[i].node_type == NodeType::Input;
        let mut incoming = vec![vec![]; nodes.len()];
        let mut connection_count = 0;
        let mut has_back_edges = false;
        let mut skipped = 0;
        for &(from, to, weight) in &edges {
            if is_input(to) {
                skipped += 1;
                continue;
            }
            let back = !is_input(from) && position[from] >= position[to];
            if back && !recurrent {
                skipped += 1;
                continue;
            }
            has_back_edges |= back;
            connection_count += 1;
            incoming[to].push(Link {
                from,
                weight,
                recurrent: back,
            });
        }
        if skipped > 0 {
            log::warn!("compiled network without {skipped} edges closing a cycle");
        }

        Self {
            biases: nodes.iter().map(|n| n.bias).collect(),
            input_indices: indices_of(genome, NodeType::Input),
            output_indices: indices_of(genome, NodeType::Output),
            order: order.into_iter().filter(|&i| !is_input(i)).collect(),
            incoming,
            activations: vec![0.0; nodes.len()],
            previous: vec![0.0; nodes.len()],
            outputs: vec![0.0; genome.output_count()],
            connection_count,
            has_back_edges,
        }
    }

    /// Runs one step. Missing inputs read as 0, extra inputs are ignored.
    ///
    /// Every output lies in `[-1, 1]`.
    pub fn forward(&mut self, inputs: &[f32]) -> &[f32] {
        if self.has_back_edges {
            self.previous.copy_from_slice(&self.activations);
        }
        for (i, &index) in self.input_indices.iter().enumerate() {
            self.activations[index] = inputs.get(i).copied().unwrap_or(0.0);
        }
        for &node in &self.order {
            let mut sum = self.biases[node];
            for link in &self.incoming[node] {
                let source = if link.recurrent {
                    self.previous[link.from]
                } else {
                    self.activations[link.from]
                };
                sum += source * link.weight;
            }
            self.activations[node] = sum.tanh();
        }
        for (out, &index) in self.outputs.iter_mut().zip(&self.output_indices) {
            *out = self.activations[index];
        }
        &self.outputs
    }

    /// Zeroes all stored activations before a fresh episode.
    pub fn reset(&mut self) {
        self.activations.fill(0.0);
        self.previous.fill(0.0);
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.input_indices.len()
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.output_indices.len()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.biases.len()
    }

    /// Number of compiled (enabled and kept) connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    #[must_use]
    pub fn is_recurrent(&self) -> bool {
        self.has_back_edges
    }
}

fn indices_of(genome: &Genome, node_type: NodeType) -> Vec<usize> {
    genome
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.node_type == node_type)
        .map(|(i, _)| i)
        .collect()
}

/// Kahn's algorithm. Returns `None` if the graph has a cycle.
fn topological_order(node_count: usize, edges: &[(usize, usize, f32)]) -> Option<Vec<usize>> {
    let mut in_degree = vec![0_usize; node_count];
    let mut successors = vec![vec![]; node_count];
    for &(from, to, _) in edges {
        in_degree[to] += 1;
        successors[from].push(to);
    }

    let mut queue = (0..node_count)
        .filter(|&i| in_degree[i] == 0)
        .collect::<VecDeque<_>>();
    let mut order = Vec::with_capacity(node_count);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in &successors[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    (order.len() == node_count).then_some(order)
}

/// Reverse post-order of a depth-first walk along successors, starting from the
/// inputs, then any unvisited hidden and output nodes.
///
/// Edges that point to an earlier or equal position in this order are exactly the
/// edges closing a cycle.
fn depth_first_order(genome: &Genome, edges: &[(usize, usize, f32)]) -> Vec<usize> {
    let nodes = genome.nodes();
    let mut successors = vec![vec![]; nodes.len()];
    for &(from, to, _) in edges {
        successors[from].push(to);
    }

    let mut roots = vec![];
    for node_type in [NodeType::Input, NodeType::Hidden, NodeType::Output] {
        roots.extend(indices_of(genome, node_type));
    }

    let mut visited = vec![false; nodes.len()];
    let mut post_order = Vec::with_capacity(nodes.len());
    for root in roots {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0_usize)];
        while let Some((node, next)) = stack.pop() {
            if let Some(&succ) = successors[node].get(next) {
                stack.push((node, next + 1));
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                post_order.push(node);
            }
        }
    }
    post_order.reverse();
    post_order
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::{
        config::GenomeConfig,
        gene::ConnectionGene,
        genome::GenomeRecord,
        innovation::InnovationTracker,
    };

    fn connection(in_id: NodeId, out_id: NodeId, weight: f32, innovation: u32) -> ConnectionGene {
        ConnectionGene {
            in_id,
            out_id,
            weight,
            innovation,
            enabled: true,
        }
    }

    fn genome_from(record: GenomeRecord, inputs: usize, outputs: usize) -> Genome {
        Genome::from_record(record, inputs, outputs)
    }

    #[test]
    fn test_simple_network() {
        let record = GenomeRecord {
            connections: vec![connection(0, 2, 1.0, 0), connection(1, 2, -1.0, 1)],
            ..GenomeRecord::default()
        };
        let mut network = NeatNetwork::from_genome(&genome_from(record, 2, 1), false);
        let out = network.forward(&[1.0, 0.5]);
        assert!((out[0] - 0.5_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_hidden_node_and_bias() {
        let mut record = GenomeRecord {
            connections: vec![connection(0, 2, 2.0, 0), connection(2, 1, 0.5, 1)],
            ..GenomeRecord::default()
        };
        record.nodes = Genome::empty(1, 1).to_record().nodes;
        record.nodes[1].bias = -0.2;
        record.nodes.push(crate::gene::NodeGene {
            id: 2,
            node_type: NodeType::Hidden,
            bias: 0.1,
        });
        let mut network = NeatNetwork::from_genome(&genome_from(record, 1, 1), false);
        let hidden = (0.3_f32 * 2.0 + 0.1).tanh();
        let expected = (hidden * 0.5 - 0.2).tanh();
        assert!((network.forward(&[0.3])[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_connections_are_not_compiled() {
        let mut disabled = connection(1, 2, 100.0, 1);
        disabled.enabled = false;
        let record = GenomeRecord {
            connections: vec![connection(0, 2, 1.0, 0), disabled],
            ..GenomeRecord::default()
        };
        let mut network = NeatNetwork::from_genome(&genome_from(record, 2, 1), false);
        assert_eq!(network.connection_count(), 1);
        assert!((network.forward(&[0.5, 1.0])[0] - 0.5_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_outputs_are_bounded() {
        let config = GenomeConfig {
            weight_init_range: 4.0,
            ..GenomeConfig::default()
        };
        let mut tracker = InnovationTracker::for_shape(3, 2);
        let mut rng = Pcg32::seed_from_u64(3);
        let mut genome = Genome::create_basic(&config, &mut tracker, &mut rng);
        for _ in 0..5 {
            genome.mutate_add_node(&mut tracker, &mut rng);
            genome.mutate_add_connection(&config, &mut tracker, &mut rng);
        }
        let mut network = NeatNetwork::from_genome(&genome, false);
        assert!(!network.is_recurrent());
        for input in [-1000.0, -1.0, 0.0, 1.0, 1000.0] {
            let out = network.forward(&[input; 3]);
            assert_eq!(out.len(), 2);
            assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_recurrent_self_loop_reads_previous_step() {
        let record = GenomeRecord {
            connections: vec![connection(0, 1, 1.0, 0), connection(1, 1, 1.0, 1)],
            ..GenomeRecord::default()
        };
        let genome = genome_from(record, 1, 1);

        let mut network = NeatNetwork::from_genome(&genome, true);
        assert!(network.is_recurrent());
        let first = network.forward(&[0.5])[0];
        assert!((first - 0.5_f32.tanh()).abs() < 1e-6);
        let second = network.forward(&[0.5])[0];
        assert!((second - (0.5 + first).tanh()).abs() < 1e-6);

        network.reset();
        assert!((network.forward(&[0.5])[0] - first).abs() < 1e-6);

        let mut feed_forward = NeatNetwork::from_genome(&genome, false);
        assert_eq!(feed_forward.connection_count(), 1);
        let a = feed_forward.forward(&[0.5])[0];
        let b = feed_forward.forward(&[0.5])[0];
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_recurrent_cycle_through_hidden_nodes() {
        // 0 -> 2 -> 3 -> 1, with back-edge 3 -> 2
        let mut record = GenomeRecord {
            connections: vec![
                connection(0, 2, 1.0, 0),
                connection(2, 3, 1.0, 1),
                connection(3, 1, 1.0, 2),
                connection(3, 2, 1.0, 3),
            ],
            ..GenomeRecord::default()
        };
        record.nodes.push(crate::gene::NodeGene::new(2, NodeType::Hidden));
        record.nodes.push(crate::gene::NodeGene::new(3, NodeType::Hidden));
        let genome = genome_from(record, 1, 1);
        let mut network = NeatNetwork::from_genome(&genome, true);
        assert_eq!(network.connection_count(), 4);

        let h2 = 1.0_f32.tanh();
        let h3 = h2.tanh();
        let out = network.forward(&[1.0])[0];
        assert!((out - h3.tanh()).abs() < 1e-6);

        let h2 = (1.0 + h3).tanh();
        let h3 = h2.tanh();
        let out = network.forward(&[1.0])[0];
        assert!((out - h3.tanh()).abs() < 1e-6);
    }
}

//! Variable-topology genome with NEAT mutation and crossover operators.
//!
//! A [`Genome`] owns an insertion-ordered list of node genes and connection genes.
//! Input nodes always occupy ids `0..input_count` and output nodes
//! `input_count..input_count + output_count`; these are never removed. Hidden
//! nodes get ids from the [`InnovationTracker`] as add-node mutations create them.
//!
//! # Operators
//!
//! - [`Genome::create_basic`] - fully connected input → output topology
//! - [`Genome::mutate_add_connection`] - new link between two unconnected nodes
//! - [`Genome::mutate_add_node`] - split an enabled link with a new hidden node
//! - [`Genome::mutate_weights`] / [`Genome::mutate_biases`] - Gaussian perturbation or reset
//! - [`Genome::mutate_toggle_enable`] - flip one link's enabled flag
//! - [`Genome::crossover`] - align genes by innovation number
//! - [`Genome::distance`] - compatibility distance used for speciation
//!
//! Structural mutations with no valid target are silent no-ops and report `false`.
//!
//! Genomes have value semantics: `clone()` is a deep copy and crossover children
//! never share gene storage with their parents.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use rand::{Rng, seq::IndexedRandom};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::{
    config::GenomeConfig,
    gene::{ConnectionGene, Innovation, NodeGene, NodeId, NodeType},
    innovation::InnovationTracker,
};

/// Coefficients of the compatibility distance.
///
/// `distance = excess·E/N + disjoint·D/N + weight·W̄` where `N` is the larger genome's
/// connection count (at least 1) and `W̄` the mean absolute weight difference of
/// matching genes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceCoefficients {
    pub excess: f32,
    pub disjoint: f32,
    pub weight: f32,
}

impl Default for DistanceCoefficients {
    fn default() -> Self {
        Self {
            excess: 1.0,
            disjoint: 1.0,
            weight: 0.4,
        }
    }
}

/// On-disk form of a genome: `{nodes, connections, fitness}`.
///
/// Missing fields deserialize to empty values; [`Genome::from_record`] turns any
/// record, however malformed, into a valid genome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeRecord {
    pub nodes: Vec<NodeGene>,
    pub connections: Vec<ConnectionGene>,
    pub fitness: f32,
}

/// A variable-topology chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    nodes: Vec<NodeGene>,
    connections: Vec<ConnectionGene>,
    input_count: usize,
    output_count: usize,
    fitness: f32,
    adjusted_fitness: f32,
}

#[expect(clippy::cast_possible_truncation)]
fn io_node_id(index: usize) -> NodeId {
    index as NodeId
}

fn chance<R>(rng: &mut R, probability: f32) -> bool
where
    R: Rng + ?Sized,
{
    rng.random::<f32>() < probability
}

fn random_weight<R>(rng: &mut R, range: f32) -> f32
where
    R: Rng + ?Sized,
{
    let range = range.abs();
    if range.is_finite() && range > 0.0 {
        rng.random_range(-range..=range)
    } else {
        0.0
    }
}

impl Genome {
    /// Creates a genome holding only the configured input and output nodes.
    #[must_use]
    pub fn empty(input_count: usize, output_count: usize) -> Self {
        let nodes = (0..input_count)
            .map(|i| NodeGene::new(io_node_id(i), NodeType::Input))
            .chain(
                (input_count..input_count + output_count)
                    .map(|i| NodeGene::new(io_node_id(i), NodeType::Output)),
            )
            .collect();
        Self {
            nodes,
            connections: vec![],
            input_count,
            output_count,
            fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    /// Creates a fully connected input → output genome with random weights.
    ///
    /// Each connection requests its innovation number from `tracker`, so every
    /// basic genome created within one generation shares the same numbering.
    pub fn create_basic<R>(config: &GenomeConfig, tracker: &mut InnovationTracker, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut genome = Self::empty(config.input_count, config.output_count);
        for input in 0..config.input_count {
            for output in config.input_count..config.input_count + config.output_count {
                let (in_id, out_id) = (io_node_id(input), io_node_id(output));
                genome.connections.push(ConnectionGene {
                    in_id,
                    out_id,
                    weight: random_weight(rng, config.weight_init_range),
                    innovation: tracker.get_innovation(in_id, out_id),
                    enabled: true,
                });
            }
        }
        genome
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    #[must_use]
    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn enabled_connection_count(&self) -> usize {
        self.connections.iter().filter(|c| c.enabled).count()
    }

    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Fitness shared with the rest of the species (`fitness / species size`).
    #[must_use]
    pub fn adjusted_fitness(&self) -> f32 {
        self.adjusted_fitness
    }

    pub fn set_adjusted_fitness(&mut self, adjusted_fitness: f32) {
        self.adjusted_fitness = adjusted_fitness;
    }

    /// Clears both raw and adjusted fitness before the next round of episodes.
    pub fn reset_fitness(&mut self) {
        self.fitness = 0.0;
        self.adjusted_fitness = 0.0;
    }

    #[must_use]
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    #[must_use]
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|n| n.id).max()
    }

    #[must_use]
    pub fn max_innovation(&self) -> Option<Innovation> {
        self.connections.iter().map(|c| c.innovation).max()
    }

    /// Applies every mutation operator with its configured probability.
    pub fn mutate<R>(&mut self, config: &GenomeConfig, tracker: &mut InnovationTracker, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if chance(rng, config.weight_mutation_rate) {
            self.mutate_weights(config, rng);
        }
        if chance(rng, config.bias_mutation_rate) {
            self.mutate_biases(config, rng);
        }
        if chance(rng, config.add_node_rate) {
            self.mutate_add_node(tracker, rng);
        }
        if chance(rng, config.add_connection_rate) {
            self.mutate_add_connection(config, tracker, rng);
        }
        if chance(rng, config.toggle_enable_rate) {
            self.mutate_toggle_enable(rng);
        }
    }

    /// Adds a connection between two nodes that are not yet connected.
    ///
    /// The target is never an input node. Unless `config.allow_recurrent` is set,
    /// the source must not be reachable from the target (no cycles, no self
    /// loops). Returns `false` if no valid pair exists.
    pub fn mutate_add_connection<R>(
        &mut self,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> bool
    where
        R: Rng + ?Sized,
    {
        let existing: HashSet<(NodeId, NodeId)> =
            self.connections.iter().map(|c| (c.in_id, c.out_id)).collect();
        let successors = self.successors();

        let mut candidates = vec![];
        for source in &self.nodes {
            for target in &self.nodes {
                if target.node_type == NodeType::Input || existing.contains(&(source.id, target.id)) {
                    continue;
                }
                if !config.allow_recurrent
                    && (source.id == target.id || reaches(&successors, target.id, source.id))
                {
                    continue;
                }
                candidates.push((source.id, target.id));
            }
        }

        let Some(&(in_id, out_id)) = candidates.choose(rng) else {
            return false;
        };
        self.connections.push(ConnectionGene {
            in_id,
            out_id,
            weight: random_weight(rng, config.weight_init_range),
            innovation: tracker.get_innovation(in_id, out_id),
            enabled: true,
        });
        true
    }

    /// Splits a random enabled connection with a new hidden node.
    ///
    /// The original connection is disabled; `in → new` gets weight 1.0 and
    /// `new → out` keeps the original weight, so the network initially computes
    /// nearly the same function. Returns `false` if there is no enabled connection.
    pub fn mutate_add_node<R>(&mut self, tracker: &mut InnovationTracker, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        let enabled = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let Some(&index) = enabled.choose(rng) else {
            return false;
        };

        let split = self.connections[index];
        self.connections[index].enabled = false;

        let new_id = tracker.allocate_node_id();
        self.nodes.push(NodeGene::new(new_id, NodeType::Hidden));
        self.connections.push(ConnectionGene {
            in_id: split.in_id,
            out_id: new_id,
            weight: 1.0,
            innovation: tracker.get_innovation(split.in_id, new_id),
            enabled: true,
        });
        self.connections.push(ConnectionGene {
            in_id: new_id,
            out_id: split.out_id,
            weight: split.weight,
            innovation: tracker.get_innovation(new_id, split.out_id),
            enabled: true,
        });
        true
    }

    /// Perturbs or resets every connection weight.
    ///
    /// Each connection independently gets a full reset with probability
    /// `weight_replace_rate`, otherwise Gaussian noise of `weight_mutation_strength`.
    pub fn mutate_weights<R>(&mut self, config: &GenomeConfig, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let Ok(normal) = Normal::new(0.0, config.weight_mutation_strength.abs()) else {
            return;
        };
        let clamp = config.weight_clamp.abs();
        for connection in &mut self.connections {
            connection.weight = if chance(rng, config.weight_replace_rate) {
                random_weight(rng, config.weight_init_range)
            } else {
                (connection.weight + rng.sample(normal)).clamp(-clamp, clamp)
            };
        }
    }

    /// Perturbs the bias of every non-input node.
    pub fn mutate_biases<R>(&mut self, config: &GenomeConfig, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let Ok(normal) = Normal::new(0.0, config.bias_mutation_strength.abs()) else {
            return;
        };
        let clamp = config.weight_clamp.abs();
        for node in self
            .nodes
            .iter_mut()
            .filter(|n| n.node_type != NodeType::Input)
        {
            node.bias = (node.bias + rng.sample(normal)).clamp(-clamp, clamp);
        }
    }

    /// Flips the enabled flag of one random connection.
    ///
    /// The last enabled connection is never disabled.
    pub fn mutate_toggle_enable<R>(&mut self, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        if self.connections.is_empty() {
            return false;
        }
        let index = rng.random_range(0..self.connections.len());
        let connection = &self.connections[index];
        if connection.enabled && self.enabled_connection_count() <= 1 {
            return false;
        }
        self.connections[index].enabled = !self.connections[index].enabled;
        true
    }

    /// Produces a child from two parents, aligning genes by innovation number.
    ///
    /// The fitter parent (random on ties) contributes all of its disjoint and excess
    /// genes and its node set. Matching genes are taken from either parent with equal
    /// probability. A matching gene disabled in either parent stays disabled with
    /// probability `disabled_gene_inherit_rate`, otherwise it is re-enabled.
    pub fn crossover<R>(parent_a: &Self, parent_b: &Self, config: &GenomeConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let (fitter, other) = match parent_a.fitness.total_cmp(&parent_b.fitness) {
            Ordering::Greater => (parent_a, parent_b),
            Ordering::Less => (parent_b, parent_a),
            Ordering::Equal if rng.random_bool(0.5) => (parent_a, parent_b),
            Ordering::Equal => (parent_b, parent_a),
        };

        let other_genes: HashMap<Innovation, &ConnectionGene> = other
            .connections
            .iter()
            .map(|c| (c.innovation, c))
            .collect();

        let connections = fitter
            .connections
            .iter()
            .map(|gene| match other_genes.get(&gene.innovation) {
                Some(&other_gene) => {
                    let mut child_gene = if rng.random_bool(0.5) {
                        *gene
                    } else {
                        *other_gene
                    };
                    if !gene.enabled || !other_gene.enabled {
                        child_gene.enabled = !chance(rng, config.disabled_gene_inherit_rate);
                    }
                    child_gene
                }
                None => *gene,
            })
            .collect::<Vec<_>>();

        let mut nodes = fitter.nodes.clone();
        let mut known: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        for connection in &connections {
            for id in [connection.in_id, connection.out_id] {
                if known.insert(id) {
                    let node = other
                        .nodes
                        .iter()
                        .find(|n| n.id == id)
                        .copied()
                        .unwrap_or_else(|| NodeGene::new(id, NodeType::Hidden));
                    nodes.push(node);
                }
            }
        }

        Self {
            nodes,
            connections,
            input_count: fitter.input_count,
            output_count: fitter.output_count,
            fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    /// Compatibility distance between two genomes.
    ///
    /// Genes present in only one genome are excess if their innovation number is
    /// above the other genome's highest, disjoint otherwise.
    #[must_use]
    pub fn distance(&self, other: &Self, coefficients: &DistanceCoefficients) -> f32 {
        if self.connections.is_empty() && other.connections.is_empty() {
            return 0.0;
        }

        let genes_a: HashMap<Innovation, f32> = self
            .connections
            .iter()
            .map(|c| (c.innovation, c.weight))
            .collect();
        let genes_b: HashMap<Innovation, f32> = other
            .connections
            .iter()
            .map(|c| (c.innovation, c.weight))
            .collect();
        let max_a = self.max_innovation();
        let max_b = other.max_innovation();

        let mut excess = 0_usize;
        let mut disjoint = 0_usize;
        let mut matching = 0_usize;
        let mut weight_diff = 0.0_f32;

        let mut classify = |innovation: Innovation, other_max: Option<Innovation>| match other_max {
            Some(max) if innovation <= max => disjoint += 1,
            _ => excess += 1,
        };
        for (innovation, weight_a) in &genes_a {
            match genes_b.get(innovation) {
                Some(weight_b) => {
                    matching += 1;
                    weight_diff += (weight_a - weight_b).abs();
                }
                None => classify(*innovation, max_b),
            }
        }
        for innovation in genes_b.keys() {
            if !genes_a.contains_key(innovation) {
                classify(*innovation, max_a);
            }
        }

        #[expect(clippy::cast_precision_loss)]
        let (n, excess, disjoint, matching) = (
            self.connections.len().max(other.connections.len()).max(1) as f32,
            excess as f32,
            disjoint as f32,
            matching as f32,
        );
        let weight_avg = if matching > 0.0 {
            weight_diff / matching
        } else {
            0.0
        };
        coefficients.excess * excess / n
            + coefficients.disjoint * disjoint / n
            + coefficients.weight * weight_avg
    }

    /// Converts the genome into its on-disk form.
    #[must_use]
    pub fn to_record(&self) -> GenomeRecord {
        GenomeRecord {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            fitness: self.fitness,
        }
    }

    /// Rebuilds a genome from its on-disk form.
    ///
    /// The result always satisfies the genome invariants: the configured input and
    /// output nodes exist with the right types, node ids are unique, and every
    /// connection references existing nodes, never targets an input, and has a
    /// unique innovation number and node pair. Anything violating these is dropped.
    #[must_use]
    pub fn from_record(record: GenomeRecord, input_count: usize, output_count: usize) -> Self {
        let mut genome = Self::empty(input_count, output_count);
        let io_count = input_count + output_count;
        let mut dropped = 0_usize;

        let mut seen_nodes: HashSet<NodeId> = HashSet::new();
        for node in record.nodes {
            if !seen_nodes.insert(node.id) {
                dropped += 1;
                continue;
            }
            if (node.id as usize) < io_count {
                genome.nodes[node.id as usize].bias = node.bias;
            } else {
                genome.nodes.push(NodeGene {
                    node_type: NodeType::Hidden,
                    ..node
                });
            }
        }

        let known: HashSet<NodeId> = genome.nodes.iter().map(|n| n.id).collect();
        let mut seen_innovations = HashSet::new();
        let mut seen_pairs = HashSet::new();
        for connection in record.connections {
            let valid = known.contains(&connection.in_id)
                && known.contains(&connection.out_id)
                && (connection.out_id as usize) >= input_count
                && connection.weight.is_finite()
                && seen_innovations.insert(connection.innovation)
                && seen_pairs.insert((connection.in_id, connection.out_id));
            if valid {
                genome.connections.push(connection);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            log::warn!("dropped {dropped} invalid genes while loading genome");
        }
        genome.fitness = if record.fitness.is_finite() {
            record.fitness
        } else {
            0.0
        };
        genome
    }

    fn successors(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut successors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for connection in &self.connections {
            successors
                .entry(connection.in_id)
                .or_default()
                .push(connection.out_id);
        }
        successors
    }
}

/// Returns whether `to` is reachable from `from` following connections.
fn reaches(successors: &HashMap<NodeId, Vec<NodeId>>, from: NodeId, to: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if visited.insert(node) {
            if let Some(next) = successors.get(&node) {
                stack.extend(next);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn basic(config: &GenomeConfig, tracker: &mut InnovationTracker, rng: &mut Pcg32) -> Genome {
        Genome::create_basic(config, tracker, rng)
    }

    fn setup() -> (GenomeConfig, InnovationTracker, Pcg32) {
        let config = GenomeConfig::default();
        let tracker = InnovationTracker::for_shape(config.input_count, config.output_count);
        (config, tracker, Pcg32::seed_from_u64(7))
    }

    #[test]
    fn test_create_basic_is_fully_connected() {
        let (config, mut tracker, mut rng) = setup();
        let genome = basic(&config, &mut tracker, &mut rng);
        assert_eq!(genome.node_count(), 5);
        assert_eq!(genome.connection_count(), 6);

        // a second basic genome in the same generation shares the numbering
        let other = basic(&config, &mut tracker, &mut rng);
        let innovations = |g: &Genome| g.connections().iter().map(|c| c.innovation).collect::<Vec<_>>();
        assert_eq!(innovations(&genome), innovations(&other));
    }

    #[test]
    fn test_add_node_splits_connection() {
        let (config, mut tracker, mut rng) = setup();
        let mut genome = basic(&config, &mut tracker, &mut rng);
        assert!(genome.mutate_add_node(&mut tracker, &mut rng));

        assert_eq!(genome.node_count(), 6);
        assert_eq!(genome.enabled_connection_count(), 7);
        assert_eq!(genome.connection_count(), 8);

        let disabled = genome.connections().iter().find(|c| !c.enabled).unwrap();
        let new_id = genome.nodes().last().unwrap().id;
        let into = genome.connections().iter().find(|c| c.out_id == new_id).unwrap();
        let out_of = genome.connections().iter().find(|c| c.in_id == new_id).unwrap();
        assert_eq!(into.in_id, disabled.in_id);
        assert!((into.weight - 1.0).abs() < f32::EPSILON);
        assert_eq!(out_of.out_id, disabled.out_id);
        assert!((out_of.weight - disabled.weight).abs() < f32::EPSILON);
    }

    #[test]
    fn test_add_node_without_connections_is_noop() {
        let (_, mut tracker, mut rng) = setup();
        let mut genome = Genome::empty(3, 2);
        assert!(!genome.mutate_add_node(&mut tracker, &mut rng));
        assert_eq!(genome.node_count(), 5);
    }

    #[test]
    fn test_add_connection_on_complete_graph_is_noop() {
        let (config, mut tracker, mut rng) = setup();
        let mut genome = basic(&config, &mut tracker, &mut rng);
        assert!(!genome.mutate_add_connection(&config, &mut tracker, &mut rng));
        assert_eq!(genome.connection_count(), 6);
    }

    #[test]
    fn test_add_connection_stays_acyclic() {
        let (config, mut tracker, mut rng) = setup();
        let mut genome = basic(&config, &mut tracker, &mut rng);
        for _ in 0..10 {
            genome.mutate_add_node(&mut tracker, &mut rng);
        }
        for _ in 0..50 {
            genome.mutate_add_connection(&config, &mut tracker, &mut rng);
        }
        let successors = genome.successors();
        for c in genome.connections() {
            assert_ne!(c.in_id, c.out_id);
            assert!(!reaches(&successors, c.out_id, c.in_id), "cycle through {c:?}");
        }
        let pairs: HashSet<_> = genome.connections().iter().map(|c| (c.in_id, c.out_id)).collect();
        assert_eq!(pairs.len(), genome.connection_count());
    }

    #[test]
    fn test_recurrent_allows_self_loops() {
        let (mut config, mut tracker, mut rng) = setup();
        config.allow_recurrent = true;
        let mut genome = Genome::empty(1, 1);
        // 1 input, 1 output: only in→out and out→out are possible targets
        assert!(genome.mutate_add_connection(&config, &mut tracker, &mut rng));
        assert!(genome.mutate_add_connection(&config, &mut tracker, &mut rng));
        assert!(!genome.mutate_add_connection(&config, &mut tracker, &mut rng));
        assert!(genome.connections().iter().any(|c| c.in_id == 1 && c.out_id == 1));
    }

    #[test]
    fn test_weight_mutation_respects_clamp() {
        let (mut config, mut tracker, mut rng) = setup();
        config.weight_mutation_strength = 100.0;
        config.weight_replace_rate = 0.0;
        let mut genome = basic(&config, &mut tracker, &mut rng);
        let before = genome.clone();
        genome.mutate_weights(&config, &mut rng);
        assert_ne!(before.connections(), genome.connections());
        assert!(genome.connections().iter().all(|c| c.weight.abs() <= config.weight_clamp));
    }

    #[test]
    fn test_clone_is_independent() {
        let (config, mut tracker, mut rng) = setup();
        let original = basic(&config, &mut tracker, &mut rng);
        let mut copy = original.clone();
        copy.mutate_add_node(&mut tracker, &mut rng);
        copy.set_fitness(42.0);
        assert_eq!(original.node_count(), 5);
        assert_eq!(original.connection_count(), 6);
        assert!(original.connections().iter().all(|c| c.enabled));
        assert!(original.fitness().abs() < f32::EPSILON);
    }

    #[test]
    fn test_crossover_takes_structure_of_fitter_parent() {
        let (config, mut tracker, mut rng) = setup();
        let mut a = basic(&config, &mut tracker, &mut rng);
        let mut b = basic(&config, &mut tracker, &mut rng);
        a.set_fitness(100.0);
        b.set_fitness(10.0);
        let child = Genome::crossover(&a, &b, &config, &mut rng);
        assert_eq!(child.connection_count(), a.connection_count());

        // b grows extra structure, but a is still fitter
        b.mutate_add_node(&mut tracker, &mut rng);
        let child = Genome::crossover(&a, &b, &config, &mut rng);
        assert_eq!(child.connection_count(), a.connection_count());
        assert_eq!(child.node_count(), a.node_count());

        // now b is fitter: its hidden node comes along
        b.set_fitness(200.0);
        let child = Genome::crossover(&a, &b, &config, &mut rng);
        assert_eq!(child.connection_count(), b.connection_count());
        assert_eq!(child.node_count(), b.node_count());
        for c in child.connections() {
            assert!(child.has_node(c.in_id) && child.has_node(c.out_id));
        }
    }

    #[test]
    fn test_crossover_disabled_gene_inheritance() {
        let (mut config, mut tracker, mut rng) = setup();
        let mut a = basic(&config, &mut tracker, &mut rng);
        let b = a.clone();
        a.connections[0].enabled = false;
        a.set_fitness(1.0);

        config.disabled_gene_inherit_rate = 1.0;
        let child = Genome::crossover(&a, &b, &config, &mut rng);
        assert!(!child.connections()[0].enabled);

        config.disabled_gene_inherit_rate = 0.0;
        let child = Genome::crossover(&a, &b, &config, &mut rng);
        assert!(child.connections()[0].enabled);
    }

    #[test]
    fn test_distance() {
        let (config, mut tracker, mut rng) = setup();
        let coefficients = DistanceCoefficients::default();
        let a = basic(&config, &mut tracker, &mut rng);
        assert!(a.distance(&a, &coefficients).abs() < f32::EPSILON);

        let mut b = a.clone();
        b.mutate_add_node(&mut tracker, &mut rng);
        // two excess genes over 8 connections, all matching weights equal
        let d = a.distance(&b, &coefficients);
        assert!((d - 2.0 / 8.0).abs() < 1e-6, "{d}");
        assert!((b.distance(&a, &coefficients) - d).abs() < 1e-6);

        let empty = Genome::empty(3, 2);
        assert!(empty.distance(&empty, &coefficients).abs() < f32::EPSILON);
    }

    #[test]
    fn test_record_round_trip() {
        let (config, mut tracker, mut rng) = setup();
        let mut genome = basic(&config, &mut tracker, &mut rng);
        genome.mutate_add_node(&mut tracker, &mut rng);
        genome.mutate_biases(&config, &mut rng);
        genome.set_fitness(1234.5);

        let json = serde_json::to_string(&genome.to_record()).unwrap();
        let record: GenomeRecord = serde_json::from_str(&json).unwrap();
        let restored = Genome::from_record(record, 3, 2);

        assert_eq!(restored.nodes(), genome.nodes());
        assert_eq!(restored.connections(), genome.connections());
        assert!((restored.fitness() - 1234.5).abs() < 1e-3);
    }

    #[test]
    fn test_from_record_sanitizes() {
        let record: GenomeRecord = serde_json::from_str(
            r#"{
                "nodes": [{"id": 9, "node_type": "input"}, {"id": 9, "node_type": "hidden"}],
                "connections": [
                    {"in_id": 0, "out_id": 9, "weight": 0.5, "innovation": 1},
                    {"in_id": 9, "out_id": 0, "weight": 0.5, "innovation": 2},
                    {"in_id": 0, "out_id": 77, "weight": 0.5, "innovation": 3},
                    {"in_id": 1, "out_id": 9, "weight": 0.5, "innovation": 1}
                ]
            }"#,
        )
        .unwrap();
        let genome = Genome::from_record(record, 2, 1);
        assert_eq!(genome.node_count(), 4);
        assert_eq!(genome.nodes()[3].node_type, NodeType::Hidden);
        assert_eq!(genome.connection_count(), 1);
        assert!(genome.connections()[0].enabled);

        let empty = Genome::from_record(GenomeRecord::default(), 3, 2);
        assert_eq!(empty, Genome::empty(3, 2));
    }
}

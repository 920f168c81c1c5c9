//! Weight vector operations for fixed-topology evolution.
//!
//! A [`FeedForwardNetwork`](evolve_network::feedforward::FeedForwardNetwork) is fully
//! described by one flat weight vector, so the fixed-topology genetic algorithm only
//! needs operators on `[f32]`. They are used by
//! [`FixedTopologyEvolution`](crate::fixed_topology::FixedTopologyEvolution) to breed
//! offspring; initial weights come from
//! [`NetworkShape::random_weights`](evolve_network::feedforward::NetworkShape::random_weights),
//! which scales each layer to its fan-in.
//!
//! # Operations
//!
//! - **Crossover**: [`two_point_crossover`] swaps a contiguous segment between parents
//! - **Mutation**: [`mutate`] applies per-weight Gaussian noise with clamping
//!
//! # Design Decisions
//!
//! ## Two-Point Crossover
//!
//! The flat layout stores each layer's weights contiguously, so a contiguous segment
//! from one parent tends to carry whole rows (a hidden unit's incoming weights)
//! intact. Uniform crossover would shred those rows.
//!
//! ## Gaussian Mutation With Clamp
//!
//! Small perturbations dominate, occasional large ones escape local optima. The clamp
//! keeps `tanh` units out of saturation so later mutations still have an effect.

use rand::Rng;
use rand_distr::Normal;

/// Creates a weight vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use evolve_training::weights;
///
/// let weights = weights::from_fn(|i| i as f32 * 0.5, 3);
/// assert_eq!(weights, vec![0.0, 0.5, 1.0]);
/// ```
pub fn from_fn<F>(f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    (0..len).map(f).collect()
}

/// Two-point crossover.
///
/// Picks `lo <= hi` uniformly and returns a child equal to `p1` outside `lo..hi`
/// and to `p2` inside it. When the parents differ in length the child follows
/// the shorter one.
///
/// # Examples
///
/// ```
/// use evolve_training::weights;
/// use rand::SeedableRng as _;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
/// let child = weights::two_point_crossover(&[0.0; 8], &[1.0; 8], &mut rng);
/// assert_eq!(child.len(), 8);
/// assert!(child.iter().all(|w| *w == 0.0 || *w == 1.0));
/// ```
pub fn two_point_crossover<R>(p1: &[f32], p2: &[f32], rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    let len = p1.len().min(p2.len());
    if len == 0 {
        return vec![];
    }
    let a = rng.random_range(0..len);
    let b = rng.random_range(0..len);
    let (lo, hi) = (a.min(b), a.max(b));
    from_fn(|i| if (lo..hi).contains(&i) { p2[i] } else { p1[i] }, len)
}

/// Applies Gaussian mutation to a weight vector in-place.
///
/// For each weight, with probability `rate`, adds a sample of `N(0, sigma)` and
/// clamps the result to `[-clamp, clamp]`. A negative or non-finite `sigma`
/// leaves the vector untouched.
///
/// # Arguments
///
/// * `weights` - Weight vector to mutate (modified in-place)
/// * `sigma` - Standard deviation of the perturbation
/// * `clamp` - Absolute bound of any weight
/// * `rate` - Probability of mutating each weight
/// * `rng` - Random number generator
pub fn mutate<R>(weights: &mut [f32], sigma: f32, clamp: f32, rate: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let Ok(normal) = Normal::new(0.0, sigma) else {
        return;
    };
    let rate = f64::from(rate.clamp(0.0, 1.0));
    for w in weights {
        if rng.random_bool(rate) {
            *w = (*w + rng.sample(normal)).clamp(-clamp, clamp);
        }
    }
}

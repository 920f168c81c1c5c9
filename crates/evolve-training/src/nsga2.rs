//! NSGA-II multi-objective selection.
//!
//! Individuals report an [`ObjectiveVector`] instead of a single score. NSGA-II ranks
//! them by Pareto dominance and, within a rank, prefers isolated individuals so the
//! population spreads along the trade-off surface instead of collapsing onto one
//! corner of it.
//!
//! All objectives are maximized.
//!
//! # Components
//!
//! - [`dominates`] - Pareto dominance test
//! - [`non_dominated_sort`] - partition into fronts (front 0 = Pareto front)
//! - [`crowding_distance`] - isolation of each member within a front
//! - [`select`] - truncate a population to `k` survivors, front by front
//! - [`Ranking`] - rank and crowding of every individual, for binary tournaments
//! - [`hypervolume_2d`] - area dominated by a 2-D front, reported as a diversity metric
//!
//! # Example
//!
//! ```
//! use evolve_training::nsga2;
//!
//! let objectives = [[10.0, 10.0, 10.0], [5.0, 5.0, 5.0], [12.0, 1.0, 10.0]];
//! let fronts = nsga2::non_dominated_sort(&objectives);
//! assert_eq!(fronts, vec![vec![0, 2], vec![1]]);
//! ```

use rand::Rng;

/// Scores of one individual on the three game objectives.
pub type ObjectiveVector = [f32; 3];

/// Scalar fitness of an objective vector when multi-objective mode is off.
#[must_use]
pub fn scalarize(objectives: &ObjectiveVector) -> f32 {
    objectives.iter().sum()
}

/// `a` dominates `b` iff `a ≥ b` on every objective and `a > b` on at least one.
#[must_use]
pub fn dominates(a: &[f32], b: &[f32]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            return false;
        }
        strictly_better |= x > y;
    }
    strictly_better
}

/// Partitions all indices into fronts of mutual non-domination.
///
/// Front 0 holds every individual no one dominates; front `k + 1` holds those
/// dominated only by members of fronts `0..=k`. Every index appears in exactly one
/// front, and indices are ascending within a front.
#[must_use]
pub fn non_dominated_sort(objectives: &[ObjectiveVector]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut domination_count = vec![0_usize; n];
    let mut dominated = vec![vec![]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&objectives[i], &objectives[j]) {
                dominated[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&objectives[j], &objectives[i]) {
                dominated[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = vec![];
    let mut current = (0..n)
        .filter(|&i| domination_count[i] == 0)
        .collect::<Vec<_>>();
    while !current.is_empty() {
        let mut next = vec![];
        for &i in &current {
            for &j in &dominated[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of `front`, in the same order as `front`.
///
/// For each objective the front is sorted along it; the two boundary members get
/// `+∞` and interior members accumulate the gap between their neighbours divided by
/// the objective's range. Interior contributions are skipped for fronts of at most
/// two members and for objectives whose range is zero.
#[must_use]
pub fn crowding_distance(front: &[usize], objectives: &[ObjectiveVector]) -> Vec<f32> {
    let len = front.len();
    let mut distance = vec![0.0_f32; len];
    if len == 0 {
        return distance;
    }

    for m in 0..3 {
        let mut sorted = (0..len).collect::<Vec<_>>();
        sorted.sort_by(|&a, &b| objectives[front[a]][m].total_cmp(&objectives[front[b]][m]));

        let first = sorted[0];
        let last = sorted[len - 1];
        distance[first] = f32::INFINITY;
        distance[last] = f32::INFINITY;

        let range = objectives[front[last]][m] - objectives[front[first]][m];
        if len <= 2 || range <= 0.0 {
            continue;
        }
        for w in sorted.windows(3) {
            let gap = objectives[front[w[2]]][m] - objectives[front[w[0]]][m];
            distance[w[1]] += gap / range;
        }
    }
    distance
}

/// Picks `k` survivors: whole fronts from front 0 upward, then the most isolated
/// members of the first front that does not fit.
///
/// `k` is capped at the population size. Boundary members (infinite crowding
/// distance) of the overflowing front are always taken first.
#[must_use]
pub fn select(objectives: &[ObjectiveVector], k: usize) -> Vec<usize> {
    let k = k.min(objectives.len());
    let mut selected = Vec::with_capacity(k);
    for front in non_dominated_sort(objectives) {
        let remaining = k - selected.len();
        if remaining == 0 {
            break;
        }
        if front.len() <= remaining {
            selected.extend(front);
            continue;
        }
        let distance = crowding_distance(&front, objectives);
        let mut order = (0..front.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| distance[b].total_cmp(&distance[a]));
        selected.extend(order.into_iter().take(remaining).map(|i| front[i]));
    }
    selected
}

/// Front rank and crowding distance of every individual of a population.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    fronts: Vec<Vec<usize>>,
    rank: Vec<usize>,
    crowding: Vec<f32>,
}

impl Ranking {
    #[must_use]
    pub fn new(objectives: &[ObjectiveVector]) -> Self {
        let fronts = non_dominated_sort(objectives);
        let mut rank = vec![0; objectives.len()];
        let mut crowding = vec![0.0; objectives.len()];
        for (r, front) in fronts.iter().enumerate() {
            let distance = crowding_distance(front, objectives);
            for (&i, d) in front.iter().zip(distance) {
                rank[i] = r;
                crowding[i] = d;
            }
        }
        Self {
            fronts,
            rank,
            crowding,
        }
    }

    #[must_use]
    pub fn fronts(&self) -> &[Vec<usize>] {
        &self.fronts
    }

    #[must_use]
    pub fn rank(&self, index: usize) -> usize {
        self.rank[index]
    }

    #[must_use]
    pub fn crowding(&self, index: usize) -> f32 {
        self.crowding[index]
    }

    /// Crowded-comparison order: lower rank first, then larger crowding distance.
    #[must_use]
    pub fn compare(&self, a: usize, b: usize) -> std::cmp::Ordering {
        self.rank[a]
            .cmp(&self.rank[b])
            .then_with(|| self.crowding[b].total_cmp(&self.crowding[a]))
    }

    /// Binary tournament: two random candidates, the better under [`compare`](Self::compare)
    /// wins and ties go to the first.
    ///
    /// Returns `None` for an empty population.
    pub fn tournament_select<R>(&self, rng: &mut R) -> Option<usize>
    where
        R: Rng + ?Sized,
    {
        let n = self.rank.len();
        if n == 0 {
            return None;
        }
        let a = rng.random_range(0..n);
        let b = rng.random_range(0..n);
        Some(if self.compare(b, a).is_lt() { b } else { a })
    }
}

/// Area dominated by a 2-D front with respect to `reference` (both axes maximized).
///
/// Points are swept in descending order of the first axis; each contributes the
/// rectangle it adds above the best second-axis value seen so far. Points not
/// strictly better than the reference on both axes contribute nothing.
#[must_use]
pub fn hypervolume_2d(front: &[(f32, f32)], reference: (f32, f32)) -> f32 {
    let mut points = front
        .iter()
        .copied()
        .filter(|&(x, y)| x > reference.0 && y > reference.1)
        .collect::<Vec<_>>();
    points.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut volume = 0.0;
    let mut covered_y = reference.1;
    for (x, y) in points {
        if y > covered_y {
            volume += (x - reference.0) * (y - covered_y);
            covered_y = y;
        }
    }
    volume
}

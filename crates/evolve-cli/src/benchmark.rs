//! Built-in catch-and-evade task used to train and replay agents.
//!
//! The agent lives on the line `[-1, 1]`. A target appears at a random spot and
//! is collected when the agent gets close; a hazard starts at the far side and
//! creeps towards the agent, ending the episode on contact.
//!
//! Network inputs are the agent position, the offset to the target, and the
//! offset to the hazard. Outputs are a movement direction and a speed boost.
//!
//! Each episode reports three objectives, all to be maximized:
//!
//! 0. collected targets (x100)
//! 1. survived steps
//! 2. explored cells (x10)

use evolve_training::{nsga2::ObjectiveVector, strategy::PolicyNetwork};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

pub const INPUT_COUNT: usize = 3;
pub const OUTPUT_COUNT: usize = 2;

const MAX_STEPS: usize = 500;
const CELL_COUNT: usize = 20;
const BASE_SPEED: f32 = 0.05;
const HAZARD_SPEED: f32 = 0.01;
const CATCH_RADIUS: f32 = 0.1;
const HIT_RADIUS: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct CatchTask {
    episodes: usize,
}

impl CatchTask {
    pub fn new(episodes: usize) -> Self {
        Self {
            episodes: episodes.max(1),
        }
    }

    /// Ranges of objectives 1 and 2, used as MAP-Elites behaviour axes.
    #[expect(clippy::cast_precision_loss)]
    pub fn behavior_ranges() -> [(f32, f32); 2] {
        [
            (0.0, MAX_STEPS as f32),
            (0.0, CELL_COUNT as f32 * 10.0),
        ]
    }

    /// Mean objectives over all episodes. Episode `i` always uses seed `i`, so
    /// every individual faces the same scenarios.
    pub fn evaluate(&self, network: &mut PolicyNetwork) -> ObjectiveVector {
        let mut total = [0.0; 3];
        for episode in 0..self.episodes {
            network.reset();
            let objectives = play_episode(network, episode as u64);
            for (sum, value) in total.iter_mut().zip(objectives) {
                *sum += value;
            }
        }
        #[expect(clippy::cast_precision_loss)]
        let episodes = self.episodes as f32;
        total.map(|sum| sum / episodes)
    }
}

#[expect(clippy::cast_precision_loss)]
fn play_episode(network: &mut PolicyNetwork, seed: u64) -> ObjectiveVector {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut agent = 0.0_f32;
    let mut target: f32 = rng.random_range(-1.0..=1.0);
    let mut hazard = if target > 0.0 { -1.0 } else { 1.0 };

    let mut collected = 0_u32;
    let mut visited = [false; CELL_COUNT];
    let mut steps = 0_usize;
    while steps < MAX_STEPS {
        let (direction, boost) = {
            let outputs = network.forward(&[agent, target - agent, hazard - agent]);
            (
                outputs.first().copied().unwrap_or(0.0),
                outputs.get(1).copied().unwrap_or(0.0),
            )
        };
        let speed = BASE_SPEED * (1.0 + boost.clamp(-1.0, 1.0));
        agent = (agent + direction.clamp(-1.0, 1.0) * speed).clamp(-1.0, 1.0);
        hazard += (agent - hazard).signum() * HAZARD_SPEED;
        visited[cell_of(agent)] = true;
        steps += 1;

        if (agent - target).abs() < CATCH_RADIUS {
            collected += 1;
            target = rng.random_range(-1.0..=1.0);
        }
        if (agent - hazard).abs() < HIT_RADIUS {
            break;
        }
    }

    let explored = visited.iter().filter(|v| **v).count();
    [
        collected as f32 * 100.0,
        steps as f32,
        explored as f32 * 10.0,
    ]
}

fn cell_of(position: f32) -> usize {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let cell = ((position + 1.0) / 2.0 * CELL_COUNT as f32) as usize;
    cell.min(CELL_COUNT - 1)
}

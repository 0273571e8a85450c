use crate::config::{Interleave, PhaseConfig};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use winstair_core::{Condition, Difficulty};

/// One condition's run of consecutive trials within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// 1-based, cumulative across the phase.
    pub number: usize,
    pub condition: Condition,
    /// 0-based repetition round the block came from.
    pub repetition: usize,
    pub trials: usize,
    pub rest_after: bool,
}

pub struct BlockSequencer;

impl BlockSequencer {
    /// `blocks_per_condition` rounds, each a fresh permutation of
    /// `conditions`.
    pub fn order<R: Rng + ?Sized>(
        conditions: &[Condition],
        blocks_per_condition: usize,
        rng: &mut R,
    ) -> Vec<Condition> {
        let mut order = Vec::with_capacity(conditions.len() * blocks_per_condition);
        for _ in 0..blocks_per_condition {
            let mut round = conditions.to_vec();
            round.shuffle(rng);
            order.extend(round);
        }
        order
    }

    pub fn sequence<R: Rng + ?Sized>(
        conditions: &[Condition],
        phase: &PhaseConfig,
        rng: &mut R,
    ) -> Vec<Block> {
        let per_round = conditions.len().max(1);
        Self::order(conditions, phase.blocks_per_condition, rng)
            .into_iter()
            .enumerate()
            .map(|(i, condition)| Block {
                number: i + 1,
                condition,
                repetition: i / per_round,
                trials: phase.trials_per_block,
                rest_after: phase.rest_after_blocks.contains(&(i + 1)),
            })
            .collect()
    }
}

/// Decides easy or hard for each trial slot of one (phase, condition).
/// State carries over between that condition's blocks.
#[derive(Debug, Clone)]
pub struct DifficultyInterleaver {
    mode: Interleave,
    queue: VecDeque<Difficulty>,
}

impl DifficultyInterleaver {
    pub fn new(mode: Interleave) -> Self {
        Self {
            mode,
            queue: VecDeque::with_capacity(Difficulty::ALL.len()),
        }
    }

    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Difficulty {
        if self.queue.is_empty() {
            let mut pass = Difficulty::ALL;
            if self.mode == Interleave::Random {
                pass.shuffle(rng);
            }
            self.queue.extend(pass);
        }
        self.queue.pop_front().unwrap_or(Difficulty::Easy)
    }
}

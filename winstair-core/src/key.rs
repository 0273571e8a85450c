use crate::{Condition, Difficulty, StaircasePhase};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one adaptive thread: all trials sharing a key are processed in
/// strict sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaircaseKey {
    pub phase: StaircasePhase,
    pub condition: Condition,
    pub difficulty: Difficulty,
}

impl StaircaseKey {
    pub fn new(phase: StaircasePhase, condition: Condition, difficulty: Difficulty) -> Self {
        Self {
            phase,
            condition,
            difficulty,
        }
    }

    /// The baseline key with the same condition and difficulty.
    pub fn baseline_counterpart(&self) -> Self {
        Self {
            phase: StaircasePhase::Baseline,
            ..*self
        }
    }

    /// Every key for the given phase and conditions, easy before hard.
    pub fn all_for(phase: StaircasePhase, conditions: &[Condition]) -> Vec<Self> {
        conditions
            .iter()
            .flat_map(|&c| Difficulty::ALL.into_iter().map(move |d| Self::new(phase, c, d)))
            .collect()
    }
}

impl fmt::Display for StaircaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.phase, self.condition, self.difficulty)
    }
}

/// Stimulus pools are partitioned exactly like staircases, so the partition
/// key is the staircase key.
pub type PartitionKey = StaircaseKey;

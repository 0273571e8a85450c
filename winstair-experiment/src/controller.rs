//! Trial-by-trial intensity decisions.
//!
//! Baseline keys follow their [`UpDownStaircase`]. Main keys start from the
//! baseline's final intensity, hold it for `hold_trials` trials, then every
//! `evaluate_every`-th trial compare recent accuracy against the difficulty's
//! target and move one `step_db` step in the decibel domain.

use crate::config::{ControllerPolicy, ExperimentConfig};
use crate::error::{ExperimentError, Result};
use crate::staircase::{from_db, round_to, to_db, UpDownStaircase};
use crate::tracker::IntensityTracker;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use winstair_core::{Condition, Difficulty, StaircaseKey, StaircasePhase};

/// Context handed downstream with each decided intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub key: StaircaseKey,
    /// 0-based trial index within `key`.
    pub key_trial: usize,
    /// Applied change in dB; zero when intensity was held.
    pub modification_db: f64,
    /// Accuracy the decision was based on, when one was evaluated.
    pub recent_accuracy: Option<f64>,
}

impl StepParams {
    pub fn condition(&self) -> Condition {
        self.key.condition
    }

    pub fn difficulty(&self) -> Difficulty {
        self.key.difficulty
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveController {
    policy: ControllerPolicy,
    baseline: HashMap<StaircaseKey, UpDownStaircase>,
    main_start: HashMap<StaircaseKey, f64>,
}

impl AdaptiveController {
    /// Builds one baseline staircase per configured condition and difficulty.
    pub fn new(config: &ExperimentConfig) -> Result<Self> {
        let mut baseline = HashMap::new();
        for key in StaircaseKey::all_for(StaircasePhase::Baseline, &config.conditions) {
            let start = config
                .start_value(key.condition, key.difficulty)
                .ok_or(ExperimentError::InvalidKey(key))?;
            let rule = config.baseline_rule.for_difficulty(key.difficulty).clone();
            baseline.insert(key, UpDownStaircase::new(start, rule));
        }
        Ok(Self {
            policy: config.policy.clone(),
            baseline,
            main_start: HashMap::new(),
        })
    }

    /// Copies each baseline key's final intensity into the matching main key's
    /// start value. Baseline history is only read. A key that never ran a
    /// baseline trial falls back to its staircase's current intensity.
    pub fn snapshot_baseline(&mut self, tracker: &IntensityTracker) -> Vec<(StaircaseKey, f64)> {
        let mut starts: Vec<(StaircaseKey, f64)> = self
            .baseline
            .iter()
            .map(|(key, stair)| {
                let start = match tracker.last_intensity(key) {
                    Ok(v) => v,
                    Err(_) => {
                        warn!(key = %key, "no baseline trials recorded, using staircase start value");
                        round_to(stair.intensity(), self.policy.round_decimals)
                    }
                };
                let main_key = StaircaseKey::new(StaircasePhase::Main, key.condition, key.difficulty);
                (main_key, start)
            })
            .collect();
        starts.sort_by_key(|(k, _)| *k);
        for (key, start) in &starts {
            info!(key = %key, start, "main staircase start value");
            self.main_start.insert(*key, *start);
        }
        starts
    }

    pub fn main_start(&self, key: &StaircaseKey) -> Option<f64> {
        self.main_start.get(key).copied()
    }

    /// Intensity for the upcoming trial of `key`.
    pub fn next_intensity(
        &self,
        key: &StaircaseKey,
        tracker: &IntensityTracker,
    ) -> Result<(f64, StepParams)> {
        let key_trial = tracker.trial_count(key);
        match key.phase {
            StaircasePhase::Baseline => {
                let stair = self
                    .baseline
                    .get(key)
                    .ok_or(ExperimentError::InvalidKey(*key))?;
                let params = StepParams {
                    key: *key,
                    key_trial,
                    modification_db: 0.0,
                    recent_accuracy: None,
                };
                let intensity = round_to(stair.intensity(), self.policy.round_decimals);
                debug!(key = %key, key_trial, intensity, "baseline staircase intensity");
                Ok((intensity, params))
            }
            StaircasePhase::Main => {
                let start = self
                    .main_start
                    .get(key)
                    .copied()
                    .ok_or(ExperimentError::InvalidKey(*key))?;
                let (previous, accuracy) = if key_trial == 0 {
                    (start, None)
                } else {
                    let previous = tracker.last_intensity(key)?;
                    let due = key_trial >= self.policy.hold_trials
                        && key_trial % self.policy.evaluate_every == 0;
                    let accuracy = if due {
                        tracker.recent_accuracy(key, self.policy.accuracy_window)
                    } else {
                        None
                    };
                    (previous, accuracy)
                };
                let modification_db = accuracy
                    .map(|acc| self.modification(acc, key.difficulty))
                    .unwrap_or(0.0);
                // trial 0 reuses the snapshot as recorded
                let intensity = if key_trial == 0 {
                    start
                } else {
                    self.apply_step(previous, modification_db)
                };
                debug!(
                    key = %key,
                    key_trial,
                    ?accuracy,
                    target = self.policy.target(key.difficulty),
                    modification_db,
                    previous,
                    intensity,
                    "main staircase intensity"
                );
                Ok((
                    intensity,
                    StepParams {
                        key: *key,
                        key_trial,
                        modification_db,
                        recent_accuracy: accuracy,
                    },
                ))
            }
        }
    }

    /// Below target steps easier (louder), above target steps harder.
    pub fn modification(&self, accuracy: f64, difficulty: Difficulty) -> f64 {
        let target = self.policy.target(difficulty);
        if accuracy < target {
            self.policy.step_db
        } else if accuracy > target {
            -self.policy.step_db
        } else {
            0.0
        }
    }

    /// Applies a decibel step to a linear magnitude and rounds the result.
    pub fn apply_step(&self, magnitude: f64, step_db: f64) -> f64 {
        round_to(from_db(to_db(magnitude) + step_db), self.policy.round_decimals)
    }

    /// Feeds a baseline outcome to its generic staircase. Main keys keep no
    /// state beyond the tracker.
    pub fn observe(&mut self, key: &StaircaseKey, correct: bool) -> Result<()> {
        match key.phase {
            StaircasePhase::Baseline => {
                let stair = self
                    .baseline
                    .get_mut(key)
                    .ok_or(ExperimentError::InvalidKey(*key))?;
                stair.add_response(correct);
                Ok(())
            }
            StaircasePhase::Main if self.main_start.contains_key(key) => Ok(()),
            StaircasePhase::Main => Err(ExperimentError::InvalidKey(*key)),
        }
    }
}

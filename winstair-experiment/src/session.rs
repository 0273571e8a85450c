use crate::config::ExperimentConfig;
use crate::controller::{AdaptiveController, StepParams};
use crate::error::{ExperimentError, Result};
use crate::pool::StimulusPool;
use crate::recency::RecencyWindow;
use crate::selector::{DuplicateAvoidanceSelector, Selection};
use crate::sequencer::{Block, BlockSequencer, DifficultyInterleaver};
use crate::tracker::IntensityTracker;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use winstair_core::{Condition, Difficulty, StaircaseKey, StaircasePhase, TrialRecord};
use winstair_timing::WaitStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySummary {
    pub key: StaircaseKey,
    pub trials: usize,
    pub accuracy: Option<f64>,
    pub final_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub trials_recorded: usize,
    pub degraded_selections: usize,
    pub per_key: Vec<KeySummary>,
    pub wait_stats: WaitStats,
}

/// Owns every piece of mutable experiment state for one participant run.
#[derive(Debug, Clone)]
pub struct ExperimentSession {
    config: ExperimentConfig,
    tracker: IntensityTracker,
    pool: StimulusPool,
    recency: RecencyWindow,
    controller: AdaptiveController,
    selector: DuplicateAvoidanceSelector,
    baseline_blocks: Vec<Block>,
    main_blocks: Vec<Block>,
    interleavers: HashMap<(StaircasePhase, Condition), DifficultyInterleaver>,
    degraded_selections: usize,
    main_started: bool,
}

impl ExperimentSession {
    /// Validates config and pool, then fixes both phases' block orders.
    pub fn new<R: Rng + ?Sized>(config: ExperimentConfig, pool: StimulusPool, rng: &mut R) -> Result<Self> {
        config.validate()?;
        pool.validate(&config)?;
        pool.warn_shortfalls(&config);

        let controller = AdaptiveController::new(&config)?;
        let baseline_blocks = BlockSequencer::sequence(&config.conditions, &config.baseline, rng);
        let main_blocks = BlockSequencer::sequence(&config.conditions, &config.main, rng);

        let mut interleavers = HashMap::new();
        for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
            let mode = config.phase(phase).interleave;
            for &c in &config.conditions {
                interleavers.insert((phase, c), DifficultyInterleaver::new(mode));
            }
        }

        let keys = [StaircasePhase::Baseline, StaircasePhase::Main]
            .into_iter()
            .flat_map(|p| StaircaseKey::all_for(p, &config.conditions));

        Ok(Self {
            tracker: IntensityTracker::with_keys(keys),
            recency: RecencyWindow::new(config.selection.recency_window),
            selector: DuplicateAvoidanceSelector::new(config.selection.max_retries),
            config,
            pool,
            controller,
            baseline_blocks,
            main_blocks,
            interleavers,
            degraded_selections: 0,
            main_started: false,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn tracker(&self) -> &IntensityTracker {
        &self.tracker
    }

    pub fn pool(&self) -> &StimulusPool {
        &self.pool
    }

    pub fn recency(&self) -> &RecencyWindow {
        &self.recency
    }

    pub fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    pub fn blocks(&self, phase: StaircasePhase) -> &[Block] {
        match phase {
            StaircasePhase::Baseline => &self.baseline_blocks,
            StaircasePhase::Main => &self.main_blocks,
        }
    }

    pub fn degraded_selections(&self) -> usize {
        self.degraded_selections
    }

    /// Staircase key of the next trial slot in a block of `condition`.
    pub fn next_key<R: Rng + ?Sized>(
        &mut self,
        phase: StaircasePhase,
        condition: Condition,
        rng: &mut R,
    ) -> Result<StaircaseKey> {
        let interleaver = self
            .interleavers
            .get_mut(&(phase, condition))
            .ok_or(ExperimentError::InvalidKey(StaircaseKey::new(phase, condition, Difficulty::Easy)))?;
        Ok(StaircaseKey::new(phase, condition, interleaver.next(rng)))
    }

    pub fn decide(&self, key: &StaircaseKey) -> Result<(f64, StepParams)> {
        self.controller.next_intensity(key, &self.tracker)
    }

    pub fn select<R: Rng + ?Sized>(&mut self, key: &StaircaseKey, rng: &mut R) -> Result<Selection> {
        let selection = self.selector.select(&mut self.pool, key, &mut self.recency, rng)?;
        if selection.degraded {
            self.degraded_selections += 1;
        }
        Ok(selection)
    }

    /// Appends a completed trial and advances the key's staircase.
    pub fn record(&mut self, key: StaircaseKey, intensity: f64, correct: bool) -> Result<TrialRecord> {
        self.controller.observe(&key, correct)?;
        self.tracker.record(key, intensity, correct);
        Ok(TrialRecord {
            key,
            index: self.tracker.trial_count(&key) - 1,
            intensity,
            correct,
        })
    }

    /// Fixes main start values from the baseline's final intensities. Only
    /// the first call has an effect.
    pub fn begin_main(&mut self) {
        if self.main_started {
            warn!("main phase already started, keeping the first baseline snapshot");
            return;
        }
        let starts = self.controller.snapshot_baseline(&self.tracker);
        info!(keys = starts.len(), "baseline snapshot taken");
        self.main_started = true;
    }

    pub fn summary(&self, outcome: SessionOutcome, wait_stats: WaitStats) -> SessionSummary {
        let per_key = [StaircasePhase::Baseline, StaircasePhase::Main]
            .into_iter()
            .flat_map(|p| StaircaseKey::all_for(p, &self.config.conditions))
            .map(|key| KeySummary {
                key,
                trials: self.tracker.trial_count(&key),
                accuracy: self.tracker.recent_accuracy(&key, usize::MAX),
                final_intensity: self.tracker.last_intensity(&key).ok(),
            })
            .collect();
        SessionSummary {
            outcome,
            trials_recorded: self.tracker.total_trials(),
            degraded_selections: self.degraded_selections,
            per_key,
            wait_stats,
        }
    }
}

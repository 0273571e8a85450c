use crate::error::{ExperimentError, Result};
use std::collections::HashMap;
use winstair_core::{StaircaseKey, TrialRecord};

#[derive(Debug, Clone, Default)]
struct KeyHistory {
    intensities: Vec<f64>,
    correct: Vec<bool>,
}

/// Per-key history of presented intensities and correctness, oldest first.
/// Both sequences of a key always have the same length.
#[derive(Debug, Clone, Default)]
pub struct IntensityTracker {
    histories: HashMap<StaircaseKey, KeyHistory>,
}

impl IntensityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocates empty histories for `keys`.
    pub fn with_keys(keys: impl IntoIterator<Item = StaircaseKey>) -> Self {
        Self {
            histories: keys.into_iter().map(|k| (k, KeyHistory::default())).collect(),
        }
    }

    pub fn record(&mut self, key: StaircaseKey, intensity: f64, correct: bool) {
        let history = self.histories.entry(key).or_default();
        history.intensities.push(intensity);
        history.correct.push(correct);
    }

    /// Intensities and correctness for `key`; empty when nothing was recorded.
    pub fn history(&self, key: &StaircaseKey) -> (&[f64], &[bool]) {
        match self.histories.get(key) {
            Some(h) => (&h.intensities, &h.correct),
            None => (&[], &[]),
        }
    }

    pub fn trial_count(&self, key: &StaircaseKey) -> usize {
        self.histories.get(key).map_or(0, |h| h.intensities.len())
    }

    pub fn last_intensity(&self, key: &StaircaseKey) -> Result<f64> {
        self.histories
            .get(key)
            .and_then(|h| h.intensities.last().copied())
            .ok_or(ExperimentError::EmptyHistory(*key))
    }

    /// Mean correctness over the most recent `window` trials, or `None` when
    /// the key has no trials.
    pub fn recent_accuracy(&self, key: &StaircaseKey, window: usize) -> Option<f64> {
        let (_, correct) = self.history(key);
        let recent = &correct[correct.len().saturating_sub(window)..];
        if recent.is_empty() {
            return None;
        }
        let hits = recent.iter().filter(|&&c| c).count();
        Some(hits as f64 / recent.len() as f64)
    }

    pub fn records(&self, key: &StaircaseKey) -> impl Iterator<Item = TrialRecord> + '_ {
        let key = *key;
        let (intensities, correct) = self.history(&key);
        intensities
            .iter()
            .zip(correct)
            .enumerate()
            .map(move |(index, (&intensity, &correct))| TrialRecord {
                key,
                index,
                intensity,
                correct,
            })
    }

    pub fn total_trials(&self) -> usize {
        self.histories.values().map(|h| h.intensities.len()).sum()
    }
}

use winstair_core::{StaircaseKey, StaircasePhase, StimulusItem};
use winstair_experiment::{ExperimentConfig, StimulusPool};

const CHOICES: usize = 4;

/// Placeholder word list sized to `config`: every partition gets enough
/// items for its trials plus one recency window of slack. Words are unique
/// across the whole pool.
pub fn synthetic_pool(config: &ExperimentConfig) -> StimulusPool {
    let mut pool = StimulusPool::new();
    for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
        let p = config.phase(phase);
        let per_key = (p.trials_per_block * p.blocks_per_condition).div_ceil(2) + config.selection.recency_window;
        for key in StaircaseKey::all_for(phase, &config.conditions) {
            for i in 0..per_key {
                pool.insert(key, item(&key, i));
            }
        }
    }
    pool
}

fn item(key: &StaircaseKey, i: usize) -> StimulusItem {
    let stem = format!("{}_{}_{}_{}", key.phase, key.condition, key.difficulty, i);
    let distractors: Vec<String> = (1..CHOICES).map(|d| format!("{stem}_{d}")).collect();
    StimulusItem::new(stem.as_str(), distractors.iter().map(String::as_str))
}

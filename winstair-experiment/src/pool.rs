//! Stimulus items partitioned by (phase, condition, difficulty).
//!
//! Items keep their insertion order; the baseline phase consumes them front
//! to back. Consumption removes an item, so nothing is reissued within a
//! partition.

use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;
use winstair_core::{Condition, Difficulty, PartitionKey, StaircaseKey, StaircasePhase, StimulusItem};

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 4;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolFile {
    #[serde(default)]
    partition: Vec<PartitionTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartitionTable {
    phase: StaircasePhase,
    condition: Condition,
    difficulty: Difficulty,
    items: Vec<Vec<String>>,
}

impl PartitionTable {
    fn key(&self) -> PartitionKey {
        StaircaseKey::new(self.phase, self.condition, self.difficulty)
    }
}

/// Partition that holds fewer items than its phase can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub partition: PartitionKey,
    pub available: usize,
    pub required: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StimulusPool {
    partitions: HashMap<PartitionKey, Vec<StimulusItem>>,
}

impl StimulusPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ExperimentError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let file: PoolFile = toml::from_str(text).map_err(|source| ExperimentError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })?;
        let mut pool = Self::new();
        for table in file.partition {
            let key = table.key();
            for (i, choices) in table.items.iter().enumerate() {
                let item = StimulusItem::from_choices(choices).ok_or_else(|| ExperimentError::MalformedPool {
                    partition: key,
                    reason: format!("item {i} has no words"),
                })?;
                pool.insert(key, item);
            }
        }
        Ok(pool)
    }

    /// Appends an item to the back of its partition.
    pub fn insert(&mut self, key: PartitionKey, item: StimulusItem) {
        self.partitions.entry(key).or_default().push(item);
    }

    pub fn remaining(&self, key: &PartitionKey) -> usize {
        self.partitions.get(key).map_or(0, Vec::len)
    }

    pub fn items(&self, key: &PartitionKey) -> &[StimulusItem] {
        self.partitions.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn get(&self, key: &PartitionKey, index: usize) -> Option<&StimulusItem> {
        self.partitions.get(key).and_then(|items| items.get(index))
    }

    pub fn take_first(&mut self, key: &PartitionKey) -> Result<StimulusItem> {
        self.take_at(key, 0)
    }

    /// Removes the item at `index`, keeping the order of the rest.
    pub fn take_at(&mut self, key: &PartitionKey, index: usize) -> Result<StimulusItem> {
        match self.partitions.get_mut(key) {
            Some(items) if index < items.len() => Ok(items.remove(index)),
            _ => Err(ExperimentError::PoolExhausted(*key)),
        }
    }

    /// Rejects pools that cannot run `config` at all: a missing or empty
    /// partition, a choice set outside 2..=4 words, or a word repeated inside
    /// one choice set. A choice set listed twice only warns.
    pub fn validate(&self, config: &ExperimentConfig) -> Result<()> {
        for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
            for key in StaircaseKey::all_for(phase, &config.conditions) {
                let items = self.items(&key);
                if items.is_empty() {
                    return Err(ExperimentError::MalformedPool {
                        partition: key,
                        reason: "partition is missing or empty".into(),
                    });
                }
                let mut sets = HashSet::new();
                for (i, item) in items.iter().enumerate() {
                    let n = item.choice_count();
                    if !(MIN_CHOICES..=MAX_CHOICES).contains(&n) {
                        return Err(ExperimentError::MalformedPool {
                            partition: key,
                            reason: format!(
                                "item {i} ({}) has {n} choices, expected {MIN_CHOICES}..={MAX_CHOICES}",
                                item.target
                            ),
                        });
                    }
                    let words: HashSet<_> = item.choice_set().into_iter().collect();
                    if words.len() != n {
                        return Err(ExperimentError::MalformedPool {
                            partition: key,
                            reason: format!("item {i} ({}) repeats a word", item.target),
                        });
                    }
                    if !sets.insert(item.set_key()) {
                        warn!(partition = %key, item = i, set = %item.set_key(), "choice set appears twice");
                    }
                }
            }
        }
        Ok(())
    }

    /// Partitions with fewer items than the trials their key will run.
    /// Each condition's trials split between easy and hard, so a key needs
    /// at most half of them, rounded up.
    pub fn shortfalls(&self, config: &ExperimentConfig) -> Vec<Shortfall> {
        let mut out = Vec::new();
        for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
            let p = config.phase(phase);
            let required = (p.trials_per_block * p.blocks_per_condition).div_ceil(2);
            for key in StaircaseKey::all_for(phase, &config.conditions) {
                let available = self.remaining(&key);
                if available < required {
                    out.push(Shortfall {
                        partition: key,
                        available,
                        required,
                    });
                }
            }
        }
        out
    }

    /// Logs every shortfall. Exhaustion itself is raised when a selection
    /// finds the partition empty.
    pub fn warn_shortfalls(&self, config: &ExperimentConfig) -> usize {
        let shortfalls = self.shortfalls(config);
        for s in &shortfalls {
            warn!(
                partition = %s.partition,
                available = s.available,
                required = s.required,
                "stimulus partition is under-provisioned"
            );
        }
        shortfalls.len()
    }
}

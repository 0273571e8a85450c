use crate::error::{ExperimentError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use winstair_core::{Condition, Difficulty, StaircasePhase};

/// Every recognized experiment option. Unknown keys are rejected at load
/// time and `validate` runs before any trial.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// ChaCha8 seed. Absent means a fresh seed is drawn and logged.
    pub seed: Option<u64>,
    pub conditions: Vec<Condition>,
    pub baseline: PhaseConfig,
    pub main: PhaseConfig,
    pub policy: ControllerPolicy,
    pub selection: SelectionConfig,
    pub baseline_rule: BaselineRules,
    pub start_values: Vec<StartValues>,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseConfig {
    pub trials_per_block: usize,
    pub blocks_per_condition: usize,
    /// 1-based cumulative block numbers followed by a rest pause.
    pub rest_after_blocks: Vec<usize>,
    pub interleave: Interleave,
}

/// How easy and hard trials alternate inside a condition's blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interleave {
    #[default]
    Sequential,
    Random,
}

/// Beyond this `f64` keeps no further digits.
pub const MAX_ROUND_DECIMALS: u32 = 15;

/// Manual main-staircase rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerPolicy {
    pub hold_trials: usize,
    pub evaluate_every: usize,
    pub accuracy_window: usize,
    pub easy_target: f64,
    pub hard_target: f64,
    pub step_db: f64,
    pub round_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    pub recency_window: usize,
    pub max_retries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    #[default]
    Db,
    Lin,
    Log,
}

/// Generic n-up/m-down rule driving the baseline staircase.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpDownRule {
    pub n_up: usize,
    pub n_down: usize,
    pub step_sizes: Vec<f64>,
    pub step_type: StepType,
    pub min_val: f64,
    pub max_val: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineRules {
    pub easy: UpDownRule,
    pub hard: UpDownRule,
}

impl BaselineRules {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> &UpDownRule {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Hard => &self.hard,
        }
    }
}

/// Baseline starting intensities for one condition.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartValues {
    pub condition: Condition,
    pub easy: f64,
    pub hard: f64,
}

/// Trial period lengths, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub intertrial_interval: f64,
    pub difficulty_cue: f64,
    pub prestimulus: f64,
    pub presentation_window: f64,
    pub offset_buffer: f64,
    pub fade_buffer: f64,
    pub post_stimulus_wait: f64,
    pub answer_timeout: f64,
    pub block_title: f64,
    pub rest_duration: f64,
    pub screen_hz: f64,
}

impl TimingConfig {
    fn durations(&self) -> [(&'static str, f64); 10] {
        [
            ("timing.intertrial_interval", self.intertrial_interval),
            ("timing.difficulty_cue", self.difficulty_cue),
            ("timing.prestimulus", self.prestimulus),
            ("timing.presentation_window", self.presentation_window),
            ("timing.offset_buffer", self.offset_buffer),
            ("timing.fade_buffer", self.fade_buffer),
            ("timing.post_stimulus_wait", self.post_stimulus_wait),
            ("timing.answer_timeout", self.answer_timeout),
            ("timing.block_title", self.block_title),
            ("timing.rest_duration", self.rest_duration),
        ]
    }

    pub fn frame(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.screen_hz)
    }
}

pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s.max(0.0))
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: None,
            conditions: vec![Condition::Auditory, Condition::Visual, Condition::Audiovisual],
            baseline: PhaseConfig {
                trials_per_block: 20,
                blocks_per_condition: 1,
                rest_after_blocks: Vec::new(),
                interleave: Interleave::Sequential,
            },
            main: PhaseConfig::default(),
            policy: ControllerPolicy::default(),
            selection: SelectionConfig::default(),
            baseline_rule: BaselineRules::default(),
            start_values: vec![
                StartValues {
                    condition: Condition::Auditory,
                    easy: 0.5,
                    hard: 0.25,
                },
                StartValues {
                    condition: Condition::Visual,
                    easy: 0.5,
                    hard: 0.25,
                },
                StartValues {
                    condition: Condition::Audiovisual,
                    easy: 0.5,
                    hard: 0.25,
                },
            ],
            timing: TimingConfig::default(),
        }
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            trials_per_block: 20,
            blocks_per_condition: 4,
            rest_after_blocks: vec![3, 6, 9],
            interleave: Interleave::Sequential,
        }
    }
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        Self {
            hold_trials: 8,
            evaluate_every: 3,
            accuracy_window: 8,
            easy_target: 0.875,
            hard_target: 0.625,
            step_db: 0.5,
            round_decimals: 4,
        }
    }
}

impl ControllerPolicy {
    pub fn target(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy_target,
            Difficulty::Hard => self.hard_target,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            recency_window: 20,
            max_retries: 25,
        }
    }
}

impl Default for UpDownRule {
    fn default() -> Self {
        Self {
            n_up: 1,
            n_down: 2,
            step_sizes: vec![4.0, 2.0, 1.0],
            step_type: StepType::Db,
            min_val: 0.001,
            max_val: 1.0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            intertrial_interval: 1.0,
            difficulty_cue: 1.0,
            prestimulus: 1.0,
            presentation_window: 2.05,
            offset_buffer: 0.05,
            fade_buffer: 0.0,
            post_stimulus_wait: 1.0,
            answer_timeout: 3.0,
            block_title: 1.0,
            rest_duration: 20.0,
            screen_hz: 60.0,
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ExperimentError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ExperimentError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn phase(&self, phase: StaircasePhase) -> &PhaseConfig {
        match phase {
            StaircasePhase::Baseline => &self.baseline,
            StaircasePhase::Main => &self.main,
        }
    }

    pub fn start_value(&self, condition: Condition, difficulty: Difficulty) -> Option<f64> {
        self.start_values
            .iter()
            .find(|s| s.condition == condition)
            .map(|s| match difficulty {
                Difficulty::Easy => s.easy,
                Difficulty::Hard => s.hard,
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.conditions.is_empty() {
            return Err(ExperimentError::invalid_config("conditions", "must not be empty"));
        }
        let mut seen = HashSet::new();
        for c in &self.conditions {
            if !seen.insert(*c) {
                return Err(ExperimentError::invalid_config(
                    "conditions",
                    format!("{c} listed twice"),
                ));
            }
        }

        for (name, phase) in [("baseline", &self.baseline), ("main", &self.main)] {
            if phase.trials_per_block == 0 {
                return Err(ExperimentError::invalid_config(
                    format!("{name}.trials_per_block"),
                    "must be at least 1",
                ));
            }
            if phase.blocks_per_condition == 0 {
                return Err(ExperimentError::invalid_config(
                    format!("{name}.blocks_per_condition"),
                    "must be at least 1",
                ));
            }
            let total = phase.blocks_per_condition * self.conditions.len();
            if let Some(bad) = phase.rest_after_blocks.iter().find(|&&b| b == 0 || b > total) {
                return Err(ExperimentError::invalid_config(
                    format!("{name}.rest_after_blocks"),
                    format!("block {bad} is outside 1..={total}"),
                ));
            }
        }

        let p = &self.policy;
        for (field, target) in [("policy.easy_target", p.easy_target), ("policy.hard_target", p.hard_target)] {
            if !(target > 0.0 && target <= 1.0) {
                return Err(ExperimentError::invalid_config(field, "must be in (0, 1]"));
            }
        }
        if !(p.step_db > 0.0) {
            return Err(ExperimentError::invalid_config("policy.step_db", "must be positive"));
        }
        if p.round_decimals > MAX_ROUND_DECIMALS {
            return Err(ExperimentError::invalid_config(
                "policy.round_decimals",
                format!("must be at most {MAX_ROUND_DECIMALS}"),
            ));
        }
        for (field, v) in [
            ("policy.hold_trials", p.hold_trials),
            ("policy.evaluate_every", p.evaluate_every),
            ("policy.accuracy_window", p.accuracy_window),
            ("selection.recency_window", self.selection.recency_window),
            ("selection.max_retries", self.selection.max_retries),
        ] {
            if v == 0 {
                return Err(ExperimentError::invalid_config(field, "must be at least 1"));
            }
        }

        for d in Difficulty::ALL {
            let rule = self.baseline_rule.for_difficulty(d);
            let field = format!("baseline_rule.{d}");
            if rule.n_up == 0 || rule.n_down == 0 {
                return Err(ExperimentError::invalid_config(field, "n_up and n_down must be at least 1"));
            }
            if rule.step_sizes.is_empty() || rule.step_sizes.iter().any(|s| !(*s > 0.0)) {
                return Err(ExperimentError::invalid_config(field, "step_sizes must be non-empty and positive"));
            }
            if !(rule.min_val < rule.max_val) {
                return Err(ExperimentError::invalid_config(field, "min_val must be below max_val"));
            }
            if rule.step_type != StepType::Lin && !(rule.min_val > 0.0) {
                return Err(ExperimentError::invalid_config(field, "logarithmic steps need min_val > 0"));
            }
        }

        for &c in &self.conditions {
            for d in Difficulty::ALL {
                match self.start_value(c, d) {
                    Some(v) if v > 0.0 => {}
                    Some(_) => {
                        return Err(ExperimentError::invalid_config(
                            "start_values",
                            format!("{c} {d} start value must be positive"),
                        ));
                    }
                    None => {
                        return Err(ExperimentError::invalid_config(
                            "start_values",
                            format!("missing start values for {c}"),
                        ));
                    }
                }
            }
        }

        for (field, v) in self.timing.durations() {
            if !(v >= 0.0) {
                return Err(ExperimentError::invalid_config(field, "must be a non-negative number of seconds"));
            }
        }
        if !(self.timing.screen_hz > 0.0) {
            return Err(ExperimentError::invalid_config("timing.screen_hz", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.hold_trials, 8);
        assert_eq!(config.policy.evaluate_every, 3);
        assert_eq!(config.policy.accuracy_window, 8);
        assert_eq!(config.policy.target(Difficulty::Easy), 0.875);
        assert_eq!(config.policy.target(Difficulty::Hard), 0.625);
        assert_eq!(config.policy.step_db, 0.5);
        assert_eq!(config.selection.recency_window, 20);
        assert_eq!(config.selection.max_retries, 25);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let text = r#"
            seed = 7
            conditions = ["Auditory", "Environmental"]

            [main]
            trials_per_block = 10
            blocks_per_condition = 2
            rest_after_blocks = [2]
            interleave = "random"

            [[start_values]]
            condition = "Auditory"
            easy = 0.6
            hard = 0.3

            [[start_values]]
            condition = "Environmental"
            easy = 0.7
            hard = 0.35
        "#;
        let config = ExperimentConfig::from_toml_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.main.interleave, Interleave::Random);
        assert_eq!(config.policy.step_db, 0.5);
        assert_eq!(config.start_value(Condition::Environmental, Difficulty::Hard), Some(0.35));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ExperimentConfig::from_toml_str("sed = 3").unwrap_err();
        assert!(err.to_string().contains("sed"));
    }

    #[test]
    fn rest_block_beyond_phase_is_invalid() {
        let mut config = ExperimentConfig::default();
        config.main.rest_after_blocks = vec![13];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidConfig { ref field, .. } if field == "main.rest_after_blocks"));
    }

    #[test]
    fn missing_start_values_are_invalid() {
        let mut config = ExperimentConfig::default();
        config.conditions.push(Condition::Environmental);
        assert!(matches!(
            config.validate(),
            Err(ExperimentError::InvalidConfig { ref field, .. }) if field == "start_values"
        ));
    }

    #[test]
    fn rounding_past_f64_precision_is_invalid() {
        let mut config = ExperimentConfig::default();
        config.policy.round_decimals = MAX_ROUND_DECIMALS;
        assert!(config.validate().is_ok());
        config.policy.round_decimals = 309;
        assert!(matches!(
            config.validate(),
            Err(ExperimentError::InvalidConfig { ref field, .. }) if field == "policy.round_decimals"
        ));
    }

    #[test]
    fn zero_retry_cap_is_invalid() {
        let mut config = ExperimentConfig::default();
        config.selection.max_retries = 0;
        assert!(config.validate().is_err());
    }
}

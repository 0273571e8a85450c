//! Generic n-up/m-down staircase used for the baseline phase.

use crate::config::{StepType, UpDownRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct UpDownStaircase {
    rule: UpDownRule,
    intensity: f64,
    /// Positive: run of correct answers. Negative: run of incorrect answers.
    correct_counter: i64,
    direction: Option<Direction>,
    reversal_intensities: Vec<f64>,
}

impl UpDownStaircase {
    pub fn new(start: f64, rule: UpDownRule) -> Self {
        let intensity = start.clamp(rule.min_val, rule.max_val);
        Self {
            rule,
            intensity,
            correct_counter: 0,
            direction: None,
            reversal_intensities: Vec::new(),
        }
    }

    /// Intensity for the next trial.
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn reversals(&self) -> &[f64] {
        &self.reversal_intensities
    }

    fn current_step(&self) -> f64 {
        let last = self.rule.step_sizes.len().saturating_sub(1);
        let idx = self.reversal_intensities.len().min(last);
        self.rule.step_sizes.get(idx).copied().unwrap_or(0.0)
    }

    pub fn add_response(&mut self, correct: bool) {
        if correct {
            self.correct_counter = self.correct_counter.max(0) + 1;
            if self.correct_counter >= self.rule.n_down as i64 {
                self.correct_counter = 0;
                self.step(Direction::Down);
            }
        } else {
            self.correct_counter = self.correct_counter.min(0) - 1;
            if self.correct_counter <= -(self.rule.n_up as i64) {
                self.correct_counter = 0;
                self.step(Direction::Up);
            }
        }
    }

    fn step(&mut self, direction: Direction) {
        if self.direction.is_some_and(|d| d != direction) {
            self.reversal_intensities.push(self.intensity);
        }
        self.direction = Some(direction);

        let size = match direction {
            Direction::Up => self.current_step(),
            Direction::Down => -self.current_step(),
        };
        let next = match self.rule.step_type {
            StepType::Db => from_db(to_db(self.intensity) + size),
            StepType::Lin => self.intensity + size,
            StepType::Log => 10f64.powf(self.intensity.log10() + size),
        };
        self.intensity = next.clamp(self.rule.min_val, self.rule.max_val);
    }
}

/// Linear magnitude to decibels.
pub fn to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

/// Decibels to linear magnitude.
pub fn from_db(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

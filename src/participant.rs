use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::debug;
use winstair_core::{AnswerPosition, Difficulty, Response};
use winstair_experiment::staircase::to_db;
use winstair_experiment::{AnswerLayout, Block, GateSignal, Presenter, ResponseSensor, TrialPlan};

/// Stands in for both the display and the participant: answers follow a
/// logistic psychometric function of the presented intensity in dB.
pub struct SimulatedParticipant {
    rng: ChaCha8Rng,
    /// Intensity at which performance is halfway between chance and ceiling.
    pub easy_threshold_db: f64,
    pub hard_threshold_db: f64,
    pub slope_db: f64,
    pub lapse_rate: f64,
    pub timeout_rate: f64,
    current: Option<(f64, Difficulty)>,
}

impl SimulatedParticipant {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            easy_threshold_db: -14.0,
            hard_threshold_db: -8.0,
            slope_db: 2.5,
            lapse_rate: 0.03,
            timeout_rate: 0.02,
            current: None,
        }
    }

    fn p_correct(&self, intensity: f64, difficulty: Difficulty, choices: usize) -> f64 {
        let threshold = match difficulty {
            Difficulty::Easy => self.easy_threshold_db,
            Difficulty::Hard => self.hard_threshold_db,
        };
        let guess = 1.0 / choices.max(1) as f64;
        let x = (to_db(intensity.max(1e-6)) - threshold) / self.slope_db;
        guess + (1.0 - guess - self.lapse_rate) / (1.0 + (-x).exp())
    }
}

impl Presenter for SimulatedParticipant {
    fn show_block_title(&mut self, block: &Block) {
        debug!(block = block.number, condition = %block.condition, "block title");
    }

    fn show_difficulty_cue(&mut self, difficulty: Difficulty) {
        debug!(cue = difficulty.cue_text(), "difficulty cue");
    }

    fn show_answer_choices(&mut self, layout: &AnswerLayout) {
        debug!(choices = ?layout.labels(), "answer choices");
    }

    fn prepare(&mut self, plan: &TrialPlan) -> Duration {
        self.current = Some((plan.intensity, plan.difficulty()));
        // movie clips run longer than the word audio
        let base_ms = if plan.condition().shows_movie() { 900 } else { 600 };
        Duration::from_millis(base_ms + self.rng.random_range(0..300))
    }

    fn present(&mut self, plan: &TrialPlan) {
        debug!(
            trial = plan.trial_number,
            target = %plan.item.target,
            intensity = plan.intensity,
            onset_ms = plan.onset.as_secs_f64() * 1e3,
            "stimulus presented"
        );
    }
}

impl ResponseSensor for SimulatedParticipant {
    fn await_response(&mut self, timeout: Duration, layout: &AnswerLayout) -> Response {
        if self.rng.random_bool(self.timeout_rate) {
            return Response::TimedOut;
        }
        let Some((intensity, difficulty)) = self.current.take() else {
            return Response::TimedOut;
        };
        let positions: Vec<AnswerPosition> = layout.positions().collect();
        let p = self.p_correct(intensity, difficulty, positions.len()).clamp(0.0, 1.0);
        let target = layout.target_position();
        let position = match target {
            Some(t) if self.rng.random_bool(p) => t,
            _ => {
                let wrong: Vec<AnswerPosition> = positions.iter().copied().filter(|q| Some(*q) != target).collect();
                if wrong.is_empty() {
                    return Response::TimedOut;
                }
                wrong[self.rng.random_range(0..wrong.len())]
            }
        };
        let reaction_time = Duration::from_secs_f64(self.rng.random_range(0.35..1.6));
        if reaction_time > timeout {
            return Response::TimedOut;
        }
        Response::Answered {
            position,
            reaction_time,
        }
    }

    fn await_continue(&mut self) -> GateSignal {
        GateSignal::Continue
    }
}

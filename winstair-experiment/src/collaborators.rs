//! Effectors and sensors the engine drives but does not implement: screen
//! and audio output, participant input, and trial persistence.

use crate::layout::AnswerLayout;
use crate::sequencer::Block;
use crate::trial::TrialPlan;
use std::time::Duration;
use winstair_core::{Difficulty, Response, TrialRow};

/// Participant's answer at a gate screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    Continue,
    Abort,
}

pub trait Presenter {
    fn show_instructions(&mut self) {}
    fn show_block_title(&mut self, _block: &Block) {}
    fn show_difficulty_cue(&mut self, _difficulty: Difficulty) {}

    /// Loads the stimulus for `plan` at its intensity and returns how long
    /// it plays. Runs inside the intertrial interval.
    fn prepare(&mut self, plan: &TrialPlan) -> Duration;

    /// Plays the prepared stimulus starting `plan.onset` into the
    /// presentation window.
    fn present(&mut self, plan: &TrialPlan);

    fn show_answer_choices(&mut self, _layout: &AnswerLayout) {}
    fn show_rest(&mut self, _duration: Duration) {}
    fn show_break_gate(&mut self) {}
}

pub trait ResponseSensor {
    /// Blocks until an answer position is chosen or `timeout` elapses.
    fn await_response(&mut self, timeout: Duration, layout: &AnswerLayout) -> Response;

    /// Polled at trial boundaries only.
    fn abort_requested(&mut self) -> bool {
        false
    }

    fn await_continue(&mut self) -> GateSignal {
        GateSignal::Continue
    }
}

pub trait TrialSink {
    type Error: std::fmt::Display;

    /// Called exactly once per completed trial.
    fn record_trial_row(&mut self, row: &TrialRow) -> Result<(), Self::Error>;
}

impl TrialSink for Vec<TrialRow> {
    type Error = std::convert::Infallible;

    fn record_trial_row(&mut self, row: &TrialRow) -> Result<(), Self::Error> {
        self.push(row.clone());
        Ok(())
    }
}

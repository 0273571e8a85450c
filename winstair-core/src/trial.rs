use crate::{Condition, Difficulty, StaircaseKey, StaircasePhase};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Periods of a single trial, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrialState {
    IntertrialInterval,
    DifficultyCue,
    Prestimulus,
    Presentation,
    PostStimulusWait,
    AnswerChoice,
    Complete,
}

impl TrialState {
    pub fn next(&self) -> Option<Self> {
        use TrialState::*;
        Some(match self {
            IntertrialInterval => DifficultyCue,
            DifficultyCue => Prestimulus,
            Prestimulus => Presentation,
            Presentation => PostStimulusWait,
            PostStimulusWait => AnswerChoice,
            AnswerChoice => Complete,
            Complete => return None,
        })
    }
}

/// Screen positions the answer choices are drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerPosition {
    Left,
    Right,
    Up,
    Down,
}

impl AnswerPosition {
    pub const ALL: [AnswerPosition; 4] = [
        AnswerPosition::Left,
        AnswerPosition::Right,
        AnswerPosition::Up,
        AnswerPosition::Down,
    ];
}

/// What the response sensor observed during the answer window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    Answered {
        position: AnswerPosition,
        reaction_time: Duration,
    },
    TimedOut,
}

impl Response {
    pub fn position(&self) -> Option<AnswerPosition> {
        match self {
            Response::Answered { position, .. } => Some(*position),
            Response::TimedOut => None,
        }
    }

    pub fn reaction_time(&self) -> Option<Duration> {
        match self {
            Response::Answered { reaction_time, .. } => Some(*reaction_time),
            Response::TimedOut => None,
        }
    }
}

/// Append-only outcome of one completed trial for one staircase key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialRecord {
    pub key: StaircaseKey,
    pub index: usize,
    pub intensity: f64,
    pub correct: bool,
}

/// One persisted row per completed trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    pub trial_number: usize,
    pub phase: StaircasePhase,
    pub condition: Condition,
    pub difficulty: Difficulty,
    pub block_number: usize,
    pub block_trial: usize,
    pub key_trial: usize,
    pub intensity: f64,
    pub target: String,
    pub answer_position: Option<AnswerPosition>,
    pub answer_choice: Option<String>,
    pub correct: bool,
    pub reaction_time_ms: Option<f64>,
    pub onset_s: f64,
    pub offset_s: f64,
    pub degraded_selection: bool,
    pub intertrial_interval_precise: bool,
    pub difficulty_cue_precise: bool,
    pub prestimulus_precise: bool,
    pub presentation_window_precise: bool,
    pub post_stimulus_wait_precise: bool,
}

impl TrialRow {
    pub fn key(&self) -> StaircaseKey {
        StaircaseKey::new(self.phase, self.condition, self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_states_end_at_complete() {
        let mut state = TrialState::IntertrialInterval;
        let mut steps = 0;
        while let Some(next) = state.next() {
            state = next;
            steps += 1;
        }
        assert_eq!(state, TrialState::Complete);
        assert_eq!(steps, 6);
    }

    #[test]
    fn timed_out_response_has_no_position_or_rt() {
        assert_eq!(Response::TimedOut.position(), None);
        assert_eq!(Response::TimedOut.reaction_time(), None);
        let answered = Response::Answered {
            position: AnswerPosition::Up,
            reaction_time: Duration::from_millis(640),
        };
        assert_eq!(answered.position(), Some(AnswerPosition::Up));
    }
}

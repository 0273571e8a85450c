use crate::layout::AnswerLayout;
use std::time::Duration;
use winstair_core::{Condition, Difficulty, StaircaseKey, StimulusItem, TrialState};
use winstair_timing::WaitAccuracy;

/// Everything decided before a trial's stimulus is shown.
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub trial_number: usize,
    pub key: StaircaseKey,
    pub block_number: usize,
    pub block_trial: usize,
    pub key_trial: usize,
    pub intensity: f64,
    pub item: StimulusItem,
    pub layout: AnswerLayout,
    pub degraded_selection: bool,
    pub durations: TrialDurations,
    /// Offset of the stimulus from the start of the presentation window.
    pub onset: Duration,
    pub state: TrialState,
}

impl TrialPlan {
    pub fn condition(&self) -> Condition {
        self.key.condition
    }

    pub fn difficulty(&self) -> Difficulty {
        self.key.difficulty
    }

    pub fn offset(&self) -> Duration {
        self.onset + self.durations.stimulus
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialDurations {
    pub intertrial_interval: Duration,
    pub difficulty_cue: Duration,
    pub prestimulus: Duration,
    pub presentation_window: Duration,
    pub post_stimulus_wait: Duration,
    pub answer_timeout: Duration,
    /// Reported by the presenter once the stimulus is prepared.
    pub stimulus: Duration,
}

/// How closely each timed period of a trial was met.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialWaits {
    pub intertrial_interval: Option<WaitAccuracy>,
    pub difficulty_cue: Option<WaitAccuracy>,
    pub prestimulus: Option<WaitAccuracy>,
    pub presentation_window: Option<WaitAccuracy>,
    pub post_stimulus_wait: Option<WaitAccuracy>,
}

impl TrialWaits {
    pub fn set(&mut self, state: TrialState, accuracy: WaitAccuracy) {
        let slot = match state {
            TrialState::IntertrialInterval => &mut self.intertrial_interval,
            TrialState::DifficultyCue => &mut self.difficulty_cue,
            TrialState::Prestimulus => &mut self.prestimulus,
            TrialState::Presentation => &mut self.presentation_window,
            TrialState::PostStimulusWait => &mut self.post_stimulus_wait,
            TrialState::AnswerChoice | TrialState::Complete => return,
        };
        *slot = Some(accuracy);
    }

    /// Unset periods count as precise.
    pub fn precise(accuracy: Option<WaitAccuracy>) -> bool {
        accuracy.is_none_or(|a| a.precise)
    }
}

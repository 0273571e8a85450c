use crate::config::{TimingConfig, secs};
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Frame-aligned random onset of the stimulus inside the presentation
/// window.
#[derive(Debug, Clone, Copy)]
pub struct OnsetJitter {
    frame: Duration,
    window: Duration,
    offset_buffer: Duration,
    fade_buffer: Duration,
}

impl OnsetJitter {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            frame: timing.frame(),
            window: secs(timing.presentation_window),
            offset_buffer: secs(timing.offset_buffer),
            fade_buffer: secs(timing.fade_buffer),
        }
    }

    /// Onsets `k * frame` for `k >= 1` that still let a stimulus of length
    /// `stimulus` end before the offset buffer.
    pub fn candidates(&self, stimulus: Duration) -> Vec<Duration> {
        let limit = self
            .window
            .saturating_sub(self.offset_buffer)
            .saturating_sub(stimulus);
        if self.frame.is_zero() {
            return Vec::new();
        }
        (1u32..)
            .map(|k| self.frame * k)
            .take_while(|onset| *onset < limit)
            .collect()
    }

    /// Fade buffer plus a uniformly drawn candidate. Zero jitter when the
    /// stimulus does not fit.
    pub fn draw<R: Rng + ?Sized>(&self, stimulus: Duration, rng: &mut R) -> Duration {
        let candidates = self.candidates(stimulus);
        if candidates.is_empty() {
            warn!(
                stimulus_ms = stimulus.as_secs_f64() * 1e3,
                window_ms = self.window.as_secs_f64() * 1e3,
                "stimulus does not fit the presentation window, presenting without jitter"
            );
            return self.fade_buffer;
        }
        self.fade_buffer + candidates[rng.random_range(0..candidates.len())]
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which staircase a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaircasePhase {
    /// Calibration staircase establishing per-condition starting intensities.
    Baseline,
    /// Staircase seeded from baseline, adjusted by the manual rule.
    Main,
}

impl StaircasePhase {
    pub fn label(&self) -> &'static str {
        match self {
            StaircasePhase::Baseline => "baseline",
            StaircasePhase::Main => "main",
        }
    }
}

impl fmt::Display for StaircasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Protocol states of a trial session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    Instructions,
    BaselinePhase,
    BreakGate,
    MainPhase,
    Terminated,
}

impl SessionState {
    /// Natural successor; `Terminated` has none. Abort bypasses this and
    /// jumps straight to `Terminated`.
    pub fn next(&self) -> Option<Self> {
        use SessionState::*;
        Some(match self {
            Idle => Instructions,
            Instructions => BaselinePhase,
            BaselinePhase => BreakGate,
            BreakGate => MainPhase,
            MainPhase => Terminated,
            Terminated => return None,
        })
    }

    pub fn staircase_phase(&self) -> Option<StaircasePhase> {
        match self {
            SessionState::BaselinePhase => Some(StaircasePhase::Baseline),
            SessionState::MainPhase => Some(StaircasePhase::Main),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

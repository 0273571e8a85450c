pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod jitter;
pub mod layout;
pub mod pool;
pub mod recency;
pub mod selector;
pub mod sequencer;
pub mod session;
pub mod staircase;
pub mod state;
pub mod tracker;
pub mod trial;

pub use collaborators::{GateSignal, Presenter, ResponseSensor, TrialSink};
pub use config::ExperimentConfig;
pub use controller::{AdaptiveController, StepParams};
pub use error::{ExperimentError, Result};
pub use jitter::OnsetJitter;
pub use layout::AnswerLayout;
pub use pool::StimulusPool;
pub use recency::RecencyWindow;
pub use selector::{DuplicateAvoidanceSelector, Selection};
pub use sequencer::{Block, BlockSequencer, DifficultyInterleaver};
pub use session::{ExperimentSession, KeySummary, SessionOutcome, SessionSummary};
pub use staircase::UpDownStaircase;
pub use state::TrialSession;
pub use tracker::IntensityTracker;
pub use trial::{TrialDurations, TrialPlan};

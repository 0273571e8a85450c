pub mod condition;
pub mod key;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use condition::{Condition, Difficulty};
pub use key::{PartitionKey, StaircaseKey};
pub use phase::{SessionState, StaircasePhase};
pub use stimulus::{StimulusItem, Word, display_text};
pub use trial::{AnswerPosition, Response, TrialRecord, TrialRow, TrialState};

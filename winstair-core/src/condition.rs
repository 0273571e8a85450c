use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensory modality under test in one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    Auditory,
    Visual,
    Audiovisual,
    Environmental,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Auditory,
        Condition::Visual,
        Condition::Audiovisual,
        Condition::Environmental,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Condition::Auditory => "Auditory",
            Condition::Visual => "Visual",
            Condition::Audiovisual => "Audiovisual",
            Condition::Environmental => "Environmental",
        }
    }

    /// Visual-only blocks show the movie instead of the image mask.
    pub fn shows_movie(&self) -> bool {
        matches!(self, Condition::Visual)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Difficulty label of a trial. Selects both the accuracy target and the
/// stimulus pool partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 2] = [Difficulty::Easy, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Hard => "hard",
        }
    }

    /// Text shown during the difficulty cue period.
    pub fn cue_text(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_round_trips_as_lowercase_label() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        let back: Difficulty = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(back, Difficulty::Easy);
    }

    #[test]
    fn only_visual_shows_movie() {
        let movies: Vec<_> = Condition::ALL.iter().filter(|c| c.shows_movie()).collect();
        assert_eq!(movies, vec![&Condition::Visual]);
    }
}

use rand::Rng;
use rand::seq::SliceRandom;
use winstair_core::{AnswerPosition, StimulusItem, Word, display_text};

/// Choice words shuffled onto screen positions for one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLayout {
    target: Word,
    slots: Vec<(AnswerPosition, Word)>,
}

impl AnswerLayout {
    /// Shuffles the item's choices onto the first `choice_count` positions.
    /// Items with more than four choices lose the extras, which pool
    /// validation rules out.
    pub fn shuffle<R: Rng + ?Sized>(item: &StimulusItem, rng: &mut R) -> Self {
        let mut choices = item.choice_set();
        choices.shuffle(rng);
        Self {
            target: item.target.clone(),
            slots: AnswerPosition::ALL.into_iter().zip(choices).collect(),
        }
    }

    pub fn target(&self) -> &Word {
        &self.target
    }

    pub fn slots(&self) -> &[(AnswerPosition, Word)] {
        &self.slots
    }

    pub fn positions(&self) -> impl Iterator<Item = AnswerPosition> + '_ {
        self.slots.iter().map(|(p, _)| *p)
    }

    pub fn choice_at(&self, position: AnswerPosition) -> Option<&Word> {
        self.slots.iter().find(|(p, _)| *p == position).map(|(_, w)| w)
    }

    pub fn target_position(&self) -> Option<AnswerPosition> {
        self.slots.iter().find(|(_, w)| *w == self.target).map(|(p, _)| *p)
    }

    /// A missing answer or a position with no word is incorrect.
    pub fn is_correct(&self, answer: Option<AnswerPosition>) -> bool {
        answer
            .and_then(|p| self.choice_at(p))
            .is_some_and(|w| *w == self.target)
    }

    /// Labels as the participant sees them.
    pub fn labels(&self) -> Vec<(AnswerPosition, String)> {
        self.slots.iter().map(|(p, w)| (*p, display_text(w))).collect()
    }
}

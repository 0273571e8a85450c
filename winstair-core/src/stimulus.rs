pub use string_cache::DefaultAtom as Word;

/// One trial's worth of stimulus: the target word plus the distractors shown
/// alongside it as answer choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusItem {
    pub target: Word,
    pub distractors: Vec<Word>,
}

impl StimulusItem {
    pub fn new(target: impl Into<Word>, distractors: impl IntoIterator<Item = impl Into<Word>>) -> Self {
        Self {
            target: target.into(),
            distractors: distractors.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds an item from a choice list whose first entry is the target.
    pub fn from_choices<S: AsRef<str>>(choices: &[S]) -> Option<Self> {
        let (target, rest) = choices.split_first()?;
        Some(Self {
            target: Word::from(target.as_ref()),
            distractors: rest.iter().map(|w| Word::from(w.as_ref())).collect(),
        })
    }

    /// Target followed by distractors.
    pub fn choice_set(&self) -> Vec<Word> {
        std::iter::once(self.target.clone())
            .chain(self.distractors.iter().cloned())
            .collect()
    }

    pub fn choice_count(&self) -> usize {
        self.distractors.len() + 1
    }

    /// Canonical identity of the whole choice set, independent of order.
    pub fn set_key(&self) -> String {
        let mut words: Vec<&str> = std::iter::once(&*self.target)
            .chain(self.distractors.iter().map(|w| &**w))
            .collect();
        words.sort_unstable();
        words.join("|")
    }
}

/// Identifiers use underscores where the participant should see spaces.
pub fn display_text(word: &str) -> String {
    word.replace('_', " ")
}

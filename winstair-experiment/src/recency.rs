use std::collections::VecDeque;
use winstair_core::{StimulusItem, Word};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecentEntry {
    target: Word,
    set_key: String,
}

/// Bounded FIFO of the most recently accepted stimuli, shared by every main
/// phase partition of a session. The oldest entry drops once `capacity` is
/// reached.
#[derive(Debug, Clone)]
pub struct RecencyWindow {
    entries: VecDeque<RecentEntry>,
    capacity: usize,
}

impl RecencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_target(&self, target: &Word) -> bool {
        self.entries.iter().any(|e| &e.target == target)
    }

    pub fn contains_set(&self, set_key: &str) -> bool {
        self.entries.iter().any(|e| e.set_key == set_key)
    }

    /// True when either the item's target or its whole choice set was
    /// accepted within the window.
    pub fn conflicts_with(&self, item: &StimulusItem) -> bool {
        self.contains_target(&item.target) || self.contains_set(&item.set_key())
    }

    pub fn push(&mut self, item: &StimulusItem) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(RecentEntry {
            target: item.target.clone(),
            set_key: item.set_key(),
        });
    }

    /// Targets oldest first.
    pub fn targets(&self) -> impl Iterator<Item = &Word> {
        self.entries.iter().map(|e| &e.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(target: &str, distractors: &[&str]) -> StimulusItem {
        StimulusItem::new(target, distractors.iter().copied())
    }

    #[test]
    fn oldest_entry_drops_at_capacity() {
        let mut window = RecencyWindow::new(2);
        window.push(&item("a", &["x"]));
        window.push(&item("b", &["y"]));
        window.push(&item("c", &["z"]));
        assert_eq!(window.len(), 2);
        assert!(!window.contains_target(&Word::from("a")));
        let targets: Vec<&str> = window.targets().map(|w| &**w).collect();
        assert_eq!(targets, ["b", "c"]);
    }

    #[test]
    fn same_choice_set_with_other_target_conflicts() {
        let mut window = RecencyWindow::new(20);
        window.push(&item("cat", &["bat", "hat"]));
        assert!(window.conflicts_with(&item("hat", &["cat", "bat"])));
        assert!(window.conflicts_with(&item("cat", &["dog", "log"])));
        assert!(!window.conflicts_with(&item("dog", &["bat", "hat"])));
    }

    #[test]
    fn substrings_are_not_matches() {
        let mut window = RecencyWindow::new(20);
        window.push(&item("bath", &["path"]));
        assert!(!window.contains_target(&Word::from("bat")));
        assert!(!window.contains_set("path"));
    }
}

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use winstair_core::{Condition, Difficulty, StaircaseKey, StaircasePhase, StimulusItem};
use winstair_experiment::{BlockSequencer, DuplicateAvoidanceSelector, RecencyWindow, StimulusPool};

fn main_key() -> StaircaseKey {
    StaircaseKey::new(StaircasePhase::Main, Condition::Audiovisual, Difficulty::Hard)
}

/// `n` items drawn from a vocabulary of `vocab` words, so targets and
/// choice sets collide often.
fn crowded_pool(n: usize, vocab: usize) -> StimulusPool {
    let mut pool = StimulusPool::new();
    for i in 0..n {
        let target = format!("w{}", i % vocab);
        let distractor = format!("w{}", (i * 7 + 1) % vocab);
        let extra = format!("x{i}");
        pool.insert(main_key(), StimulusItem::new(target.as_str(), [distractor.as_str(), extra.as_str()]));
    }
    pool
}

proptest! {
    #[test]
    fn accepted_items_avoid_the_last_twenty(seed in any::<u64>(), vocab in 5usize..60) {
        let key = main_key();
        let mut pool = crowded_pool(80, vocab);
        let mut recency = RecencyWindow::new(20);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let selector = DuplicateAvoidanceSelector::new(25);
        let mut accepted: Vec<StimulusItem> = Vec::new();

        for _ in 0..60 {
            let selection = selector.select(&mut pool, &key, &mut recency, &mut rng).unwrap();
            prop_assert!(selection.rejections <= 25);
            prop_assert_eq!(selection.degraded, selection.rejections == 25);
            if !selection.degraded {
                let earlier = &accepted[accepted.len().saturating_sub(20)..];
                for prev in earlier {
                    prop_assert_ne!(&prev.target, &selection.item.target);
                    prop_assert_ne!(prev.set_key(), selection.item.set_key());
                }
            }
            accepted.push(selection.item);
        }
        prop_assert_eq!(pool.remaining(&key), 20);
    }

    #[test]
    fn sequencing_is_seed_deterministic(seed in any::<u64>(), reps in 1usize..6) {
        let conditions = [Condition::Auditory, Condition::Visual, Condition::Audiovisual, Condition::Environmental];
        let a = BlockSequencer::order(&conditions, reps, &mut ChaCha8Rng::seed_from_u64(seed));
        let b = BlockSequencer::order(&conditions, reps, &mut ChaCha8Rng::seed_from_u64(seed));
        prop_assert_eq!(a.len(), conditions.len() * reps);
        prop_assert_eq!(a, b);
    }
}

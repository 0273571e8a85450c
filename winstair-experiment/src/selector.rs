use crate::error::{ExperimentError, Result};
use crate::pool::StimulusPool;
use crate::recency::RecencyWindow;
use rand::Rng;
use tracing::{debug, warn};
use winstair_core::{PartitionKey, StaircasePhase, StimulusItem};

/// An accepted stimulus plus how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item: StimulusItem,
    /// Draws rejected for recency before acceptance.
    pub rejections: usize,
    /// Accepted only because every allowed draw was rejected.
    pub degraded: bool,
}

/// Picks stimuli from a pool partition while keeping recently used targets
/// and choice sets out of the main phase.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateAvoidanceSelector {
    pub max_retries: usize,
}

impl DuplicateAvoidanceSelector {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub fn select<R: Rng + ?Sized>(
        &self,
        pool: &mut StimulusPool,
        key: &PartitionKey,
        recency: &mut RecencyWindow,
        rng: &mut R,
    ) -> Result<Selection> {
        match key.phase {
            StaircasePhase::Baseline => Ok(Selection {
                item: pool.take_first(key)?,
                rejections: 0,
                degraded: false,
            }),
            StaircasePhase::Main => self.select_main(pool, key, recency, rng),
        }
    }

    fn select_main<R: Rng + ?Sized>(
        &self,
        pool: &mut StimulusPool,
        key: &PartitionKey,
        recency: &mut RecencyWindow,
        rng: &mut R,
    ) -> Result<Selection> {
        let remaining = pool.remaining(key);
        if remaining == 0 {
            return Err(ExperimentError::PoolExhausted(*key));
        }

        let mut rejections = 0;
        let mut degraded = false;
        let index = loop {
            let index = rng.random_range(0..remaining);
            let candidate = pool.get(key, index).ok_or(ExperimentError::PoolExhausted(*key))?;
            if !recency.conflicts_with(candidate) {
                break index;
            }
            rejections += 1;
            debug!(
                partition = %key,
                target = %candidate.target,
                rejections,
                "rejected recently used stimulus"
            );
            if rejections >= self.max_retries {
                warn!(
                    partition = %key,
                    target = %candidate.target,
                    rejections,
                    "no fresh stimulus found, accepting a recent repeat"
                );
                degraded = true;
                break index;
            }
        };

        let item = pool.take_at(key, index)?;
        recency.push(&item);
        Ok(Selection {
            item,
            rejections,
            degraded,
        })
    }
}

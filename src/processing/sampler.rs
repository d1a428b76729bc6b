use ndarray::{Array1, Axis};
use ndarray_rand::rand::Rng;
use ndarray_rand::{RandomExt, SamplingStrategy};
use crate::error::errors::{Result, TargetError};

/// Indices picked for training, in draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub positives: Vec<usize>,
    pub negatives: Vec<usize>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stratified sampling under a positive quota and a total budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    positive_quota: usize,
    total_budget: usize,
}

impl Sampler {
    pub fn new(positive_quota: usize, total_budget: usize) -> Result<Self> {
        if positive_quota > total_budget {
            return Err(TargetError::configuration(format!(
                "positive quota {} exceeds total budget {}",
                positive_quota, total_budget
            )));
        }
        Ok(Sampler { positive_quota, total_budget })
    }

    pub fn positive_quota(&self) -> usize {
        self.positive_quota
    }

    pub fn total_budget(&self) -> usize {
        self.total_budget
    }

    /// Draws up to `positive_quota` positives, then fills the remaining budget with negatives.
    ///
    /// `positives` and `negatives` must be disjoint.
    pub fn select<R: Rng>(&self, positives: &[usize], negatives: &[usize], rng: &mut R) -> Selection {
        debug_assert!(
            positives.iter().all(|p| !negatives.contains(p)),
            "positive and negative candidates overlap"
        );

        let pos_num = positives.len().min(self.positive_quota);
        let positives = shuffle_and_select(positives, pos_num, rng);

        let neg_num = negatives.len().min(self.total_budget - pos_num);
        let negatives = shuffle_and_select(negatives, neg_num, rng);

        Selection { positives, negatives }
    }
}

fn shuffle_and_select<R: Rng>(indices: &[usize], amount: usize, rng: &mut R) -> Vec<usize> {
    if amount == 0 {
        return Vec::new();
    }
    let pool = Array1::from(indices.to_vec());
    pool.sample_axis_using(Axis(0), amount, SamplingStrategy::WithoutReplacement, rng)
        .into_raw_vec()
}

//! Mini-batch drivers for both target stages.
//!
//! Each sample gets its own `StdRng`, seeded in sample order from the caller's generator, so
//! per-sample work can run on the rayon pool and still reproduce the same selection as a
//! sequential pass. Results are joined in sample order only after every sample succeeded.

use log::debug;
use ndarray::{s, Array1, Array2, Array3, ArrayView2};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use rayon::prelude::*;
use crate::error::errors::Result;
use crate::rcnn::bbox::{validate_boxes, BOX_DIM};
use crate::target::mrcnn_target::{check_sample_indices, MrcnnTarget};
use crate::target::rpn_target::RpnTarget;
use crate::target::types::{AnchorTargets, GroundTruth, Proposals, RoiTargets};

#[derive(Debug, Clone, PartialEq)]
pub struct RpnBatchTargets {
    /// `[batch, anchors_num]`, 1 positive, -1 negative, 0 ignored.
    pub tags: Array2<i8>,
    /// `[batch, anchors_num, (dy, dx, dz, dh, dw, dd)]`.
    pub deltas: Array3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MrcnnBatchTargets {
    pub rois: Array2<f32>,
    pub deltas: Array2<f32>,
    pub labels: Array1<i64>,
    pub tags: Array1<i8>,
    /// Sample each roi came from; non-decreasing, consumed by roi pooling.
    pub sample_indices: Array1<usize>,
    pub matched_gt: Vec<Option<usize>>,
}

impl MrcnnBatchTargets {
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sample_rngs<R: Rng>(batch_size: usize, rng: &mut R) -> Vec<StdRng> {
    (0..batch_size).map(|_| StdRng::seed_from_u64(rng.gen())).collect()
}

/// Anchor-stage targets for every sample of the batch, stacked along a new batch axis.
pub fn rpn_batch_targets<R: Rng>(
    target: &RpnTarget,
    anchors: ArrayView2<f32>,
    gt_batch: &[GroundTruth],
    rng: &mut R,
) -> Result<RpnBatchTargets> {
    validate_boxes(anchors, "anchors")?;
    let rngs = sample_rngs(gt_batch.len(), rng);

    let per_sample: Vec<AnchorTargets> = gt_batch
        .par_iter()
        .zip(rngs.into_par_iter())
        .map(|(gt, mut sample_rng)| target.sample_targets_unchecked(anchors, gt, &mut sample_rng))
        .collect();

    let (batch, anchors_num) = (gt_batch.len(), anchors.nrows());
    let mut tags = Array2::<i8>::zeros((batch, anchors_num));
    let mut deltas = Array3::<f32>::zeros((batch, anchors_num, BOX_DIM));
    for (i, sample) in per_sample.iter().enumerate() {
        tags.row_mut(i).assign(&sample.tags);
        deltas.slice_mut(s![i, .., ..]).assign(&sample.deltas);
    }
    debug!("rpn batch targets: {} samples x {} anchors", batch, anchors_num);

    Ok(RpnBatchTargets { tags, deltas })
}

/// Refinement-stage targets for every sample, concatenated in sample order.
pub fn mrcnn_batch_targets<R: Rng>(
    target: &MrcnnTarget,
    proposals: &Proposals,
    gt_batch: &[GroundTruth],
    rng: &mut R,
) -> Result<MrcnnBatchTargets> {
    check_sample_indices(proposals, gt_batch.len())?;
    let rngs = sample_rngs(gt_batch.len(), rng);

    let per_sample: Vec<RoiTargets> = gt_batch
        .par_iter()
        .zip(rngs.into_par_iter())
        .enumerate()
        .map(|(i, (gt, mut sample_rng))| target.sample_targets(proposals, i, gt, &mut sample_rng))
        .collect::<Result<Vec<_>>>()?;

    let out = concatenate_rois(&per_sample);
    debug!("mrcnn batch targets: {} rois over {} samples", out.len(), gt_batch.len());
    Ok(out)
}

// Copies into preallocated buffers so an all-empty batch still yields [0, 6] outputs.
fn concatenate_rois(per_sample: &[RoiTargets]) -> MrcnnBatchTargets {
    let total: usize = per_sample.iter().map(RoiTargets::len).sum();
    let mut rois = Array2::<f32>::zeros((total, BOX_DIM));
    let mut deltas = Array2::<f32>::zeros((total, BOX_DIM));
    let mut labels = Array1::<i64>::zeros(total);
    let mut tags = Array1::<i8>::zeros(total);
    let mut sample_indices = Array1::<usize>::zeros(total);
    let mut matched_gt = Vec::with_capacity(total);

    let mut start = 0;
    for (i, sample) in per_sample.iter().enumerate() {
        let end = start + sample.len();
        rois.slice_mut(s![start..end, ..]).assign(&sample.rois);
        deltas.slice_mut(s![start..end, ..]).assign(&sample.deltas);
        labels.slice_mut(s![start..end]).assign(&sample.labels);
        tags.slice_mut(s![start..end]).assign(&sample.tags);
        sample_indices.slice_mut(s![start..end]).fill(i);
        matched_gt.extend_from_slice(&sample.matched_gt);
        start = end;
    }

    MrcnnBatchTargets {
        rois,
        deltas,
        labels,
        tags,
        sample_indices,
        matched_gt,
    }
}

use log::{debug, trace, warn};
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::Rng;
use crate::error::errors::{Result, TargetError};
use crate::processing::bbox_regression::encode_unchecked;
use crate::processing::sampler::Sampler;
use crate::rcnn::bbox::{iou_3d_unchecked, Box3D, BOX_DIM};
use crate::target::config::MrcnnTargetConfig;
use crate::target::types::{
    GroundTruth, Proposals, RoiTargets, BACKGROUND_LABEL, TAG_NEGATIVE, TAG_POSITIVE,
};

/// Picks the training rois for one sample out of the pooled proposals and computes their
/// class labels and regression targets.
///
/// Only selected rois are returned: positives first in draw order, then negatives.
#[derive(Debug, Clone)]
pub struct MrcnnTarget {
    config: MrcnnTargetConfig,
    sampler: Sampler,
}

impl MrcnnTarget {
    pub fn new(config: MrcnnTargetConfig) -> Result<Self> {
        config.validate()?;
        let sampler = Sampler::new(config.positive_quota(), config.train_rois_per_image)?;
        Ok(MrcnnTarget { config, sampler })
    }

    pub fn config(&self) -> &MrcnnTargetConfig {
        &self.config
    }

    pub fn sample_targets<R: Rng>(
        &self,
        proposals: &Proposals,
        sample: usize,
        gt: &GroundTruth,
        rng: &mut R,
    ) -> Result<RoiTargets> {
        let roi_rows = proposals.rows_of(sample);
        if roi_rows.is_empty() {
            warn!("mrcnn target: sample {} has no proposals", sample);
            return Ok(RoiTargets::empty());
        }
        let rois = proposals.boxes().select(Axis(0), &roi_rows);
        let gt_boxes = gt.boxes();
        let iou = iou_3d_unchecked(gt_boxes, rois.view()); // [gt_num, roi_num]

        // column max; ties go to the lowest gt row
        let roi_num = rois.nrows();
        let mut roi_max = vec![0.0f32; roi_num];
        let mut roi_argmax = vec![0usize; roi_num];
        for (g, row) in iou.outer_iter().enumerate() {
            for (r, value) in row.iter().enumerate() {
                if *value > roi_max[r] {
                    roi_max[r] = *value;
                    roi_argmax[r] = g;
                }
            }
        }

        let pos_indices: Vec<usize> = (0..roi_num)
            .filter(|r| roi_max[*r] >= self.config.positive_iou_threshold)
            .collect();
        let neg_indices: Vec<usize> = (0..roi_num)
            .filter(|r| roi_max[*r] < self.config.negative_iou_threshold)
            .collect();

        let selection = self.sampler.select(&pos_indices, &neg_indices, rng);
        let (pos_num, neg_num) = (selection.positives.len(), selection.negatives.len());
        debug!(
            "mrcnn target: sample {}: {} rois, {} gt, {}/{} positive, {}/{} negative selected",
            sample,
            roi_num,
            gt.len(),
            pos_num,
            pos_indices.len(),
            neg_num,
            neg_indices.len(),
        );
        trace!("mrcnn positives {:?}, negatives {:?}", selection.positives, selection.negatives);

        let kept = pos_num + neg_num;
        let mut out_rois = Array2::<f32>::zeros((kept, BOX_DIM));
        let mut deltas = Array2::<f32>::zeros((kept, BOX_DIM));
        let mut labels = Array1::<i64>::from_elem(kept, BACKGROUND_LABEL);
        let mut tags = Array1::<i8>::from_elem(kept, TAG_NEGATIVE);
        let mut matched_gt = vec![None; kept];

        let order = selection.positives.iter().chain(selection.negatives.iter());
        for (k, &r) in order.enumerate() {
            out_rois.row_mut(k).assign(&rois.row(r));
            if k >= pos_num {
                continue;
            }
            let g = roi_argmax[r];
            let delta = encode_unchecked(&Box3D::from_row(rois.row(r)), &Box3D::from_row(gt_boxes.row(g)));
            for (j, d) in delta.iter().enumerate() {
                deltas[[k, j]] = *d;
            }
            labels[k] = gt.labels()[g];
            tags[k] = TAG_POSITIVE;
            matched_gt[k] = Some(g);
        }

        Ok(RoiTargets {
            rois: out_rois,
            deltas,
            labels,
            tags,
            matched_gt,
        })
    }
}

pub(crate) fn check_sample_indices(proposals: &Proposals, batch_size: usize) -> Result<()> {
    if let Some(&sample) = proposals.sample_indices().iter().find(|s| **s >= batch_size) {
        return Err(TargetError::shape("proposal sample index bound", batch_size, sample));
    }
    Ok(())
}

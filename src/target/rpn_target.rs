use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand::Rng;
use crate::error::errors::Result;
use crate::processing::bbox_regression::encode_unchecked;
use crate::processing::sampler::Sampler;
use crate::rcnn::bbox::{iou_3d_unchecked, validate_boxes, Box3D, BOX_DIM};
use crate::target::config::RpnTargetConfig;
use crate::target::types::{AnchorTargets, GroundTruth, TAG_IGNORE, TAG_NEGATIVE, TAG_POSITIVE};

/// Tags every anchor positive, negative or ignored against one sample's ground truth
/// and computes regression targets for the positives.
#[derive(Debug, Clone)]
pub struct RpnTarget {
    config: RpnTargetConfig,
    sampler: Sampler,
}

impl RpnTarget {
    pub fn new(config: RpnTargetConfig) -> Result<Self> {
        config.validate()?;
        let sampler = Sampler::new(config.train_positive_anchors, config.train_anchors_per_image)?;
        Ok(RpnTarget { config, sampler })
    }

    pub fn config(&self) -> &RpnTargetConfig {
        &self.config
    }

    pub fn sample_targets<R: Rng>(
        &self,
        anchors: ArrayView2<f32>,
        gt: &GroundTruth,
        rng: &mut R,
    ) -> Result<AnchorTargets> {
        validate_boxes(anchors, "anchors")?;
        Ok(self.sample_targets_unchecked(anchors, gt, rng))
    }

    // Anchors are validated once per batch by the coordinator.
    pub(crate) fn sample_targets_unchecked<R: Rng>(
        &self,
        anchors: ArrayView2<f32>,
        gt: &GroundTruth,
        rng: &mut R,
    ) -> AnchorTargets {
        let anchors_num = anchors.nrows();
        let gt_boxes = gt.boxes();
        let iou = iou_3d_unchecked(gt_boxes, anchors); // [gt_num, anchors_num]

        // max over an empty ground truth set is 0, so every anchor is negative-eligible
        let mut anchors_iou_max = vec![0.0f32; anchors_num];
        let mut anchors_iou_argmax = vec![0usize; anchors_num];
        for (g, row) in iou.outer_iter().enumerate() {
            for (a, value) in row.iter().enumerate() {
                if *value > anchors_iou_max[a] {
                    anchors_iou_max[a] = *value;
                    anchors_iou_argmax[a] = g;
                }
            }
        }

        let pos_indices: Vec<usize> = (0..anchors_num)
            .filter(|a| anchors_iou_max[*a] >= self.config.positive_iou_threshold)
            .collect();
        let neg_indices: Vec<usize> = (0..anchors_num)
            .filter(|a| anchors_iou_max[*a] <= self.config.negative_iou_threshold)
            .collect();

        let selection = self.sampler.select(&pos_indices, &neg_indices, rng);
        debug!(
            "rpn target: {} gt, {}/{} positive, {}/{} negative anchors selected",
            gt.len(),
            selection.positives.len(),
            pos_indices.len(),
            selection.negatives.len(),
            neg_indices.len(),
        );
        trace!("rpn positives {:?}, negatives {:?}", selection.positives, selection.negatives);

        let mut tags = Array1::<i8>::from_elem(anchors_num, TAG_IGNORE);
        let mut deltas = Array2::<f32>::zeros((anchors_num, BOX_DIM));
        for &a in &selection.positives {
            tags[a] = TAG_POSITIVE;
            let anchor = Box3D::from_row(anchors.row(a));
            let matched = Box3D::from_row(gt_boxes.row(anchors_iou_argmax[a]));
            let delta = encode_unchecked(&anchor, &matched);
            for (j, d) in delta.iter().enumerate() {
                deltas[[a, j]] = *d;
            }
        }
        for &a in &selection.negatives {
            tags[a] = TAG_NEGATIVE;
        }

        AnchorTargets { tags, deltas }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use crate::rcnn::bbox::Box3D;
    use crate::target::config::RpnTargetConfig;
    use crate::target::rpn_target::RpnTarget;
    use crate::target::types::GroundTruth;

    fn unit_box() -> Array2<f32> {
        array![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]]
    }

    #[test]
    fn test_exact_match_is_positive() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let gt = GroundTruth::new(unit_box(), array![1]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let out = target.sample_targets(unit_box().view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags, array![1]);
        assert_eq!(out.deltas, Array2::<f32>::zeros((1, 6)));
    }

    #[test]
    fn test_far_anchor_is_negative() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let gt = GroundTruth::new(array![[10.0, 10.0, 10.0, 12.0, 12.0, 12.0]], array![1]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let out = target.sample_targets(unit_box().view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags, array![-1]);
        assert_eq!(out.deltas, Array2::<f32>::zeros((1, 6)));
    }

    #[test]
    fn test_empty_ground_truth_is_all_negative() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let anchors = array![
            [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            [2.0, 2.0, 2.0, 4.0, 4.0, 4.0],
            [5.0, 5.0, 5.0, 6.0, 6.0, 6.0]
        ];
        let mut rng = StdRng::seed_from_u64(3);

        let out = target.sample_targets(anchors.view(), &GroundTruth::empty(), &mut rng).unwrap();
        assert_eq!(out.tags, array![-1, -1, -1]);
    }

    #[test]
    fn test_threshold_boundaries_are_inclusive() {
        let config = RpnTargetConfig {
            negative_iou_threshold: 0.25,
            ..Default::default()
        };
        let target = RpnTarget::new(config).unwrap();
        let gt = GroundTruth::new(array![[0.0, 0.0, 0.0, 4.0, 4.0, 4.0]], array![1]).unwrap();
        // iou 16 / 64 = 0.25 and 32 / 64 = 0.5
        let anchors = array![[0.0, 0.0, 0.0, 1.0, 4.0, 4.0], [0.0, 0.0, 0.0, 4.0, 4.0, 2.0]];
        let mut rng = StdRng::seed_from_u64(3);

        let out = target.sample_targets(anchors.view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags, array![-1, 1]);
        assert!(out.deltas.row(0).iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_middle_band_is_ignored() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let gt = GroundTruth::new(array![[0.0, 0.0, 0.0, 2.0, 2.0, 2.0]], array![1]).unwrap();
        // iou = 4 / 12
        let anchors = array![[1.0, 0.0, 0.0, 3.0, 2.0, 2.0]];
        let mut rng = StdRng::seed_from_u64(3);

        let out = target.sample_targets(anchors.view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags, array![0]);
        assert_eq!(out.deltas, Array2::<f32>::zeros((1, 6)));
    }

    #[test]
    fn test_positive_quota_leaves_rest_ignored() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let gt = GroundTruth::new(array![[0.0, 0.0, 0.0, 10.0, 10.0, 10.0]], array![2]).unwrap();
        // five anchors with iou >= 0.5 against the gt
        let anchors = array![
            [0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
            [0.0, 0.0, 0.0, 10.0, 10.0, 9.0],
            [0.0, 0.0, 1.0, 10.0, 10.0, 10.0],
            [0.0, 0.0, 0.0, 9.0, 10.0, 10.0],
            [1.0, 0.0, 0.0, 10.0, 10.0, 10.0]
        ];
        let mut rng = StdRng::seed_from_u64(11);

        let out = target.sample_targets(anchors.view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags.iter().filter(|t| **t == 1).count(), 2);
        assert_eq!(out.tags.iter().filter(|t| **t == 0).count(), 3);
        assert_eq!(out.tags.iter().filter(|t| **t == -1).count(), 0);

        for (a, tag) in out.tags.iter().enumerate() {
            let row = out.deltas.row(a);
            if *tag == 1 {
                let expected = Box3D::from_row(anchors.row(a))
                    .encode(&Box3D::from_row(gt.boxes().row(0)))
                    .unwrap();
                for (d, e) in row.iter().zip(expected.iter()) {
                    assert_abs_diff_eq!(*d, *e, epsilon = 1e-6);
                }
            } else {
                assert!(row.iter().all(|d| *d == 0.0));
            }
        }
    }

    #[test]
    fn test_matches_best_ground_truth() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let gt = GroundTruth::new(
            array![[0.0, 0.0, 0.0, 4.0, 4.0, 4.0], [0.0, 0.0, 0.0, 4.0, 4.0, 3.0]],
            array![1, 2],
        )
        .unwrap();
        // anchor equals the second gt box exactly
        let anchors = array![[0.0, 0.0, 0.0, 4.0, 4.0, 3.0]];
        let mut rng = StdRng::seed_from_u64(5);

        let out = target.sample_targets(anchors.view(), &gt, &mut rng).unwrap();
        assert_eq!(out.tags, array![1]);
        assert!(out.deltas.iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn test_invalid_anchors_rejected() {
        let target = RpnTarget::new(RpnTargetConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let anchors = Array2::<f32>::zeros((2, 4));
        assert!(target.sample_targets(anchors.view(), &GroundTruth::empty(), &mut rng).is_err());
    }
}

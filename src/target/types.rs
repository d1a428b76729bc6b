use ndarray::{Array1, Array2, ArrayView2};
use crate::error::errors::{Result, TargetError};
use crate::rcnn::bbox::{validate_boxes, BOX_DIM};

pub const TAG_POSITIVE: i8 = 1;
pub const TAG_NEGATIVE: i8 = -1;
pub const TAG_IGNORE: i8 = 0;

pub const BACKGROUND_LABEL: i64 = 0;

/// Ground-truth boxes `[G, 6]` and their class labels `[G]` for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    boxes: Array2<f32>,
    labels: Array1<i64>,
}

impl GroundTruth {
    pub fn new(boxes: Array2<f32>, labels: Array1<i64>) -> Result<Self> {
        validate_boxes(boxes.view(), "gt boxes")?;
        if boxes.nrows() != labels.len() {
            return Err(TargetError::shape("gt labels", boxes.nrows(), labels.len()));
        }
        if let Some(index) = labels.iter().position(|l| *l <= BACKGROUND_LABEL) {
            return Err(TargetError::InvalidLabel { index, label: labels[index] });
        }
        Ok(GroundTruth { boxes, labels })
    }

    pub fn empty() -> Self {
        GroundTruth {
            boxes: Array2::zeros((0, BOX_DIM)),
            labels: Array1::zeros(0),
        }
    }

    pub fn boxes(&self) -> ArrayView2<f32> {
        self.boxes.view()
    }

    pub fn labels(&self) -> &Array1<i64> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proposals pooled over a mini-batch, each tagged with the sample it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposals {
    boxes: Array2<f32>,
    sample_indices: Array1<usize>,
}

impl Proposals {
    pub fn new(boxes: Array2<f32>, sample_indices: Array1<usize>) -> Result<Self> {
        validate_boxes(boxes.view(), "proposals")?;
        if boxes.nrows() != sample_indices.len() {
            return Err(TargetError::shape("proposal sample indices", boxes.nrows(), sample_indices.len()));
        }
        Ok(Proposals { boxes, sample_indices })
    }

    pub fn boxes(&self) -> ArrayView2<f32> {
        self.boxes.view()
    }

    pub fn sample_indices(&self) -> &Array1<usize> {
        &self.sample_indices
    }

    pub fn len(&self) -> usize {
        self.sample_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row indices of the proposals that belong to `sample`.
    pub fn rows_of(&self, sample: usize) -> Vec<usize> {
        self.sample_indices
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == sample)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Per-anchor targets for one sample; unselected anchors stay as ignored rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTargets {
    pub tags: Array1<i8>,
    pub deltas: Array2<f32>,
}

/// Selected rois for one sample, positives first.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiTargets {
    pub rois: Array2<f32>,
    pub deltas: Array2<f32>,
    pub labels: Array1<i64>,
    pub tags: Array1<i8>,
    pub matched_gt: Vec<Option<usize>>,
}

impl RoiTargets {
    pub fn empty() -> Self {
        RoiTargets {
            rois: Array2::zeros((0, BOX_DIM)),
            deltas: Array2::zeros((0, BOX_DIM)),
            labels: Array1::zeros(0),
            tags: Array1::zeros(0),
            matched_gt: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positive_count(&self) -> usize {
        self.tags.iter().filter(|t| **t == TAG_POSITIVE).count()
    }
}

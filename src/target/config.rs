use serde::Deserialize;
use crate::error::errors::{Result, TargetError};

fn check_thresholds(stage: &str, positive: f32, negative: f32) -> Result<()> {
    if !(0.0 <= negative && negative < positive && positive <= 1.0) {
        return Err(TargetError::configuration(format!(
            "{} thresholds must satisfy 0 <= negative ({}) < positive ({}) <= 1",
            stage, negative, positive
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub scales: Vec<f32>,
    pub stride: usize,
    pub features_height: usize,
    pub features_width: usize,
    pub features_depth: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig {
            scales: vec![8.0, 16.0, 32.0],
            stride: 4,
            features_height: 8,
            features_width: 8,
            features_depth: 8,
        }
    }
}

/// Anchor (region-proposal) stage parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RpnTargetConfig {
    pub train_anchors_per_image: usize,
    pub positive_iou_threshold: f32,
    pub negative_iou_threshold: f32,
    pub train_positive_anchors: usize,
}

impl Default for RpnTargetConfig {
    fn default() -> Self {
        RpnTargetConfig {
            train_anchors_per_image: 800,
            positive_iou_threshold: 0.5,
            negative_iou_threshold: 0.02,
            train_positive_anchors: 2,
        }
    }
}

impl RpnTargetConfig {
    pub fn validate(&self) -> Result<()> {
        check_thresholds("rpn", self.positive_iou_threshold, self.negative_iou_threshold)?;
        if self.train_positive_anchors > self.train_anchors_per_image {
            return Err(TargetError::configuration(format!(
                "train_positive_anchors ({}) exceeds train_anchors_per_image ({})",
                self.train_positive_anchors, self.train_anchors_per_image
            )));
        }
        Ok(())
    }
}

/// Refinement stage parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MrcnnTargetConfig {
    pub train_rois_per_image: usize,
    pub positive_iou_threshold: f32,
    pub negative_iou_threshold: f32,
    pub positive_ratio: f64,
}

impl Default for MrcnnTargetConfig {
    fn default() -> Self {
        MrcnnTargetConfig {
            train_rois_per_image: 200,
            positive_iou_threshold: 0.5,
            negative_iou_threshold: 0.02,
            positive_ratio: 0.1,
        }
    }
}

impl MrcnnTargetConfig {
    pub fn validate(&self) -> Result<()> {
        check_thresholds("mrcnn", self.positive_iou_threshold, self.negative_iou_threshold)?;
        if !(0.0..=1.0).contains(&self.positive_ratio) {
            return Err(TargetError::configuration(format!(
                "positive_ratio ({}) must lie in [0, 1]",
                self.positive_ratio
            )));
        }
        Ok(())
    }

    /// `floor(positive_ratio * train_rois_per_image)`.
    pub fn positive_quota(&self) -> usize {
        (self.positive_ratio * self.train_rois_per_image as f64).floor() as usize
    }
}

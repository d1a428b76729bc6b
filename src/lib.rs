//! Training-target assignment for a two-stage volumetric detector.
//!
//! The anchor stage ([`RpnTarget`]) tags a fixed anchor set against each sample's ground truth.
//! The refinement stage ([`MrcnnTarget`]) samples rois from pooled proposals. Both share the
//! 3D IoU and box regression code in [`rcnn`] and [`processing`]. The batch drivers in
//! [`target::batch`] fan samples out over rayon and join them in order.

pub mod config;
pub mod error;
pub mod logger;
pub mod processing;
pub mod rcnn;
pub mod target;

pub use error::errors::{Result, TargetError};
pub use processing::bbox_regression::{clip_boxes, decode_boxes, encode_boxes, Delta};
pub use processing::sampler::{Sampler, Selection};
pub use rcnn::anchors::{anchors_from_config, generate_anchors};
pub use rcnn::bbox::{iou_3d, Box3D};
pub use target::batch::{mrcnn_batch_targets, rpn_batch_targets, MrcnnBatchTargets, RpnBatchTargets};
pub use target::config::{AnchorConfig, MrcnnTargetConfig, RpnTargetConfig};
pub use target::mrcnn_target::MrcnnTarget;
pub use target::rpn_target::RpnTarget;
pub use target::types::{AnchorTargets, GroundTruth, Proposals, RoiTargets};

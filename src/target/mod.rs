pub mod batch;
pub mod config;
pub mod mrcnn_target;
pub mod rpn_target;
pub mod types;

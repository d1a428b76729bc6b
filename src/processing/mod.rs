pub mod bbox_regression;
pub mod sampler;

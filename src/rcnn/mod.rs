pub mod anchors;
pub mod bbox;

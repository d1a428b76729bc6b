// Anchors are laid out cell by cell over the (height, width, depth) feature grid; every cell
// carries one cube per scale, centered on the cell center in input-volume coordinates.

use ndarray::Array2;
use crate::error::errors::{Result, TargetError};
use crate::rcnn::bbox::BOX_DIM;
use crate::target::config::AnchorConfig;

pub fn generate_anchors(
    scales: &[f32],
    stride: usize,
    height: usize,
    width: usize,
    depth: usize,
) -> Result<Array2<f32>> {
    if scales.is_empty() {
        return Err(TargetError::configuration("anchor scales must not be empty"));
    }
    if stride == 0 {
        return Err(TargetError::configuration("anchor stride must be positive"));
    }
    if let Some(scale) = scales.iter().find(|s| !(**s > 0.0)) {
        return Err(TargetError::configuration(format!("anchor scale {} must be positive", scale)));
    }

    let a = scales.len();
    let mut all_anchors = Array2::<f32>::zeros((height * width * depth * a, BOX_DIM));
    let stride = stride as f32;

    let mut row = 0;
    for ih in 0..height {
        let ch = (ih as f32 + 0.5) * stride;
        for iw in 0..width {
            let cw = (iw as f32 + 0.5) * stride;
            for id in 0..depth {
                let cd = (id as f32 + 0.5) * stride;
                for &scale in scales {
                    let half = 0.5 * scale;
                    all_anchors[[row, 0]] = ch - half;
                    all_anchors[[row, 1]] = cw - half;
                    all_anchors[[row, 2]] = cd - half;
                    all_anchors[[row, 3]] = ch + half;
                    all_anchors[[row, 4]] = cw + half;
                    all_anchors[[row, 5]] = cd + half;
                    row += 1;
                }
            }
        }
    }
    Ok(all_anchors)
}

pub fn anchors_from_config(config: &AnchorConfig) -> Result<Array2<f32>> {
    generate_anchors(
        &config.scales,
        config.stride,
        config.features_height,
        config.features_width,
        config.features_depth,
    )
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use crate::rcnn::anchors::{anchors_from_config, generate_anchors};
    use crate::target::config::AnchorConfig;

    #[test]
    fn test_generate_anchors() {
        let anchors = generate_anchors(&[2.0, 4.0], 4, 2, 1, 1).unwrap();
        assert_eq!(anchors.dim(), (4, 6));
        assert_eq!(anchors.row(0), array![1.0, 1.0, 1.0, 3.0, 3.0, 3.0]);
        assert_eq!(anchors.row(1), array![0.0, 0.0, 0.0, 4.0, 4.0, 4.0]);
        // second cell along the height axis
        assert_eq!(anchors.row(2), array![5.0, 1.0, 1.0, 7.0, 3.0, 3.0]);
    }

    #[test]
    fn test_invalid_anchor_config() {
        assert!(generate_anchors(&[], 4, 2, 2, 2).is_err());
        assert!(generate_anchors(&[2.0], 0, 2, 2, 2).is_err());
        assert!(generate_anchors(&[0.0], 4, 2, 2, 2).is_err());
    }

    #[test]
    fn test_anchors_from_config() {
        let config = AnchorConfig::default();
        let anchors = anchors_from_config(&config).unwrap();
        let expected = config.features_height * config.features_width * config.features_depth * config.scales.len();
        assert_eq!(anchors.nrows(), expected);
    }
}

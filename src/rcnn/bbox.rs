use ndarray::{Array2, ArrayView1, ArrayView2};
use crate::error::errors::{Result, TargetError};

pub const BOX_DIM: usize = 6;

const AXIS_NAMES: [&str; 3] = ["y1 > y2", "x1 > x2", "z1 > z2"];

/// Axis-aligned 3D box stored as `(y1, x1, z1, y2, x2, z2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3D(pub [f32; BOX_DIM]);

impl Box3D {
    /// Builds a box, rejecting any axis where the minimum lies past the maximum.
    pub fn new(coords: [f32; BOX_DIM]) -> Result<Self> {
        check_coords(&coords, "box", 0)?;
        Ok(Box3D(coords))
    }

    pub fn from_row(row: ArrayView1<f32>) -> Self {
        Box3D([row[0], row[1], row[2], row[3], row[4], row[5]])
    }

    pub fn extent(&self) -> [f32; 3] {
        [self.0[3] - self.0[0], self.0[4] - self.0[1], self.0[5] - self.0[2]]
    }

    pub fn center(&self) -> [f32; 3] {
        let ext = self.extent();
        [
            self.0[0] + 0.5 * ext[0],
            self.0[1] + 0.5 * ext[1],
            self.0[2] + 0.5 * ext[2],
        ]
    }

    pub fn volume(&self) -> f32 {
        let [h, w, d] = self.extent();
        h * w * d
    }

    pub fn intersection(&self, other: &Box3D) -> f32 {
        let mut volume = 1.0;
        for axis in 0..3 {
            let overlap = self.0[axis + 3].min(other.0[axis + 3]) - self.0[axis].max(other.0[axis]);
            if overlap <= 0.0 {
                return 0.0;
            }
            volume *= overlap;
        }
        volume
    }

    /// Volumetric intersection over union; zero when the union is empty.
    pub fn iou(&self, other: &Box3D) -> f32 {
        let inter = self.intersection(other);
        let union = self.volume() + other.volume() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }
}

fn check_coords(coords: &[f32; BOX_DIM], what: &'static str, index: usize) -> Result<()> {
    for axis in 0..3 {
        let (lo, hi) = (coords[axis], coords[axis + 3]);
        if lo.is_nan() || hi.is_nan() {
            return Err(TargetError::degenerate(what, index, "NaN coordinate"));
        }
        if lo > hi {
            return Err(TargetError::degenerate(what, index, AXIS_NAMES[axis]));
        }
    }
    Ok(())
}

/// Checks that `boxes` is an `[n, 6]` set of well-formed boxes.
pub fn validate_boxes(boxes: ArrayView2<f32>, what: &'static str) -> Result<()> {
    if boxes.ncols() != BOX_DIM {
        return Err(TargetError::shape(what, BOX_DIM, boxes.ncols()));
    }
    for (index, row) in boxes.outer_iter().enumerate() {
        check_coords(&Box3D::from_row(row).0, what, index)?;
    }
    Ok(())
}

/// Pairwise 3D IoU between every box of `boxes` (rows) and `query_boxes` (columns).
///
/// A single-row `boxes` gives the overlap of one box against all queries.
pub fn iou_3d(boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Result<Array2<f32>> {
    validate_boxes(boxes, "boxes")?;
    validate_boxes(query_boxes, "query boxes")?;
    Ok(iou_3d_unchecked(boxes, query_boxes))
}

pub(crate) fn iou_3d_unchecked(boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Array2<f32> {
    let n = boxes.nrows();
    let k = query_boxes.nrows();
    let mut overlaps = Array2::<f32>::zeros((n, k));

    let queries: Vec<Box3D> = query_boxes.outer_iter().map(Box3D::from_row).collect();
    for (n_idx, row) in boxes.outer_iter().enumerate() {
        let gt = Box3D::from_row(row);
        for (k_idx, query) in queries.iter().enumerate() {
            overlaps[[n_idx, k_idx]] = gt.iou(query);
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use proptest::prelude::*;
    use crate::error::errors::TargetError;
    use crate::rcnn::bbox::{iou_3d, validate_boxes, Box3D};

    #[test]
    fn test_identical_boxes() {
        let a = Box3D::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        assert_abs_diff_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_disjoint_boxes() {
        let a = Box3D([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let b = Box3D([5.0, 5.0, 5.0, 6.0, 6.0, 6.0]);
        assert_eq!(a.iou(&b), 0.0);

        // touching faces share no volume
        let c = Box3D([1.0, 0.0, 0.0, 2.0, 1.0, 1.0]);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let a = Box3D([0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
        let b = Box3D([1.0, 0.0, 0.0, 3.0, 2.0, 2.0]);
        // intersection 4, union 8 + 8 - 4
        assert_abs_diff_eq!(a.iou(&b), 4.0 / 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_volume_union() {
        let a = Box3D([1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_iou_matrix() {
        let gt = array![[0.0, 0.0, 0.0, 2.0, 2.0, 2.0]];
        let anchors = array![
            [0.0, 0.0, 0.0, 2.0, 2.0, 2.0],
            [1.0, 0.0, 0.0, 3.0, 2.0, 2.0],
            [10.0, 10.0, 10.0, 12.0, 12.0, 12.0]
        ];
        let iou = iou_3d(gt.view(), anchors.view()).unwrap();
        assert_eq!(iou.dim(), (1, 3));
        assert_abs_diff_eq!(iou[[0, 0]], 1.0);
        assert_abs_diff_eq!(iou[[0, 1]], 1.0 / 3.0, epsilon = 1e-6);
        assert_eq!(iou[[0, 2]], 0.0);
    }

    #[test]
    fn test_empty_sets() {
        let empty = Array2::<f32>::zeros((0, 6));
        let anchors = array![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]];
        let iou = iou_3d(empty.view(), anchors.view()).unwrap();
        assert_eq!(iou.dim(), (0, 1));
    }

    #[test]
    fn test_validate_boxes() {
        let wrong_cols = Array2::<f32>::zeros((2, 4));
        assert_eq!(
            validate_boxes(wrong_cols.view(), "anchors"),
            Err(TargetError::shape("anchors", 6, 4))
        );

        let inverted = array![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0], [0.0, 2.0, 0.0, 1.0, 1.0, 1.0]];
        assert_eq!(
            validate_boxes(inverted.view(), "anchors"),
            Err(TargetError::degenerate("anchors", 1, "x1 > x2"))
        );
        assert!(Box3D::new([0.0, 0.0, 3.0, 1.0, 1.0, 1.0]).is_err());
    }

    fn arb_box() -> impl Strategy<Value = Box3D> {
        (
            prop::array::uniform3(-50.0f32..50.0),
            prop::array::uniform3(0.0f32..20.0),
        )
            .prop_map(|(lo, ext)| {
                Box3D([lo[0], lo[1], lo[2], lo[0] + ext[0], lo[1] + ext[1], lo[2] + ext[2]])
            })
    }

    proptest! {
        #[test]
        fn iou_is_bounded_and_symmetric(a in arb_box(), b in arb_box()) {
            let ab = a.iou(&b);
            let ba = b.iou(&a);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn iou_with_self_is_one(a in arb_box()) {
            prop_assume!(a.volume() > 1e-3);
            prop_assert!((a.iou(&a) - 1.0).abs() < 1e-5);
        }
    }
}

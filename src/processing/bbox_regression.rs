use ndarray::{Array2, ArrayView2};
use crate::error::errors::{Result, TargetError};
use crate::rcnn::bbox::{validate_boxes, Box3D, BOX_DIM};

/// Regression offsets `(dy, dx, dz, dh, dw, dd)` that move an anchor onto a target box.
pub type Delta = [f32; BOX_DIM];

fn check_extent(b: &Box3D, what: &'static str, index: usize) -> Result<()> {
    if b.extent().iter().any(|e| !(*e > 0.0)) {
        return Err(TargetError::degenerate(what, index, "zero extent"));
    }
    Ok(())
}

impl Box3D {
    /// Centers are offset relative to the anchor extent, extents as a log ratio.
    pub fn encode(&self, target: &Box3D) -> Result<Delta> {
        check_extent(self, "anchor", 0)?;
        check_extent(target, "target", 0)?;
        Ok(encode_unchecked(self, target))
    }

    /// Exact inverse of [`Box3D::encode`].
    pub fn decode(&self, delta: &Delta) -> Result<Box3D> {
        check_extent(self, "anchor", 0)?;
        let (ext, ctr) = axes_f64(self);
        let mut out = [0.0; BOX_DIM];
        for axis in 0..3 {
            let pred_ctr = delta[axis] as f64 * ext[axis] + ctr[axis];
            let pred_ext = (delta[axis + 3] as f64).exp() * ext[axis];
            out[axis] = (pred_ctr - 0.5 * pred_ext) as f32;
            out[axis + 3] = (pred_ctr + 0.5 * pred_ext) as f32;
        }
        Ok(Box3D(out))
    }
}

// f64 intermediates keep decode(encode(b)) within 1e-5 of b for f32 storage.
fn axes_f64(b: &Box3D) -> ([f64; 3], [f64; 3]) {
    let mut ext = [0.0; 3];
    let mut ctr = [0.0; 3];
    for axis in 0..3 {
        let (lo, hi) = (b.0[axis] as f64, b.0[axis + 3] as f64);
        ext[axis] = hi - lo;
        ctr[axis] = lo + 0.5 * ext[axis];
    }
    (ext, ctr)
}

pub(crate) fn encode_unchecked(anchor: &Box3D, target: &Box3D) -> Delta {
    let (a_ext, a_ctr) = axes_f64(anchor);
    let (t_ext, t_ctr) = axes_f64(target);
    let mut delta = [0.0; BOX_DIM];
    for axis in 0..3 {
        delta[axis] = ((t_ctr[axis] - a_ctr[axis]) / a_ext[axis]) as f32;
        delta[axis + 3] = (t_ext[axis] / a_ext[axis]).ln() as f32;
    }
    delta
}

/// Row-wise regression targets: `deltas[i] = encode(anchors[i], targets[i])`.
pub fn encode_boxes(anchors: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Array2<f32>> {
    validate_boxes(anchors, "anchors")?;
    validate_boxes(targets, "targets")?;
    if anchors.nrows() != targets.nrows() {
        return Err(TargetError::shape("targets", anchors.nrows(), targets.nrows()));
    }

    let mut deltas = Array2::<f32>::zeros((anchors.nrows(), BOX_DIM));
    for (i, (a, t)) in anchors.outer_iter().zip(targets.outer_iter()).enumerate() {
        let (anchor, target) = (Box3D::from_row(a), Box3D::from_row(t));
        check_extent(&anchor, "anchors", i)?;
        check_extent(&target, "targets", i)?;
        let delta = encode_unchecked(&anchor, &target);
        for (j, d) in delta.iter().enumerate() {
            deltas[[i, j]] = *d;
        }
    }
    Ok(deltas)
}

/// Applies predicted deltas to anchors; the inverse of [`encode_boxes`].
pub fn decode_boxes(anchors: ArrayView2<f32>, deltas: ArrayView2<f32>) -> Result<Array2<f32>> {
    validate_boxes(anchors, "anchors")?;
    if deltas.ncols() != BOX_DIM {
        return Err(TargetError::shape("deltas", BOX_DIM, deltas.ncols()));
    }
    if anchors.nrows() != deltas.nrows() {
        return Err(TargetError::shape("deltas", anchors.nrows(), deltas.nrows()));
    }

    let mut pred_boxes = Array2::<f32>::zeros((anchors.nrows(), BOX_DIM));
    for (i, (a, d)) in anchors.outer_iter().zip(deltas.outer_iter()).enumerate() {
        let anchor = Box3D::from_row(a);
        check_extent(&anchor, "anchors", i)?;
        let delta = [d[0], d[1], d[2], d[3], d[4], d[5]];
        let decoded = anchor.decode(&delta)?;
        for (j, c) in decoded.0.iter().enumerate() {
            pred_boxes[[i, j]] = *c;
        }
    }
    Ok(pred_boxes)
}

/// Clamps boxes into a `(height, width, depth)` volume.
pub fn clip_boxes(boxes: &mut Array2<f32>, volume_shape: (usize, usize, usize)) -> Result<()> {
    if boxes.ncols() != BOX_DIM {
        return Err(TargetError::shape("boxes", BOX_DIM, boxes.ncols()));
    }
    let limits = [volume_shape.0 as f32, volume_shape.1 as f32, volume_shape.2 as f32];
    for mut row in boxes.outer_iter_mut() {
        for j in 0..BOX_DIM {
            row[j] = row[j].max(0.0).min(limits[j % 3]);
        }
    }
    Ok(())
}

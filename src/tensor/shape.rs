//! Shape utilities for ONNX tensors

/// Total number of elements implied by a dims list
///
/// An empty dims list is a scalar (one element).
pub fn numel(dims: &[i64]) -> usize {
    if dims.is_empty() {
        1
    } else {
        dims.iter().map(|&d| d.max(0) as usize).product()
    }
}

/// The spatial dimensions of an NCHW-layout shape (everything past N and C)
///
/// Returns None unless the rank is at least 3 and every spatial dimension is
/// statically known.
pub fn spatial_dims(shape: &[i64]) -> Option<&[i64]> {
    if shape.len() < 3 {
        return None;
    }
    let spatial = &shape[2..];
    if spatial.iter().all(|&d| d > 0) {
        Some(spatial)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel() {
        assert_eq!(numel(&[]), 1);
        assert_eq!(numel(&[4]), 4);
        assert_eq!(numel(&[1, 3, 192, 640]), 368640);
    }

    #[test]
    fn test_spatial_dims() {
        assert_eq!(spatial_dims(&[1, 3, 192, 640]), Some(&[192, 640][..]));
        assert!(spatial_dims(&[1, 3]).is_none());
        assert!(spatial_dims(&[1, 3, -1, 640]).is_none());
    }
}

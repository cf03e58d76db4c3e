use crate::math::Matrix;

/// N-dimensional tensor backed by a flat `Vec<f32>`.
///
/// The shape is stored explicitly so the same type covers image tensors
/// (`[1, H, W, 3]`, NHWC), feature maps (`[1, h, w, d]`) and Gram
/// matrices (`[1, d, d]`). The NHWC layout means the flat data of a
/// feature map already reads as a `(h*w, d)` row-major matrix, which the
/// Gram reduction exploits directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Tensor elements in row-major order.
    pub data: Vec<f32>,
    /// Sizes for each dimension.
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor from raw parts.  The number of elements in
    /// `data` must match the product of the requested `shape`.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        assert_eq!(data.len(), shape.iter().product::<usize>());
        Tensor { data, shape }
    }

    /// Take ownership of a [`Matrix`], recording its 2-D shape.
    pub fn from_matrix(m: Matrix) -> Self {
        Tensor {
            shape: vec![m.rows, m.cols],
            data: m.data,
        }
    }

    /// Compute the flat index for a multi-dimensional coordinate.
    fn offset(&self, idx: &[usize]) -> usize {
        assert_eq!(idx.len(), self.shape.len());
        let mut stride = 1;
        let mut off = 0usize;
        for (i, &dim) in self.shape.iter().rev().enumerate() {
            let id = idx[self.shape.len() - 1 - i];
            assert!(id < dim, "index out of bounds");
            off += id * stride;
            stride *= dim;
        }
        off
    }

    /// Basic immutable indexing.
    pub fn get(&self, idx: &[usize]) -> f32 {
        let off = self.offset(idx);
        self.data[off]
    }

    /// Mutable indexing support.
    pub fn set(&mut self, idx: &[usize], value: f32) {
        let off = self.offset(idx);
        self.data[off] = value;
    }

    /// Change the view of the underlying data without modifying order.
    /// The new shape must contain the same number of elements.
    pub fn reshape(&mut self, new_shape: Vec<usize>) {
        assert_eq!(self.data.len(), new_shape.iter().product::<usize>());
        self.shape = new_shape;
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Create a tensor of zeros with the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        Tensor {
            data: vec![0.0; len],
            shape,
        }
    }

    /// Create a tensor of zeros matching the shape of `other`.
    pub fn zeros_like(other: &Tensor) -> Self {
        Tensor {
            data: vec![0.0; other.data.len()],
            shape: other.shape.clone(),
        }
    }

    /// Elementwise accumulate `other` into `self`.  Shapes must match.
    pub fn add_in_place(&mut self, other: &Tensor) {
        assert_eq!(self.shape, other.shape, "shape mismatch in add");
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }

    /// Multiply every element by `k` in place.
    pub fn scale_in_place(&mut self, k: f32) {
        for v in self.data.iter_mut() {
            *v *= k;
        }
    }

    /// Clamp every element into `[lo, hi]` in place.  Applied to the
    /// synthesized image after each optimization step.
    pub fn clamp_in_place(&mut self, lo: f32, hi: f32) {
        for v in self.data.iter_mut() {
            *v = v.clamp(lo, hi);
        }
    }
}

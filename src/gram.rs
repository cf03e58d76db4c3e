use crate::math::Matrix;
use crate::tensor::Tensor;

/// Gram matrix of a feature map: the channel-channel correlation used as
/// the style signature.
///
/// For a `[1, h, w, d]` feature map the NHWC data already reads as the
/// `(h*w, d)` matrix `M` of per-position channel vectors.  The Gram
/// matrix is `Mᵗ·M` with every entry divided by `h*w`, returned as
/// `[1, d, d]`.  The exact same reduction runs on the fixed style target
/// and on the live synthesized image every step; the shared normalizer
/// is what keeps the two comparable.
pub fn gram(feature_map: &Tensor) -> Tensor {
    let (h, w, d) = (
        feature_map.shape[1],
        feature_map.shape[2],
        feature_map.shape[3],
    );
    let m = Matrix::from_vec(h * w, d, feature_map.data.clone());
    let mut g = Matrix::matmul(&m.transpose(), &m);
    g.scale(1.0 / (h * w) as f32);
    let mut out = Tensor::from_matrix(g);
    out.reshape(vec![1, d, d]);
    out
}

/// Gradient of a scalar loss with respect to the feature map, given the
/// gradient `grad_gram` with respect to its Gram matrix.
///
/// With `G = Mᵗ·M / (h*w)` the closed form is
/// `dL/dM = M · (dG + dGᵗ) / (h*w)`, reshaped back to NHWC.
pub fn gram_input_grad(feature_map: &Tensor, grad_gram: &Tensor) -> Tensor {
    let (h, w, d) = (
        feature_map.shape[1],
        feature_map.shape[2],
        feature_map.shape[3],
    );
    let m = Matrix::from_vec(h * w, d, feature_map.data.clone());
    let dg = Matrix::from_vec(d, d, grad_gram.data.clone());
    let dgt = dg.transpose();
    let mut sym = dg;
    for (a, &b) in sym.data.iter_mut().zip(dgt.data.iter()) {
        *a += b;
    }
    let mut grad_m = Matrix::matmul(&m, &sym);
    grad_m.scale(1.0 / (h * w) as f32);
    Tensor::new(grad_m.data, feature_map.shape.clone())
}

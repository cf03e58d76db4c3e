use crate::tensor::Tensor;

/// 2D max pooling over an NHWC tensor.
///
/// `input` has shape `[1, h, w, c]`; the pool runs independently per
/// channel.  Returns the pooled `[1, out_h, out_w, c]` tensor and, for
/// each output element, the flat index of the winning input element so
/// the backward pass can scatter gradients without recomputing maxima.
/// The input spatial size must be at least `kernel` in both dimensions.
pub fn max_pool2d(input: &Tensor, kernel: usize, stride: usize) -> (Tensor, Vec<usize>) {
    let (h, w, c) = (input.shape[1], input.shape[2], input.shape[3]);
    assert!(h >= kernel && w >= kernel, "input smaller than pool window");
    let out_h = (h - kernel) / stride + 1;
    let out_w = (w - kernel) / stride + 1;
    let mut out = vec![0.0; out_h * out_w * c];
    let mut indices = vec![0usize; out_h * out_w * c];
    let mut idx = 0;
    for oh in 0..out_h {
        for ow in 0..out_w {
            for ch in 0..c {
                let mut best = f32::NEG_INFINITY;
                let mut best_idx = 0usize;
                for kh in 0..kernel {
                    for kw in 0..kernel {
                        let ih = oh * stride + kh;
                        let iw = ow * stride + kw;
                        let flat = (ih * w + iw) * c + ch;
                        let val = input.data[flat];
                        if val > best {
                            best = val;
                            best_idx = flat;
                        }
                    }
                }
                out[idx] = best;
                indices[idx] = best_idx;
                idx += 1;
            }
        }
    }
    (Tensor::new(out, vec![1, out_h, out_w, c]), indices)
}

/// Backward pass for [`max_pool2d`]: route each output gradient to the
/// input position that won its window.
pub fn max_pool2d_backward(grad: &Tensor, indices: &[usize], input_shape: &[usize]) -> Tensor {
    let mut grad_in = Tensor::zeros(input_shape.to_vec());
    for (g, &idx) in grad.data.iter().zip(indices.iter()) {
        grad_in.data[idx] += g;
    }
    grad_in
}

use crate::tensor::Tensor;

/// ReLU activation on a tensor.
pub fn forward(t: &Tensor) -> Tensor {
    let mut out = t.clone();
    for v in out.data.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
    out
}

/// Mask the gradient with the activation pattern of the forward pass.
///
/// `output` is the tensor `forward` produced; positions it zeroed pass no
/// gradient.
pub fn backward(grad: &mut Tensor, output: &Tensor) {
    for (g, &o) in grad.data.iter_mut().zip(output.data.iter()) {
        if o <= 0.0 {
            *g = 0.0;
        }
    }
}

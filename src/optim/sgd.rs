use super::Optimizer;
use crate::tensor::Tensor;

/// Plain gradient descent.
pub struct Sgd {
    pub lr: f32,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, var: &mut Tensor, grad: &Tensor) {
        for (v, &g) in var.data.iter_mut().zip(grad.data.iter()) {
            *v -= self.lr * g;
        }
    }
}

pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::tensor::Tensor;

/// Common interface for optimizers driving the synthesized image.
///
/// Unlike a training optimizer this updates exactly one variable: the
/// image tensor the transfer loop owns.  Implementations keep whatever
/// per-element state they need sized lazily from the first step.
pub trait Optimizer {
    /// Apply one update to `var` given the gradient of the loss.
    fn step(&mut self, var: &mut Tensor, grad: &Tensor);
}

use crate::tensor::Tensor;
use std::fmt;

/// Factor applied to `[0, 1]` image tensors before they enter the
/// network.  The pretrained-network convention this engine follows
/// expects inputs in `[0, 255]`; the backward pass applies the same
/// factor by the chain rule.
pub const INPUT_SCALE: f32 = 255.0;

/// Errors raised while resolving layers or running the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// A requested layer name does not exist in the network.
    UnknownLayer { name: String },
    /// The forward pass failed inside the named layer.
    Forward { layer: String, reason: String },
    /// The number of tap gradients does not match the number of taps.
    TapMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnknownLayer { name } => {
                write!(f, "layer '{}' does not exist in the network", name)
            }
            ExtractError::Forward { layer, reason } => {
                write!(f, "forward pass failed at layer '{}': {}", layer, reason)
            }
            ExtractError::TapMismatch { expected, actual } => {
                write!(f, "got {} tap gradients, expected {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Activations recorded during a forward pass.
///
/// `tapped` holds the activations at the requested layers in request
/// order; `activations` holds every intermediate up to the deepest tap
/// (`activations[0]` is the scaled network input, `activations[i + 1]`
/// the output of layer `i`) so the vector-Jacobian product can walk the
/// stack back down without re-running the forward pass.
pub struct ForwardTrace {
    pub tapped: Vec<Tensor>,
    pub activations: Vec<Tensor>,
}

/// Capability exposed by the injected frozen network.
///
/// The engine treats implementations as read-only: no method takes
/// `&mut self` and nothing in a transfer run mutates the network, so a
/// single instance can serve concurrent runs.
pub trait FeatureNetwork {
    /// Ordered names of every layer in the network.
    fn layer_names(&self) -> &[String];

    /// Run the network up to the deepest tap, recording the trace needed
    /// for [`FeatureNetwork::input_grad`].  `taps` are indices into
    /// [`FeatureNetwork::layer_names`]; tapped activations are returned
    /// in the same order.
    fn forward_traced(&self, input: &Tensor, taps: &[usize]) -> Result<ForwardTrace, ExtractError>;

    /// Vector-Jacobian product: propagate `tap_grads` (one per tap, same
    /// order) back to the network input of the traced forward pass.
    fn input_grad(
        &self,
        trace: &ForwardTrace,
        taps: &[usize],
        tap_grads: &[Tensor],
    ) -> Result<Tensor, ExtractError>;

    /// Tap activations only, for target computation where no backward
    /// pass will follow.
    fn predict(&self, input: &Tensor, taps: &[usize]) -> Result<Vec<Tensor>, ExtractError> {
        Ok(self.forward_traced(input, taps)?.tapped)
    }
}

/// Adapter binding an ordered set of layer names to their indices.
///
/// Name resolution happens exactly once, at construction; every
/// subsequent call reuses the resolved taps.  Rebuilding the adapter per
/// step would be correct but is a severe performance regression, which is
/// why the transfer loop holds one extractor per layer set for its whole
/// life.
#[derive(Debug)]
pub struct FeatureExtractor {
    taps: Vec<usize>,
}

impl FeatureExtractor {
    /// Resolve `layers` against the network's layer names.
    pub fn new<N: FeatureNetwork>(net: &N, layers: &[String]) -> Result<Self, ExtractError> {
        let names = net.layer_names();
        let mut taps = Vec::with_capacity(layers.len());
        for name in layers {
            let idx = names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| ExtractError::UnknownLayer { name: name.clone() })?;
            taps.push(idx);
        }
        Ok(Self { taps })
    }

    fn scaled(image: &Tensor) -> Tensor {
        let mut input = image.clone();
        input.scale_in_place(INPUT_SCALE);
        input
    }

    /// Activations at the configured layers for `image`, in request
    /// order.  Used once per run to compute targets.
    pub fn extract<N: FeatureNetwork>(
        &self,
        net: &N,
        image: &Tensor,
    ) -> Result<Vec<Tensor>, ExtractError> {
        net.predict(&Self::scaled(image), &self.taps)
    }

    /// Traced forward pass for `image`, keeping what the backward pass
    /// needs.
    pub fn extract_traced<N: FeatureNetwork>(
        &self,
        net: &N,
        image: &Tensor,
    ) -> Result<ForwardTrace, ExtractError> {
        net.forward_traced(&Self::scaled(image), &self.taps)
    }

    /// Gradient of the loss with respect to the `[0, 1]` image, given the
    /// gradients at the tapped activations.
    pub fn backward<N: FeatureNetwork>(
        &self,
        net: &N,
        trace: &ForwardTrace,
        tap_grads: &[Tensor],
    ) -> Result<Tensor, ExtractError> {
        let mut grad = net.input_grad(trace, &self.taps, tap_grads)?;
        // Chain rule through the input scaling.
        grad.scale_in_place(INPUT_SCALE);
        Ok(grad)
    }
}

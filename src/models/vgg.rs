use crate::extractor::{ExtractError, FeatureNetwork, ForwardTrace};
use crate::layers::{max_pool2d, max_pool2d_backward, relu, Conv2d};
use crate::rng::{rng_from_env, rng_from_seed};
use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// A VGG style feature network with frozen random weights.
///
/// The network is composed of blocks of convolution + ReLU layers
/// followed by a 2x2 max pooling operation.  `blocks` configures how many
/// convolutions each block holds, so `[2, 2, 3, 3, 3]` yields the VGG16
/// trunk and `[2, 2, 4, 4, 4]` VGG19.  Layers are named after the VGG
/// convention used by pretrained checkpoints: `block1_conv1`,
/// `block1_relu1`, `block1_pool`, `block2_conv1`, ...  There is no
/// classification head; the engine only ever reads intermediate
/// activations.
///
/// Weights are drawn once at construction and never updated.  This makes
/// the type a stand-in for a real pretrained checkpoint: the style
/// transfer math is identical, only the texture statistics it matches
/// differ.
pub struct VggFeatures {
    names: Vec<String>,
    ops: Vec<Op>,
}

enum Op {
    Conv(Conv2d),
    Relu,
    Pool { kernel: usize, stride: usize },
}

impl VggFeatures {
    /// Build a network seeded from the `SEED` environment variable.
    pub fn new(blocks: &[usize]) -> Self {
        Self::build(blocks, &mut rng_from_env())
    }

    /// Build a network from an explicit seed, for reproducible fixtures.
    pub fn with_seed(blocks: &[usize], seed: u64) -> Self {
        Self::build(blocks, &mut rng_from_seed(seed))
    }

    fn build(blocks: &[usize], rng: &mut StdRng) -> Self {
        let mut names = Vec::new();
        let mut ops = Vec::new();
        let mut in_channels = 3usize;
        for (b, &num_layers) in blocks.iter().enumerate() {
            let out_channels = 8 << b; // keep the reference network small
            for l in 0..num_layers {
                names.push(format!("block{}_conv{}", b + 1, l + 1));
                ops.push(Op::Conv(Conv2d::new(in_channels, out_channels, 3, 1, 1, rng)));
                in_channels = out_channels;
                names.push(format!("block{}_relu{}", b + 1, l + 1));
                ops.push(Op::Relu);
            }
            names.push(format!("block{}_pool", b + 1));
            ops.push(Op::Pool { kernel: 2, stride: 2 });
        }
        Self { names, ops }
    }

    fn apply(&self, i: usize, x: &Tensor) -> Result<Tensor, ExtractError> {
        match &self.ops[i] {
            Op::Conv(conv) => conv.forward(x).map_err(|e| ExtractError::Forward {
                layer: self.names[i].clone(),
                reason: e.to_string(),
            }),
            Op::Relu => Ok(relu::forward(x)),
            Op::Pool { kernel, stride } => {
                let (h, w) = (x.shape[1], x.shape[2]);
                if h < *kernel || w < *kernel {
                    return Err(ExtractError::Forward {
                        layer: self.names[i].clone(),
                        reason: format!("spatial size {}x{} below pool window {}", h, w, kernel),
                    });
                }
                Ok(max_pool2d(x, *kernel, *stride).0)
            }
        }
    }

    fn apply_backward(&self, i: usize, input: &Tensor, grad: &Tensor) -> Result<Tensor, ExtractError> {
        match &self.ops[i] {
            Op::Conv(conv) => conv.input_grad(input, grad).map_err(|e| ExtractError::Forward {
                layer: self.names[i].clone(),
                reason: e.to_string(),
            }),
            Op::Relu => {
                let output = relu::forward(input);
                let mut g = grad.clone();
                relu::backward(&mut g, &output);
                Ok(g)
            }
            Op::Pool { kernel, stride } => {
                // Recompute the argmax indices from the traced input; the
                // forward pass is deterministic so they match.
                let (_, indices) = max_pool2d(input, *kernel, *stride);
                Ok(max_pool2d_backward(grad, &indices, &input.shape))
            }
        }
    }
}

impl FeatureNetwork for VggFeatures {
    fn layer_names(&self) -> &[String] {
        &self.names
    }

    fn forward_traced(&self, input: &Tensor, taps: &[usize]) -> Result<ForwardTrace, ExtractError> {
        let deepest = match taps.iter().max() {
            Some(&d) => d,
            None => {
                return Ok(ForwardTrace {
                    tapped: Vec::new(),
                    activations: vec![input.clone()],
                })
            }
        };
        let mut activations = Vec::with_capacity(deepest + 2);
        activations.push(input.clone());
        for i in 0..=deepest {
            let next = self.apply(i, &activations[i])?;
            activations.push(next);
        }
        let tapped = taps.iter().map(|&t| activations[t + 1].clone()).collect();
        Ok(ForwardTrace {
            tapped,
            activations,
        })
    }

    fn input_grad(
        &self,
        trace: &ForwardTrace,
        taps: &[usize],
        tap_grads: &[Tensor],
    ) -> Result<Tensor, ExtractError> {
        if tap_grads.len() != taps.len() {
            return Err(ExtractError::TapMismatch {
                expected: taps.len(),
                actual: tap_grads.len(),
            });
        }
        let deepest = match taps.iter().max() {
            Some(&d) => d,
            None => return Ok(Tensor::zeros_like(&trace.activations[0])),
        };
        let mut grad = Tensor::zeros_like(&trace.activations[deepest + 1]);
        for i in (0..=deepest).rev() {
            // Inject the loss gradient wherever this layer was tapped.  A
            // layer may appear more than once in a tap set; every matching
            // gradient accumulates so the backward pass mirrors the loss.
            for (pos, &t) in taps.iter().enumerate() {
                if t == i {
                    grad.add_in_place(&tap_grads[pos]);
                }
            }
            grad = self.apply_backward(i, &trace.activations[i], &grad)?;
        }
        Ok(grad)
    }
}

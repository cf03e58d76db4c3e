use crate::pixels::RGB_CHANNELS;
use crate::tensor::Tensor;

/// Per-term loss breakdown for one optimization step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LossTerms {
    pub style: f32,
    pub content: f32,
    pub tv: f32,
}

impl LossTerms {
    pub fn total(&self) -> f32 {
        self.style + self.content + self.tv
    }
}

/// Scaled mean squared error between `live` and `target` together with
/// its gradient with respect to `live`.
///
/// Both the per-layer style term (over Gram matrices) and the per-layer
/// content term (over feature maps) are this function with different
/// operands and scales.
pub fn mse_loss_grad(live: &Tensor, target: &Tensor, scale: f32) -> (f32, Tensor) {
    assert_eq!(live.shape, target.shape, "loss operands must align");
    let n = live.numel() as f32;
    let mut sum = 0.0f32;
    let mut grad = Tensor::zeros_like(live);
    for (i, (&a, &b)) in live.data.iter().zip(target.data.iter()).enumerate() {
        let d = a - b;
        sum += d * d;
        grad.data[i] = 2.0 * scale * d / n;
    }
    (scale * sum / n, grad)
}

/// Total-variation regularizer: the summed absolute differences between
/// horizontally and vertically adjacent pixels, scaled by `weight`.
///
/// Returns the loss and its gradient with respect to the image.  The
/// gradient of `|d|` is `sign(d)`; every pixel collects `+sign` from the
/// differences where it is the later operand and `-sign` where it is the
/// earlier one.  Exactly zero differences contribute no gradient.
pub fn total_variation_loss_grad(image: &Tensor, weight: f32) -> (f32, Tensor) {
    let (h, w) = (image.shape[1], image.shape[2]);
    let c = RGB_CHANNELS;
    let mut sum = 0.0f32;
    let mut grad = Tensor::zeros_like(image);
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let here = (y * w + x) * c + ch;
                if x + 1 < w {
                    let right = (y * w + x + 1) * c + ch;
                    let d = image.data[right] - image.data[here];
                    sum += d.abs();
                    let s = sign(d);
                    grad.data[right] += weight * s;
                    grad.data[here] -= weight * s;
                }
                if y + 1 < h {
                    let below = ((y + 1) * w + x) * c + ch;
                    let d = image.data[below] - image.data[here];
                    sum += d.abs();
                    let s = sign(d);
                    grad.data[below] += weight * s;
                    grad.data[here] -= weight * s;
                }
            }
        }
    }
    (weight * sum, grad)
}

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

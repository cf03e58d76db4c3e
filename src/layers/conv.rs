use crate::math::Matrix;
use crate::tensor::Tensor;
use rand::Rng;
use std::fmt;

/// 2D convolution over NHWC tensors using im2col and a weight matrix.
///
/// Inputs have shape `[1, h, w, in_channels]`.  The kernel is stored as a
/// `(kernel * kernel * in_channels, out_channels)` matrix so the forward
/// pass is a single matmul whose output rows already lay out the NHWC
/// result.  Weights are frozen for the life of the layer; the backward
/// pass only produces the gradient with respect to the input, which is
/// all the style-transfer loop needs.
pub struct Conv2d {
    pub w: Matrix,
    pub bias: Vec<f32>,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvError {
    ChannelMismatch { channels: usize, in_channels: usize },
    NotSingleBatch { batch: usize },
    BadRank { shape: Vec<usize> },
    TooSmall { height: usize, width: usize, kernel: usize },
}

impl fmt::Display for ConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvError::ChannelMismatch {
                channels,
                in_channels,
            } => write!(
                f,
                "input has {} channels, layer expects {}",
                channels, in_channels
            ),
            ConvError::NotSingleBatch { batch } => {
                write!(f, "batch dimension {} is not 1", batch)
            }
            ConvError::BadRank { shape } => {
                write!(f, "input shape {:?} is not rank-4 NHWC", shape)
            }
            ConvError::TooSmall {
                height,
                width,
                kernel,
            } => write!(
                f,
                "padded input {}x{} is smaller than the {}x{} kernel",
                height, width, kernel, kernel
            ),
        }
    }
}

impl std::error::Error for ConvError {}

impl Conv2d {
    /// Create a convolution layer with uniformly initialized frozen
    /// weights drawn from `rng` and a zero bias.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let fan_in = in_channels * kernel_size * kernel_size;
        // Variance 1/fan_in keeps activation magnitudes stable across a
        // deep stack of frozen layers.
        let lim = (3.0 / fan_in as f32).sqrt();
        let mut w = Vec::with_capacity(fan_in * out_channels);
        for _ in 0..fan_in * out_channels {
            w.push(rng.gen_range(-lim..lim));
        }
        Self {
            w: Matrix::from_vec(fan_in, out_channels, w),
            bias: vec![0.0; out_channels],
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
        }
    }

    fn check_shapes(&self, x: &Tensor) -> Result<(usize, usize, usize, usize), ConvError> {
        let [batch, in_h, in_w, channels] = match x.shape.as_slice() {
            [n, h, w, c] => [*n, *h, *w, *c],
            _ => {
                return Err(ConvError::BadRank {
                    shape: x.shape.clone(),
                })
            }
        };
        if batch != 1 {
            return Err(ConvError::NotSingleBatch { batch });
        }
        if channels != self.in_channels {
            return Err(ConvError::ChannelMismatch {
                channels,
                in_channels: self.in_channels,
            });
        }
        if in_h + 2 * self.padding < self.kernel_size || in_w + 2 * self.padding < self.kernel_size
        {
            return Err(ConvError::TooSmall {
                height: in_h,
                width: in_w,
                kernel: self.kernel_size,
            });
        }
        let out_h = (in_h + 2 * self.padding - self.kernel_size) / self.stride + 1;
        let out_w = (in_w + 2 * self.padding - self.kernel_size) / self.stride + 1;
        Ok((in_h, in_w, out_h, out_w))
    }

    fn im2col(&self, x: &Tensor, in_h: usize, in_w: usize, out_h: usize, out_w: usize) -> Matrix {
        let k = self.kernel_size;
        let ic = self.in_channels;
        let mut cols = Matrix::zeros(out_h * out_w, k * k * ic);
        let mut row = 0;
        for oh in 0..out_h {
            for ow in 0..out_w {
                let mut col_idx = 0;
                for kh in 0..k {
                    for kw in 0..k {
                        let ih = (oh * self.stride + kh) as isize - self.padding as isize;
                        let iw = (ow * self.stride + kw) as isize - self.padding as isize;
                        let inside =
                            ih >= 0 && ih < in_h as isize && iw >= 0 && iw < in_w as isize;
                        for c in 0..ic {
                            let val = if inside {
                                x.data[(ih as usize * in_w + iw as usize) * ic + c]
                            } else {
                                0.0
                            };
                            cols.set(row, col_idx, val);
                            col_idx += 1;
                        }
                    }
                }
                row += 1;
            }
        }
        cols
    }

    /// Forward pass: `[1, h, w, in_c]` -> `[1, out_h, out_w, out_c]`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ConvError> {
        let (in_h, in_w, out_h, out_w) = self.check_shapes(x)?;
        let cols = self.im2col(x, in_h, in_w, out_h, out_w);
        let mut out = Matrix::matmul(&cols, &self.w);
        for r in 0..out.rows {
            for (c, &b) in self.bias.iter().enumerate() {
                out.data[r * out.cols + c] += b;
            }
        }
        Ok(Tensor::new(
            out.data,
            vec![1, out_h, out_w, self.out_channels],
        ))
    }

    /// Gradient with respect to the input, given the gradient at the
    /// output.  `input` is the tensor the matching forward pass saw; only
    /// its shape drives the col2im scatter since the weights are frozen.
    pub fn input_grad(&self, input: &Tensor, grad_out: &Tensor) -> Result<Tensor, ConvError> {
        let (in_h, in_w, out_h, out_w) = self.check_shapes(input)?;
        let g = Matrix::from_vec(out_h * out_w, self.out_channels, grad_out.data.clone());
        let grad_cols = Matrix::matmul(&g, &self.w.transpose());

        let k = self.kernel_size;
        let ic = self.in_channels;
        let mut grad_in = Tensor::zeros_like(input);
        let mut row = 0;
        for oh in 0..out_h {
            for ow in 0..out_w {
                let mut col_idx = 0;
                for kh in 0..k {
                    for kw in 0..k {
                        let ih = (oh * self.stride + kh) as isize - self.padding as isize;
                        let iw = (ow * self.stride + kw) as isize - self.padding as isize;
                        let inside =
                            ih >= 0 && ih < in_h as isize && iw >= 0 && iw < in_w as isize;
                        for c in 0..ic {
                            if inside {
                                let idx = (ih as usize * in_w + iw as usize) * ic + c;
                                grad_in.data[idx] += grad_cols.get(row, col_idx);
                            }
                            col_idx += 1;
                        }
                    }
                }
                row += 1;
            }
        }
        Ok(grad_in)
    }
}

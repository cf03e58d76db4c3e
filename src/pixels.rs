use crate::tensor::Tensor;
use std::fmt;

/// Number of color channels the engine works with.
pub const RGB_CHANNELS: usize = 3;

/// Errors produced while converting between pixel buffers and tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelError {
    /// The source image has a zero width or height.
    EmptySource { width: usize, height: usize },
    /// The requested target size is zero.
    InvalidTarget { size: usize },
    /// The pixel buffer length does not match `width * height * 3`.
    LengthMismatch { expected: usize, actual: usize },
    /// The tensor is not shaped like a `[1, H, W, 3]` image.
    NotImageShaped { shape: Vec<usize> },
}

impl fmt::Display for PixelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelError::EmptySource { width, height } => {
                write!(f, "source image has empty dimension {}x{}", width, height)
            }
            PixelError::InvalidTarget { size } => {
                write!(f, "target size {} must be positive", size)
            }
            PixelError::LengthMismatch { expected, actual } => write!(
                f,
                "pixel buffer holds {} bytes, expected {}",
                actual, expected
            ),
            PixelError::NotImageShaped { shape } => {
                write!(f, "tensor shape {:?} is not a [1, H, W, 3] image", shape)
            }
        }
    }
}

impl std::error::Error for PixelError {}

/// Resize an RGB8 image to `target x target` with bilinear interpolation,
/// scale to `[0, 1]` and add the leading batch dimension.
///
/// `rgb` is row-major, three bytes per pixel.  The result has shape
/// `[1, target, target, 3]`.
pub fn to_normalized_tensor(
    rgb: &[u8],
    width: usize,
    height: usize,
    target: usize,
) -> Result<Tensor, PixelError> {
    if width == 0 || height == 0 {
        return Err(PixelError::EmptySource { width, height });
    }
    if target == 0 {
        return Err(PixelError::InvalidTarget { size: target });
    }
    let expected = width * height * RGB_CHANNELS;
    if rgb.len() != expected {
        return Err(PixelError::LengthMismatch {
            expected,
            actual: rgb.len(),
        });
    }

    let mut data = vec![0.0f32; target * target * RGB_CHANNELS];
    let x_scale = width as f32 / target as f32;
    let y_scale = height as f32 / target as f32;
    for ty in 0..target {
        // Sample at pixel centers so up- and downscaling stay symmetric.
        let sy = ((ty as f32 + 0.5) * y_scale - 0.5).clamp(0.0, (height - 1) as f32);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = sy - y0 as f32;
        for tx in 0..target {
            let sx = ((tx as f32 + 0.5) * x_scale - 0.5).clamp(0.0, (width - 1) as f32);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = sx - x0 as f32;
            for c in 0..RGB_CHANNELS {
                let p00 = rgb[(y0 * width + x0) * RGB_CHANNELS + c] as f32;
                let p01 = rgb[(y0 * width + x1) * RGB_CHANNELS + c] as f32;
                let p10 = rgb[(y1 * width + x0) * RGB_CHANNELS + c] as f32;
                let p11 = rgb[(y1 * width + x1) * RGB_CHANNELS + c] as f32;
                let top = p00 + (p01 - p00) * fx;
                let bottom = p10 + (p11 - p10) * fx;
                let value = top + (bottom - top) * fy;
                data[(ty * target + tx) * RGB_CHANNELS + c] = value / 255.0;
            }
        }
    }
    Ok(Tensor::new(
        data,
        vec![1, target, target, RGB_CHANNELS],
    ))
}

/// Convert a `[1, H, W, 3]` tensor in `[0, 1]` into a row-major RGBA byte
/// buffer of length `H * W * 4` with an opaque alpha channel.
///
/// The inverse of [`to_normalized_tensor`] up to rounding; values outside
/// `[0, 1]` are clamped rather than wrapped.
pub fn to_pixel_buffer(t: &Tensor) -> Result<Vec<u8>, PixelError> {
    let [n, h, w, c] = match t.shape.as_slice() {
        [n, h, w, c] => [*n, *h, *w, *c],
        _ => {
            return Err(PixelError::NotImageShaped {
                shape: t.shape.clone(),
            })
        }
    };
    if n != 1 || c != RGB_CHANNELS {
        return Err(PixelError::NotImageShaped {
            shape: t.shape.clone(),
        });
    }
    let mut out = Vec::with_capacity(h * w * 4);
    for px in t.data.chunks_exact(RGB_CHANNELS) {
        for &v in px {
            out.push((v * 255.0).round().clamp(0.0, 255.0) as u8);
        }
        out.push(255);
    }
    Ok(out)
}

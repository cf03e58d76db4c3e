use neuralstyle::pixels::{to_normalized_tensor, to_pixel_buffer, PixelError};
use neuralstyle::tensor::Tensor;

fn solid(width: usize, height: usize, color: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(width * height * 3);
    for _ in 0..width * height {
        rgb.extend_from_slice(&color);
    }
    rgb
}

#[test]
fn normalization_shapes_and_range() {
    let rgb = solid(10, 6, [128, 0, 255]);
    let t = to_normalized_tensor(&rgb, 10, 6, 8).unwrap();
    assert_eq!(t.shape, vec![1, 8, 8, 3]);
    assert!(t.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn solid_color_round_trips() {
    let color = [37u8, 142, 209];
    let rgb = solid(12, 12, color);
    let t = to_normalized_tensor(&rgb, 12, 12, 5).unwrap();
    let buf = to_pixel_buffer(&t).unwrap();
    assert_eq!(buf.len(), 5 * 5 * 4);
    for px in buf.chunks_exact(4) {
        for c in 0..3 {
            assert!(
                (px[c] as i16 - color[c] as i16).abs() <= 1,
                "channel {} drifted: {} vs {}",
                c,
                px[c],
                color[c]
            );
        }
        assert_eq!(px[3], 255);
    }
}

#[test]
fn same_size_resize_is_identity() {
    let rgb: Vec<u8> = (0..4 * 4 * 3).map(|i| (i * 5 % 256) as u8).collect();
    let t = to_normalized_tensor(&rgb, 4, 4, 4).unwrap();
    let buf = to_pixel_buffer(&t).unwrap();
    for (i, px) in buf.chunks_exact(4).enumerate() {
        assert_eq!(&px[..3], &rgb[i * 3..i * 3 + 3]);
    }
}

#[test]
fn rejects_empty_source() {
    assert!(matches!(
        to_normalized_tensor(&[], 0, 4, 8),
        Err(PixelError::EmptySource { .. })
    ));
    assert!(matches!(
        to_normalized_tensor(&[], 4, 0, 8),
        Err(PixelError::EmptySource { .. })
    ));
}

#[test]
fn rejects_zero_target() {
    let rgb = solid(2, 2, [1, 2, 3]);
    assert!(matches!(
        to_normalized_tensor(&rgb, 2, 2, 0),
        Err(PixelError::InvalidTarget { size: 0 })
    ));
}

#[test]
fn rejects_short_buffer() {
    let rgb = solid(2, 2, [1, 2, 3]);
    assert!(matches!(
        to_normalized_tensor(&rgb[..7], 2, 2, 2),
        Err(PixelError::LengthMismatch {
            expected: 12,
            actual: 7
        })
    ));
}

#[test]
fn pixel_buffer_rejects_non_image_tensor() {
    let t = Tensor::zeros(vec![1, 4, 4]);
    assert!(matches!(
        to_pixel_buffer(&t),
        Err(PixelError::NotImageShaped { .. })
    ));
    let t = Tensor::zeros(vec![2, 4, 4, 3]);
    assert!(matches!(
        to_pixel_buffer(&t),
        Err(PixelError::NotImageShaped { .. })
    ));
}

#[test]
fn out_of_range_values_clamp() {
    let mut t = Tensor::zeros(vec![1, 1, 2, 3]);
    t.data = vec![-0.5, 0.5, 1.5, 0.0, 1.0, 2.0];
    let buf = to_pixel_buffer(&t).unwrap();
    assert_eq!(&buf[..4], &[0, 128, 255, 255]);
    assert_eq!(&buf[4..], &[0, 255, 255, 255]);
}

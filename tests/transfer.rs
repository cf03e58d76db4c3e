use neuralstyle::config::{OptimizerKind, TransferConfig};
use neuralstyle::extractor::{ExtractError, FeatureNetwork, ForwardTrace};
use neuralstyle::layers::Conv2d;
use neuralstyle::math::Matrix;
use neuralstyle::models::VggFeatures;
use neuralstyle::rng::rng_from_seed;
use neuralstyle::tensor::Tensor;
use neuralstyle::transfer::{StyleTransfer, TransferError, TransferOutcome, TransferSignal};

/// Single 1x1 identity convolution, so feature maps equal the scaled
/// input and style statistics are plain channel correlations.
struct FlatNet {
    names: Vec<String>,
    conv: Conv2d,
}

impl FlatNet {
    fn new() -> Self {
        let mut rng = rng_from_seed(0);
        let mut conv = Conv2d::new(3, 3, 1, 1, 0, &mut rng);
        let mut w = Matrix::zeros(3, 3);
        for c in 0..3 {
            w.set(c, c, 1.0);
        }
        conv.w = w;
        conv.bias = vec![0.0; 3];
        Self {
            names: vec!["block1_conv1".to_string()],
            conv,
        }
    }

    fn wrap(&self, e: neuralstyle::layers::ConvError) -> ExtractError {
        ExtractError::Forward {
            layer: self.names[0].clone(),
            reason: e.to_string(),
        }
    }
}

impl FeatureNetwork for FlatNet {
    fn layer_names(&self) -> &[String] {
        &self.names
    }

    fn forward_traced(&self, input: &Tensor, taps: &[usize]) -> Result<ForwardTrace, ExtractError> {
        let out = self.conv.forward(input).map_err(|e| self.wrap(e))?;
        let activations = vec![input.clone(), out];
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
        self.conv
            .input_grad(&trace.activations[0], &tap_grads[0])
            .map_err(|e| self.wrap(e))
    }
}

fn solid(size: usize, color: [f32; 3]) -> Tensor {
    let mut data = Vec::with_capacity(size * size * 3);
    for _ in 0..size * size {
        data.extend_from_slice(&color);
    }
    Tensor::new(data, vec![1, size, size, 3])
}

fn flat_config(size: usize) -> TransferConfig {
    TransferConfig {
        image_size: size,
        content_layers: vec!["block1_conv1".to_string()],
        style_layers: vec!["block1_conv1".to_string()],
        ..TransferConfig::default()
    }
}

fn small_vgg_config(size: usize) -> TransferConfig {
    TransferConfig {
        image_size: size,
        content_layers: vec!["block2_conv1".to_string()],
        style_layers: vec!["block1_conv1".to_string(), "block2_conv1".to_string()],
        ..TransferConfig::default()
    }
}

fn gradient_image(size: usize) -> Tensor {
    let mut t = Tensor::zeros(vec![1, size, size, 3]);
    for y in 0..size {
        for x in 0..size {
            let v = (y * size + x) as f32 / (size * size) as f32;
            t.set(&[0, y, x, 0], v);
            t.set(&[0, y, x, 1], 1.0 - v);
            t.set(&[0, y, x, 2], 0.5);
        }
    }
    t
}

#[test]
fn loss_is_zero_at_the_trivial_fixed_point() {
    // Content and style are the same image, the synthesized image starts
    // there, and tv is disabled, so every term sits at its minimum.
    let mut config = flat_config(8);
    config.epochs = 2;
    config.steps_per_epoch = 2;
    config.tv_weight = 0.0;
    let engine = StyleTransfer::new(FlatNet::new(), config).unwrap();
    let image = gradient_image(8);
    let outcome = engine
        .run(&image, &image, |report| {
            assert!(report.loss.total().abs() < 1e-6);
            TransferSignal::Continue
        })
        .unwrap();
    match outcome {
        TransferOutcome::Completed(final_image) => assert_eq!(final_image, image),
        TransferOutcome::Cancelled => panic!("run was not cancelled"),
    }
}

#[test]
fn loss_does_not_increase_over_a_short_run() {
    let mut config = small_vgg_config(16);
    config.epochs = 3;
    config.steps_per_epoch = 5;
    config.learning_rate = 0.005;
    let net = VggFeatures::with_seed(&[1, 1], 42);
    let engine = StyleTransfer::new(net, config).unwrap();
    let content = gradient_image(16);
    let style = solid(16, [0.9, 0.2, 0.1]);
    let mut losses = Vec::new();
    engine
        .run(&content, &style, |report| {
            losses.push(report.loss.total());
            assert!(report.image.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
            TransferSignal::Continue
        })
        .unwrap();
    assert_eq!(losses.len(), 3);
    for pair in losses.windows(2) {
        assert!(
            pair[1] <= pair[0] * 1.05,
            "loss increased across an epoch: {:?}",
            losses
        );
    }
    assert!(
        losses[2] < losses[0],
        "loss failed to improve: {:?}",
        losses
    );
}

#[test]
fn runs_are_deterministic() {
    let content = gradient_image(8);
    let style = solid(8, [0.1, 0.1, 0.9]);
    let run = || {
        let mut config = small_vgg_config(8);
        config.epochs = 2;
        config.steps_per_epoch = 2;
        let engine = StyleTransfer::new(VggFeatures::with_seed(&[1, 1], 9), config).unwrap();
        match engine
            .run(&content, &style, |_| TransferSignal::Continue)
            .unwrap()
        {
            TransferOutcome::Completed(image) => image,
            TransferOutcome::Cancelled => panic!("not cancelled"),
        }
    };
    assert_eq!(run(), run());
}

#[test]
fn style_pull_raises_the_blue_channel() {
    // Gray content, blue style: matching the style Gram statistics must
    // visibly push pixels toward blue while staying inside [0, 1].
    let mut config = flat_config(112);
    config.style_weight = 100.0;
    config.content_weight = 1.0;
    config.epochs = 1;
    config.steps_per_epoch = 10;
    let engine = StyleTransfer::new(FlatNet::new(), config).unwrap();
    let content = solid(112, [0.5, 0.5, 0.5]);
    let style = solid(112, [0.0, 0.0, 1.0]);
    let outcome = engine
        .run(&content, &style, |_| TransferSignal::Continue)
        .unwrap();
    let image = match outcome {
        TransferOutcome::Completed(image) => image,
        TransferOutcome::Cancelled => panic!("not cancelled"),
    };
    assert!(image.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    let channel_mean = |c: usize| -> f32 {
        let n = (image.numel() / 3) as f32;
        image.data.iter().skip(c).step_by(3).sum::<f32>() / n
    };
    let blue = channel_mean(2);
    let red = channel_mean(0);
    assert!(blue > 0.5, "blue mean {} did not rise above 0.5", blue);
    assert!(blue > red, "blue {} should outgrow red {}", blue, red);
}

#[test]
fn progress_is_monotonic_and_ends_at_exactly_100() {
    let mut config = small_vgg_config(8);
    config.epochs = 4;
    config.steps_per_epoch = 1;
    let engine = StyleTransfer::new(VggFeatures::with_seed(&[1, 1], 2), config).unwrap();
    let content = gradient_image(8);
    let style = solid(8, [0.2, 0.8, 0.3]);
    let mut percents = Vec::new();
    engine
        .run(&content, &style, |report| {
            percents.push(report.percent);
            TransferSignal::Continue
        })
        .unwrap();
    assert_eq!(percents, vec![25.0, 50.0, 75.0, 100.0]);
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert_eq!(percents.iter().filter(|&&p| p == 100.0).count(), 1);
}

#[test]
fn cancel_stops_between_epochs() {
    let mut config = small_vgg_config(8);
    config.epochs = 10;
    config.steps_per_epoch = 1;
    let engine = StyleTransfer::new(VggFeatures::with_seed(&[1, 1], 2), config).unwrap();
    let content = gradient_image(8);
    let style = solid(8, [0.2, 0.8, 0.3]);
    let mut calls = 0;
    let outcome = engine
        .run(&content, &style, |_| {
            calls += 1;
            TransferSignal::Cancel
        })
        .unwrap();
    assert!(matches!(outcome, TransferOutcome::Cancelled));
    assert_eq!(calls, 1);
}

#[test]
fn unknown_layer_fails_construction() {
    let mut config = flat_config(8);
    config.style_layers = vec!["block7_conv1".to_string()];
    let err = StyleTransfer::new(FlatNet::new(), config).unwrap_err();
    assert!(matches!(
        err,
        TransferError::Extraction(ExtractError::UnknownLayer { .. })
    ));
}

#[test]
fn wrong_image_size_is_invalid_input() {
    let config = flat_config(8);
    let engine = StyleTransfer::new(FlatNet::new(), config).unwrap();
    let content = solid(4, [0.5; 3]);
    let style = solid(8, [0.5; 3]);
    let err = engine
        .run(&content, &style, |_| TransferSignal::Continue)
        .unwrap_err();
    assert!(matches!(err, TransferError::InvalidInput(_)));
}

#[test]
fn zero_epochs_is_a_config_error() {
    let mut config = flat_config(8);
    config.epochs = 0;
    let err = StyleTransfer::new(FlatNet::new(), config).unwrap_err();
    assert!(matches!(err, TransferError::Config(_)));
}

#[test]
fn non_finite_loss_aborts_as_divergence() {
    // A style weight near f32::MAX overflows the style term on the first
    // step; the loop must abort instead of feeding garbage forward.
    let mut config = flat_config(8);
    config.style_weight = 1e38;
    config.epochs = 2;
    config.steps_per_epoch = 2;
    let engine = StyleTransfer::new(FlatNet::new(), config).unwrap();
    let content = solid(8, [0.5, 0.5, 0.5]);
    let style = solid(8, [0.0, 0.0, 1.0]);
    let err = engine
        .run(&content, &style, |_| TransferSignal::Continue)
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Diverged { epoch: 0, step: 0, .. }
    ));
}

#[test]
fn optimizer_kind_is_configurable() {
    let mut config = flat_config(8);
    config.optimizer = OptimizerKind::Sgd;
    config.learning_rate = 1e-9;
    config.epochs = 1;
    config.steps_per_epoch = 1;
    let engine = StyleTransfer::new(FlatNet::new(), config).unwrap();
    let content = solid(8, [0.5, 0.5, 0.5]);
    let style = solid(8, [0.0, 0.0, 1.0]);
    assert!(engine
        .run(&content, &style, |_| TransferSignal::Continue)
        .is_ok());
}

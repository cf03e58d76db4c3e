use crate::config::{ConfigError, TransferConfig};
use crate::extractor::{ExtractError, FeatureExtractor, FeatureNetwork};
use crate::gram::{gram, gram_input_grad};
use crate::loss::{mse_loss_grad, total_variation_loss_grad, LossTerms};
use crate::optim::Optimizer;
use crate::pixels::{PixelError, RGB_CHANNELS};
use crate::tensor::Tensor;
use std::fmt;

/// Terminal failure of a transfer run.  Every variant aborts the run
/// immediately; nothing is retried inside the engine.
#[derive(Debug)]
pub enum TransferError {
    /// A supplied image is malformed or does not match the configured
    /// working resolution.
    InvalidInput(PixelError),
    /// The run configuration violates an invariant.
    Config(ConfigError),
    /// Layer resolution or a network forward pass failed.
    Extraction(ExtractError),
    /// The loss became non-finite during a step.
    Diverged { epoch: usize, step: usize, loss: f32 },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InvalidInput(e) => write!(f, "invalid input image: {}", e),
            TransferError::Config(e) => write!(f, "invalid configuration: {}", e),
            TransferError::Extraction(e) => write!(f, "feature extraction failed: {}", e),
            TransferError::Diverged { epoch, step, loss } => write!(
                f,
                "optimization diverged at epoch {} step {} (loss {})",
                epoch, step, loss
            ),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::InvalidInput(e) => Some(e),
            TransferError::Config(e) => Some(e),
            TransferError::Extraction(e) => Some(e),
            TransferError::Diverged { .. } => None,
        }
    }
}

impl From<PixelError> for TransferError {
    fn from(e: PixelError) -> Self {
        TransferError::InvalidInput(e)
    }
}

impl From<ConfigError> for TransferError {
    fn from(e: ConfigError) -> Self {
        TransferError::Config(e)
    }
}

impl From<ExtractError> for TransferError {
    fn from(e: ExtractError) -> Self {
        TransferError::Extraction(e)
    }
}

/// Returned by the epoch callback to keep the loop running or stop it.
pub enum TransferSignal {
    Continue,
    Cancel,
}

/// How a run ended when no error occurred.
#[derive(Debug)]
pub enum TransferOutcome {
    /// All epochs ran; holds the final synthesized image.
    Completed(Tensor),
    /// The caller cancelled between steps; per-run state was dropped.
    Cancelled,
}

/// Snapshot handed to the epoch callback.
pub struct EpochReport<'a> {
    /// 1-based count of completed epochs.
    pub epoch: usize,
    /// `(epoch / total_epochs) * 100`; exactly 100 on the final epoch.
    pub percent: f32,
    /// Loss breakdown of the last step in this epoch.
    pub loss: LossTerms,
    /// Current synthesized image, values already clipped to `[0, 1]`.
    pub image: &'a Tensor,
}

/// The style-transfer engine: a frozen feature network plus resolved
/// extractors and run configuration.
///
/// Construction resolves the configured layer names exactly once; the
/// resulting extractors are reused by every step of every run.  The
/// engine holds no per-run state, so one instance can serve many
/// sequential runs (or concurrent ones behind a shared reference, since
/// every method takes `&self`).
pub struct StyleTransfer<N: FeatureNetwork> {
    net: N,
    config: TransferConfig,
    style_extractor: FeatureExtractor,
    content_extractor: FeatureExtractor,
}

impl<N: FeatureNetwork> fmt::Debug for StyleTransfer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleTransfer")
            .field("config", &self.config)
            .field("style_extractor", &self.style_extractor)
            .field("content_extractor", &self.content_extractor)
            .finish_non_exhaustive()
    }
}

impl<N: FeatureNetwork> StyleTransfer<N> {
    /// Validate the configuration and resolve both layer sets against
    /// `net`.
    pub fn new(net: N, config: TransferConfig) -> Result<Self, TransferError> {
        config.validate()?;
        let style_extractor = FeatureExtractor::new(&net, &config.style_layers)?;
        let content_extractor = FeatureExtractor::new(&net, &config.content_layers)?;
        Ok(Self {
            net,
            config,
            style_extractor,
            content_extractor,
        })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    fn check_image(&self, image: &Tensor) -> Result<(), TransferError> {
        let s = self.config.image_size;
        if image.shape != [1, s, s, RGB_CHANNELS] {
            return Err(PixelError::NotImageShaped {
                shape: image.shape.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Run one full transfer.
    ///
    /// Targets are computed once from `style` and `content`, then the
    /// synthesized image (initialized to the content tensor) is updated
    /// for `epochs * steps_per_epoch` gradient steps.  After each epoch
    /// `on_epoch` receives a report; returning
    /// [`TransferSignal::Cancel`] stops the run between steps without an
    /// error.  The sequence of images is fully deterministic for fixed
    /// inputs, configuration and network.
    pub fn run<F>(
        &self,
        content: &Tensor,
        style: &Tensor,
        mut on_epoch: F,
    ) -> Result<TransferOutcome, TransferError>
    where
        F: FnMut(&EpochReport<'_>) -> TransferSignal,
    {
        self.check_image(content)?;
        self.check_image(style)?;

        // Targets are fixed for the life of the run.
        let style_targets: Vec<Tensor> = self
            .style_extractor
            .extract(&self.net, style)?
            .iter()
            .map(gram)
            .collect();
        let content_targets = self.content_extractor.extract(&self.net, content)?;

        let mut image = content.clone();
        let mut optimizer = self.config.build_optimizer();

        crate::info!(
            "transfer start: {} epochs x {} steps at {}px",
            self.config.epochs,
            self.config.steps_per_epoch,
            self.config.image_size
        );

        for epoch in 0..self.config.epochs {
            let mut terms = LossTerms::default();
            for step in 0..self.config.steps_per_epoch {
                terms = self.step(
                    &mut image,
                    &style_targets,
                    &content_targets,
                    optimizer.as_mut(),
                    epoch,
                    step,
                )?;
                crate::debug!(
                    "epoch {} step {}: loss {:.6}",
                    epoch + 1,
                    step + 1,
                    terms.total()
                );
            }
            let percent = (epoch + 1) as f32 / self.config.epochs as f32 * 100.0;
            crate::info!(
                "epoch {}/{} done: loss {:.6} ({:.0}%)",
                epoch + 1,
                self.config.epochs,
                terms.total(),
                percent
            );
            let report = EpochReport {
                epoch: epoch + 1,
                percent,
                loss: terms,
                image: &image,
            };
            if let TransferSignal::Cancel = on_epoch(&report) {
                crate::info!("transfer cancelled after epoch {}", epoch + 1);
                return Ok(TransferOutcome::Cancelled);
            }
        }
        Ok(TransferOutcome::Completed(image))
    }

    /// One gradient step: forward passes, loss, hand-derived gradients,
    /// optimizer update, projection back into `[0, 1]`.
    fn step(
        &self,
        image: &mut Tensor,
        style_targets: &[Tensor],
        content_targets: &[Tensor],
        optimizer: &mut dyn Optimizer,
        epoch: usize,
        step: usize,
    ) -> Result<LossTerms, TransferError> {
        let style_trace = self.style_extractor.extract_traced(&self.net, image)?;
        let content_trace = self.content_extractor.extract_traced(&self.net, image)?;

        let style_scale = self.config.style_weight / style_targets.len() as f32;
        let mut style_loss = 0.0f32;
        let mut style_grads = Vec::with_capacity(style_targets.len());
        for (fm, target) in style_trace.tapped.iter().zip(style_targets.iter()) {
            let live = gram(fm);
            let (l, dg) = mse_loss_grad(&live, target, style_scale);
            style_loss += l;
            style_grads.push(gram_input_grad(fm, &dg));
        }

        let content_scale = self.config.content_weight / content_targets.len() as f32;
        let mut content_loss = 0.0f32;
        let mut content_grads = Vec::with_capacity(content_targets.len());
        for (fm, target) in content_trace.tapped.iter().zip(content_targets.iter()) {
            let (l, dfm) = mse_loss_grad(fm, target, content_scale);
            content_loss += l;
            content_grads.push(dfm);
        }

        let (tv_loss, tv_grad) = if self.config.tv_weight > 0.0 {
            let (l, g) = total_variation_loss_grad(image, self.config.tv_weight);
            (l, Some(g))
        } else {
            (0.0, None)
        };

        let terms = LossTerms {
            style: style_loss,
            content: content_loss,
            tv: tv_loss,
        };
        let total = terms.total();
        if !total.is_finite() {
            return Err(TransferError::Diverged {
                epoch,
                step,
                loss: total,
            });
        }

        let mut grad = self
            .style_extractor
            .backward(&self.net, &style_trace, &style_grads)?;
        grad.add_in_place(&self.content_extractor.backward(
            &self.net,
            &content_trace,
            &content_grads,
        )?);
        if let Some(g) = tv_grad {
            grad.add_in_place(&g);
        }

        optimizer.step(image, &grad);
        // Hard box constraint, applied after the update; gradients never
        // see the clip.
        image.clamp_in_place(0.0, 1.0);
        Ok(terms)
    }
}

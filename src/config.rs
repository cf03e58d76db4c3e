use crate::optim::{Adam, Optimizer, Sgd};
use serde::Deserialize;
use std::fmt;
use std::fs;

/// Which update rule drives the synthesized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

/// Configuration for one style transfer run, loadable from a TOML or
/// JSON file.
///
/// The defaults mirror the final variant of the original system: Adam
/// with lr 0.02 / beta1 0.99 / epsilon 0.1, ten epochs of one step, a
/// single deep content layer and five shallow-to-deep style layers.  The
/// loss weights are starting points, not authoritative; callers tune them
/// per run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Side length of the square working resolution (224 and 112 are the
    /// historical choices).
    pub image_size: usize,
    pub epochs: usize,
    pub steps_per_epoch: usize,
    pub style_weight: f32,
    pub content_weight: f32,
    /// Total-variation weight; 0 disables the regularizer.
    pub tv_weight: f32,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub optimizer: OptimizerKind,
    pub content_layers: Vec<String>,
    pub style_layers: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            image_size: 224,
            epochs: 10,
            steps_per_epoch: 1,
            style_weight: 0.01,
            content_weight: 1000.0,
            tv_weight: 0.0,
            learning_rate: 0.02,
            beta1: 0.99,
            beta2: 0.999,
            epsilon: 0.1,
            optimizer: OptimizerKind::Adam,
            content_layers: vec!["block5_conv2".to_string()],
            style_layers: vec![
                "block1_conv1".to_string(),
                "block2_conv1".to_string(),
                "block3_conv1".to_string(),
                "block4_conv1".to_string(),
                "block5_conv1".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroImageSize,
    ZeroEpochs,
    ZeroStepsPerEpoch,
    NoContentLayers,
    NoStyleLayers,
    BadLearningRate,
    BadWeight { which: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroImageSize => write!(f, "image_size must be positive"),
            ConfigError::ZeroEpochs => write!(f, "epochs must be at least 1"),
            ConfigError::ZeroStepsPerEpoch => write!(f, "steps_per_epoch must be at least 1"),
            ConfigError::NoContentLayers => write!(f, "at least one content layer is required"),
            ConfigError::NoStyleLayers => write!(f, "at least one style layer is required"),
            ConfigError::BadLearningRate => {
                write!(f, "learning_rate must be finite and positive")
            }
            ConfigError::BadWeight { which } => {
                write!(f, "{} must be finite and non-negative", which)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TransferConfig {
    /// Load configuration from the given path.  Supports TOML or JSON
    /// based on the file extension.  Returns `None` if reading or parsing
    /// fails.
    pub fn from_path(path: &str) -> Option<Self> {
        let Ok(content) = fs::read_to_string(path) else {
            return None;
        };
        if path.ends_with(".json") {
            serde_json::from_str(&content).ok()
        } else {
            toml::from_str(&content).ok()
        }
    }

    /// Check the invariants the transfer loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_size == 0 {
            return Err(ConfigError::ZeroImageSize);
        }
        if self.epochs == 0 {
            return Err(ConfigError::ZeroEpochs);
        }
        if self.steps_per_epoch == 0 {
            return Err(ConfigError::ZeroStepsPerEpoch);
        }
        if self.content_layers.is_empty() {
            return Err(ConfigError::NoContentLayers);
        }
        if self.style_layers.is_empty() {
            return Err(ConfigError::NoStyleLayers);
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::BadLearningRate);
        }
        for (which, w) in [
            ("style_weight", self.style_weight),
            ("content_weight", self.content_weight),
            ("tv_weight", self.tv_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::BadWeight { which });
            }
        }
        Ok(())
    }

    /// Build the configured optimizer.
    pub fn build_optimizer(&self) -> Box<dyn Optimizer> {
        match self.optimizer {
            OptimizerKind::Adam => Box::new(Adam::new(
                self.learning_rate,
                self.beta1,
                self.beta2,
                self.epsilon,
            )),
            OptimizerKind::Sgd => Box::new(Sgd::new(self.learning_rate)),
        }
    }
}

//! Neural style transfer over a frozen convolutional feature network.
//!
//! The engine takes a content image and a style image, extracts feature
//! maps at configured layers of an injected [`extractor::FeatureNetwork`],
//! matches Gram-matrix style statistics and content feature maps with
//! hand-derived gradients, and iteratively optimizes a synthesized image
//! under a `[0, 1]` box constraint, reporting progress at epoch
//! boundaries.  [`worker::spawn`] runs a transfer on its own thread with
//! channel-delivered progress and cancellation.

pub mod config;
pub mod extractor;
pub mod gram;
pub mod layers;
pub mod logging;
pub mod loss;
pub mod math;
pub mod models;
pub mod optim;
pub mod pixels;
pub mod rng;
pub mod tensor;
pub mod transfer;
pub mod util;
pub mod worker;

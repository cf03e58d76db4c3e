pub mod vgg;

pub use vgg::VggFeatures;

pub mod conv;
pub mod pooling;
pub mod relu;

pub use conv::{Conv2d, ConvError};
pub use pooling::{max_pool2d, max_pool2d_backward};

mod duration;
mod float;

pub use duration::Duration;
pub use float::{Float64, Float64DecodeError};

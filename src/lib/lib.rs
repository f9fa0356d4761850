pub mod error;
pub mod estimator;
pub mod model;
pub mod sampler;
pub mod significance;
pub mod sweep;

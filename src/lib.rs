pub mod allocation;
pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod inputs;
pub mod model;
pub mod pipeline;
pub mod rng;
pub mod sampler;
pub mod stream;
pub mod types;

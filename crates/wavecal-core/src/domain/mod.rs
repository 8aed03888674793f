pub mod errors;

pub use errors::{ConfigurationError, WavecalResult};

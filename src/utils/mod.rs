mod parallel;
mod statistics;
mod validation;

// Data-parallel map over an index range (rayon under the `parallel` feature)
pub(crate) use parallel::map_indices;

// Order statistics
pub use statistics::median;

// Validation operations
pub use validation::{valid_audio, valid_audio_2d};

pub mod constants;
pub mod datetime;
pub mod progress;
pub mod text;

pub use constants::*;
pub use progress::ProgressReporter;

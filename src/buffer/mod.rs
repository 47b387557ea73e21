pub mod error;
pub mod measurement_buffer;

pub use error::BufferError;
pub use measurement_buffer::{BufferSnapshot, BufferStats, MeasurementBuffer};

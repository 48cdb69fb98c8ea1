//! Durable persistence of the pending queue and statistics.

pub mod traits;
pub mod memory;
pub mod json_file;

//! Queue connectivity: the client contract, its errors, and the in-memory
//! implementation used in tests and local development.

pub mod client;
pub mod error;
pub mod memory;

pub use client::{is_valid_tube_name, QueueClient, DEFAULT_TUBE, MAX_TUBE_NAME_LEN};
pub use error::QueueError;
pub use memory::{InMemoryQueue, QueueStats};

// Re-export types from the protocol crate so they are accessible via pathforge_core::*
pub use pathforge_protocol::job;
pub use pathforge_protocol::protocol;
pub use pathforge_protocol::track;

// Internal Modules
pub mod chart;
pub mod consts;
pub mod error;
pub mod scorer;
pub mod search;
pub mod snapshot;
pub mod supervisor;

pub use error::{PathingError, PfResult};

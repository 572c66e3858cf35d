//! symdex-core: Shared errors, configuration, and cancellation for the symdex
//! indexing engine.

pub mod cancel;
pub mod config;
pub mod error;

pub use cancel::*;
pub use config::*;
pub use error::*;

//! Delve Core - Core data structures and trait definitions
//!
//! This module defines the abstractions shared by the research pipeline and the
//! memory store: errors, configuration, logging and the external service traits.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;

//! Infrastructure layer for the quorum-counter node
//!
//! Contains:
//! - Error taxonomy shared across the crate
//! - Retry with exponential backoff for ledger calls
//! - Graceful shutdown coordination for background tasks

mod error;
mod retry;
mod shutdown;

pub use error::*;
pub use retry::{retry, RetryConfig};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

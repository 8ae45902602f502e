//! orgtree-core: Shared infrastructure for the orgtree explorer.
pub mod config;
pub mod context;
pub mod error;
pub mod observability;
pub mod retry;

pub use context::{ExecutionContext, Interruption};
pub use error::AppError;
pub use retry::{RetryConfig, RetryError, Retryable, retry_call};

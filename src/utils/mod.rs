//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{DocumentKind, detect_kind};
pub use retry::{RetryConfig, Retryable, retry_when, with_retry};
pub use text::normalize_whitespace;

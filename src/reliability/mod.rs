//! Caller-side reliability policy for platform communication.
//!
//! Provides exponential backoff retry layered on the usage reporter's
//! idempotent contract. There is no background retry thread or queue: retry
//! is driven entirely by the caller.

mod retry;

pub use retry::{RetryPolicy, is_retryable, retry_with_backoff};

//! Field-by-field construction of an [`Error`] without capturing a stack.
//!
//! The constructors on [`Error`] capture a stack and always attach params.
//! Sometimes neither is wanted: the wire decoder rebuilds an error from
//! frames that were captured in another process, and tests need exact
//! fixtures. The builder covers both.
//!
//! Unlike the constructors, a builder that never receives params produces an
//! error whose params are *absent* (`Error::params()` returns `None`), which
//! is how the two in-process states "no params" and "empty params" differ.

use crate::{BoxError, Error, Frame, Normalized, Params, Stack};
use std::sync::Arc;

// ============================================================================
// Error Builder (Fluent API)
// ============================================================================

/// Fluent builder for [`Error`].
///
/// # State Tracking
///
/// Every setter is last-write-wins, except [`ErrorBuilder::param`], which
/// adds to whatever params were set before it.
///
/// # Example
///
/// ```rust
/// use relay_errors::{Error, Frame};
///
/// let err = Error::builder()
///     .code("timeout")
///     .message("omg help plz")
///     .param("something", "hullo")
///     .frames(vec![Frame::new("some file", 123, "someMethod")])
///     .retryable(false)
///     .build();
///
/// assert_eq!(err.code(), "timeout");
/// assert_eq!(err.stack_trace().len(), 1);
/// assert_eq!(err.retryable_flag(), Some(false));
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until `build` is called"]
pub struct ErrorBuilder {
    code: String,
    message: String,
    params: Option<Params>,
    stack: Stack,
    is_retryable: Option<bool>,
    is_unexpected: Option<bool>,
    marshal_count: u32,
    message_chain: Vec<String>,
    cause: Option<Normalized>,
}

impl ErrorBuilder {
    /// Empty builder: no code, no message, absent params, empty stack.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code.
    #[inline]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Set the message.
    #[inline]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replace the params.
    #[inline]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Add one param, creating the map if needed.
    #[inline]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    /// Use an existing stack snapshot.
    #[inline]
    pub fn stack(mut self, stack: Stack) -> Self {
        self.stack = stack;
        self
    }

    /// Use explicit frames as the stack.
    #[inline]
    pub fn frames(self, frames: Vec<Frame>) -> Self {
        self.stack(Stack::from_frames(frames))
    }

    /// Set the explicit retryable flag.
    #[inline]
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.is_retryable = Some(retryable);
        self
    }

    /// Set the explicit unexpected flag.
    #[inline]
    pub fn unexpected(mut self, unexpected: bool) -> Self {
        self.is_unexpected = Some(unexpected);
        self
    }

    /// Set the hop counter.
    #[inline]
    pub fn marshal_count(mut self, count: u32) -> Self {
        self.marshal_count = count;
        self
    }

    /// Set the flattened message history.
    #[inline]
    pub fn message_chain<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_chain = chain.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a cause. Structured errors stay walkable by the matchers.
    #[inline]
    pub fn cause<E: Into<BoxError>>(mut self, cause: E) -> Self {
        self.cause = Some(Normalized::from_any(cause));
        self
    }

    /// Build the error. Never fails.
    pub fn build(self) -> Error {
        Error {
            code: self.code,
            message: self.message,
            params: self.params.map(Arc::new),
            stack: self.stack,
            is_retryable: self.is_retryable,
            is_unexpected: self.is_unexpected,
            marshal_count: self.marshal_count,
            message_chain: self.message_chain,
            cause: self.cause.map(Normalized::into_cause),
        }
    }
}

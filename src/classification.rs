//! Retryable / unexpected classification.
//!
//! Both classifications are tri-state on the error itself:
//!
//! | Flag | Unset resolves to |
//! |---|---|
//! | retryable | `true` iff [`codes::is_retryable_by_default`] holds for the code |
//! | unexpected | `false` |
//!
//! An unset flag is resolved every time it is read, so a default is never
//! frozen into an error that is later re-coded or re-wrapped.
//!
//! # Foreign Errors That Know Their Retryability
//!
//! Errors from other libraries sometimes know whether retrying makes sense.
//! Such types implement [`ReportsRetryable`] and are handed over through
//! [`ReportsRetryable::into_cause`]. When a wrapping operation builds a new
//! error around one, it adopts the reported value as an *explicit* flag.
//!
//! ```rust
//! use relay_errors::{ReportsRetryable, is_retryable, propagate};
//! use std::fmt;
//!
//! #[derive(Debug)]
//! struct Throttled;
//!
//! impl fmt::Display for Throttled {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str("throttled by upstream")
//!     }
//! }
//!
//! impl std::error::Error for Throttled {}
//!
//! impl ReportsRetryable for Throttled {
//!     fn retryable(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let err = propagate(Some(Throttled.into_cause())).unwrap();
//! assert_eq!(err.retryable_flag(), Some(false));
//! assert!(!is_retryable(Some(Throttled.into_cause())));
//! ```

use crate::{BoxError, Error, Normalized, codes};
use std::error::Error as StdError;
use std::fmt;

// ============================================================================
// Retryability Capability
// ============================================================================

/// Capability of a foreign error type to report whether it is retryable.
pub trait ReportsRetryable: StdError + Send + Sync + 'static {
    /// Whether the operation that produced this error may be retried.
    fn retryable(&self) -> bool;

    /// Box this error so the wrapping operations can see the capability.
    fn into_cause(self) -> BoxError
    where
        Self: Sized,
    {
        Box::new(RetryableCause::new(self))
    }
}

/// A foreign error paired with the retryability it reported.
///
/// Displays, debugs and chains exactly like the error it carries.
pub struct RetryableCause {
    inner: BoxError,
    retryable: bool,
}

impl RetryableCause {
    /// Capture `err` and its reported retryability.
    pub fn new<E: ReportsRetryable>(err: E) -> Self {
        let retryable = err.retryable();
        Self {
            inner: Box::new(err),
            retryable,
        }
    }

    /// The reported retryability.
    #[inline]
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// The carried error.
    #[inline]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl fmt::Debug for RetryableCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for RetryableCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for RetryableCause {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Retryability a foreign error reports about itself, if it can.
pub(crate) fn foreign_retryable(err: &(dyn StdError + Send + Sync + 'static)) -> Option<bool> {
    err.downcast_ref::<RetryableCause>()
        .map(RetryableCause::retryable)
}

// ============================================================================
// Resolution
// ============================================================================

impl Error {
    /// Whether this error may be retried.
    ///
    /// The explicit flag wins; otherwise the code decides.
    #[inline]
    pub fn retryable(&self) -> bool {
        self.is_retryable
            .unwrap_or_else(|| codes::is_retryable_by_default(&self.code))
    }

    /// Whether this error was unexpected. Unset means no.
    #[inline]
    pub fn unexpected(&self) -> bool {
        self.is_unexpected.unwrap_or(false)
    }

    /// Replace the retryable flag. There is no way back to "unset".
    #[inline]
    pub fn set_is_retryable(&mut self, retryable: bool) {
        self.is_retryable = Some(retryable);
    }

    /// Replace the unexpected flag. There is no way back to "unset".
    #[inline]
    pub fn set_is_unexpected(&mut self, unexpected: bool) {
        self.is_unexpected = Some(unexpected);
    }

    /// Owned variant of [`Error::set_is_retryable`].
    #[inline]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.set_is_retryable(retryable);
        self
    }

    /// Owned variant of [`Error::set_is_unexpected`].
    #[inline]
    pub fn with_unexpected(mut self, unexpected: bool) -> Self {
        self.set_is_unexpected(unexpected);
        self
    }
}

/// Whether `err` may be retried. `None` is never retryable.
///
/// Equivalent to `propagate(err).map_or(false, |e| e.retryable())`, without
/// capturing a stack for foreign errors.
pub fn is_retryable<E: Into<BoxError>>(err: Option<E>) -> bool {
    match err.map(Normalized::from_any) {
        None => false,
        Some(Normalized::Structured(err)) => err.retryable(),
        Some(Normalized::Foreign(err)) => foreign_retryable(err.as_ref())
            .unwrap_or_else(|| codes::is_retryable_by_default(codes::INTERNAL_SERVICE)),
    }
}

/// Whether `err` was unexpected. `None` and foreign errors are not.
pub fn is_unexpected<E: Into<BoxError>>(err: Option<E>) -> bool {
    match err.map(Normalized::from_any) {
        Some(Normalized::Structured(err)) => err.unexpected(),
        _ => false,
    }
}

//! # Relay Errors
//!
//! Structured errors that keep their provenance while crossing function,
//! service, and process boundaries.
//!
//! ## Design Philosophy
//!
//! 1. **Codes are hierarchical** (`not_found.user.profile`) so callers can
//!    match at whatever granularity they care about
//! 2. **Wrapping never loses information**: the wrapped error stays reachable
//!    as the cause, and its message joins the rendered chain
//! 3. **Classification is explicit or derived**: retryable/unexpected flags
//!    are carried forward when known and recomputed from the code when not
//! 4. **Values are immutable**: wrapping copies, it never mutates shared state
//! 5. **Crossing the wire is lossy but principled**: the native cause stays
//!    behind, a flattened message chain travels in its place
//!
//! ## Error Anatomy
//!
//! | Part | Meaning |
//! |---|---|
//! | code | dot-delimited, most general segment first |
//! | message | human readable, never parsed |
//! | params | string key/value context |
//! | stack | frames captured at construction |
//! | retryable / unexpected | tri-state: unset, true, false |
//! | marshal count | number of wire hops so far |
//! | message chain | messages of the errors this one wrapped |
//! | cause | the wrapped error, process-local |
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_errors::{Error, augment, params};
//!
//! fn load_user(id: &str) -> relay_errors::Result<()> {
//!     Err(Error::not_found("user", "no such user", Some(params! { "user_id" => id })))
//! }
//!
//! let err = load_user("42").unwrap_err();
//! let err = augment(Some(err), "loading profile", None).unwrap();
//!
//! assert_eq!(err.to_string(), "not_found.user: loading profile: no such user");
//! assert!(err.is(&["not_found", "user"]));
//! assert!(!err.retryable());
//! assert_eq!(err.param("user_id"), Some("42"));
//! ```
//!
//! ## Crossing a Service Boundary
//!
//! ```rust
//! use relay_errors::{Error, marshal, unmarshal, WireError};
//!
//! let mut err = Error::timeout("ledger", "ledger did not answer", None);
//! err.set_is_retryable(false);
//!
//! let json = marshal(Some(&err)).to_json().unwrap();
//! let received = unmarshal(Some(&WireError::from_json(&json).unwrap()));
//!
//! assert_eq!(received.code(), "timeout.ledger");
//! assert_eq!(received.retryable_flag(), Some(false));
//! assert_eq!(received.marshal_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::result;
use std::sync::Arc;

pub mod builder;
pub mod chain;
pub mod classification;
pub mod codes;
pub mod convenience;
pub mod logging;
pub mod marshaling;
pub mod matching;
pub mod render;
pub mod stack;

pub use builder::ErrorBuilder;
pub use chain::{augment, new_internal_with_cause, propagate, wrap, wrap_with_code};
pub use classification::{ReportsRetryable, RetryableCause, is_retryable, is_unexpected};
pub use codes::CodeFamily;
pub use convenience::ResultExt;
pub use logging::{InternalLog, MAX_FIELD_OUTPUT_LEN};
pub use marshaling::{CodecError, WireError, WireFrame, marshal, unmarshal};
pub use matching::{is, matches, prefix_matches};
pub use render::{MAX_STACK_STRING_LEN, Verbose};
pub use stack::{Frame, Stack};

/// Maximum number of links followed when walking a cause chain.
///
/// Rendering and matching stop here, so even a pathological chain costs a
/// bounded amount of work.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Type alias for Results using our error type.
pub type Result<T> = result::Result<T, Error>;

/// Key/value context attached to an error.
pub type Params = BTreeMap<String, String>;

/// Any error value that can be handed to the boundary operations.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A shared, type-erased error held as a cause.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// Cause
// ============================================================================

/// The error a given error wraps. Process-local; never serialized.
#[derive(Clone)]
pub(crate) enum Cause {
    Structured(Arc<Error>),
    /// `echoed` is set when the wrapping error's message is this cause's
    /// own rendering.
    Foreign { err: SharedError, echoed: bool },
}

impl Cause {
    #[inline]
    pub(crate) fn as_dyn(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            Self::Structured(err) => &**err,
            Self::Foreign { err, .. } => &**err,
        }
    }
}

/// An incoming error, sorted into "already ours" and "anything else".
#[derive(Debug)]
pub(crate) enum Normalized {
    Structured(Error),
    Foreign(SharedError),
}

impl Normalized {
    pub(crate) fn from_any<E: Into<BoxError>>(err: E) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<Error>() {
            Ok(structured) => Self::Structured(*structured),
            Err(foreign) => Self::Foreign(Arc::from(foreign)),
        }
    }

    pub(crate) fn into_cause(self) -> Cause {
        match self {
            Self::Structured(err) => Cause::Structured(Arc::new(err)),
            Self::Foreign(err) => Cause::Foreign { err, echoed: false },
        }
    }
}

// ============================================================================
// Error
// ============================================================================

/// A structured error: code, message, params, stack, classification and cause.
///
/// # Key Properties
///
/// - Cheap to clone: stack and params are shared, never mutated in place
/// - `Send + Sync`, safe to read from many threads
/// - Classification is tri-state (`Option<bool>`); unset defers to the code
/// - The cause chain is process-local; [`marshal`] flattens it into the
///   message chain instead
///
/// Build one with [`Error::new`] or a family constructor such as
/// [`Error::not_found`]; bring foreign errors in with [`wrap`], [`augment`],
/// [`propagate`] or [`new_internal_with_cause`].
///
/// # Rendering and `source()`
///
/// `Display` already prints the whole cause chain, and
/// [`source()`](StdError::source) returns that same cause. Reporters that
/// print every `source()` in turn (`anyhow`'s `{:?}`, `eyre`) will therefore
/// repeat each message; hand them [`Error::short_string`] or read
/// [`Error::message`] per link instead. `{:#}` is the same short form; the
/// multi-line form with params and stack is only available through
/// [`Error::verbose`] and [`Error::verbose_string`].
#[derive(Clone)]
#[must_use = "errors should be handled or logged"]
pub struct Error {
    pub(crate) code: String,
    pub(crate) message: String,
    pub(crate) params: Option<Arc<Params>>,
    pub(crate) stack: Stack,
    pub(crate) is_retryable: Option<bool>,
    pub(crate) is_unexpected: Option<bool>,
    pub(crate) marshal_count: u32,
    pub(crate) message_chain: Vec<String>,
    pub(crate) cause: Option<Cause>,
}

impl Error {
    /// Assemble an error without capturing a stack.
    pub(crate) fn from_parts(
        code: String,
        message: String,
        params: Option<Params>,
        stack: Stack,
    ) -> Self {
        Self {
            code,
            message,
            params: Some(Arc::new(params.unwrap_or_default())),
            stack,
            is_retryable: None,
            is_unexpected: None,
            marshal_count: 0,
            message_chain: Vec::new(),
            cause: None,
        }
    }

    /// Create an error with a custom code.
    ///
    /// The stack is captured here, excluding this constructor. Missing params
    /// become an empty map.
    #[inline(never)]
    pub fn new(code: impl Into<String>, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::from_parts(code.into(), message.into(), params, Stack::capture(1))
    }

    #[inline(never)]
    fn family(
        family: CodeFamily,
        sub_code: &str,
        message: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        Self::from_parts(
            codes::with_sub_code(family.as_str(), sub_code),
            message.into(),
            params,
            Stack::capture(2),
        )
    }

    /// Start a non-capturing builder.
    pub fn builder() -> ErrorBuilder {
        ErrorBuilder::new()
    }

    // Convenience constructors, one per generic code family.
    // Each produces `<family>.<sub_code>`, or `<family>` for an empty sub code.

    /// `bad_request.<sub_code>`
    #[inline(never)]
    pub fn bad_request(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::BadRequest, sub_code, message, params)
    }

    /// `bad_response.<sub_code>`
    #[inline(never)]
    pub fn bad_response(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::BadResponse, sub_code, message, params)
    }

    /// `forbidden.<sub_code>`
    #[inline(never)]
    pub fn forbidden(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::Forbidden, sub_code, message, params)
    }

    /// `internal_service.<sub_code>`
    #[inline(never)]
    pub fn internal_service(
        sub_code: &str,
        message: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        Self::family(CodeFamily::InternalService, sub_code, message, params)
    }

    /// `not_found.<sub_code>`
    #[inline(never)]
    pub fn not_found(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::NotFound, sub_code, message, params)
    }

    /// `precondition_failed.<sub_code>`
    #[inline(never)]
    pub fn precondition_failed(
        sub_code: &str,
        message: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        Self::family(CodeFamily::PreconditionFailed, sub_code, message, params)
    }

    /// `timeout.<sub_code>`
    #[inline(never)]
    pub fn timeout(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::Timeout, sub_code, message, params)
    }

    /// `unauthorized.<sub_code>`
    #[inline(never)]
    pub fn unauthorized(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::Unauthorized, sub_code, message, params)
    }

    /// `rate_limited.<sub_code>`
    #[inline(never)]
    pub fn rate_limited(sub_code: &str, message: impl Into<String>, params: Option<Params>) -> Self {
        Self::family(CodeFamily::RateLimited, sub_code, message, params)
    }

    /// Copy of this error with `extra` merged over its params.
    ///
    /// Always allocates a fresh map; the original map is left untouched.
    pub(crate) fn with_merged_params(mut self, extra: Option<Params>) -> Self {
        self.params = Some(Arc::new(merge_params(self.params.as_deref(), extra)));
        self
    }

    /// Dot-delimited code.
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Family of the code's first segment, if it is a generic one.
    #[inline]
    pub fn family_of_code(&self) -> Option<CodeFamily> {
        CodeFamily::of(&self.code)
    }

    /// This error's own message, without the cause chain.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Params, or `None` when the error was assembled without any.
    #[inline]
    pub fn params(&self) -> Option<&Params> {
        self.params.as_deref()
    }

    /// A single param value.
    #[inline]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params()?.get(key).map(String::as_str)
    }

    /// The stack captured at construction.
    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Raw frames of [`Error::stack`].
    #[inline]
    pub fn stack_trace(&self) -> &[Frame] {
        self.stack.frames()
    }

    /// Explicit retryable flag; `None` means "use the code default".
    #[inline]
    pub fn retryable_flag(&self) -> Option<bool> {
        self.is_retryable
    }

    /// Explicit unexpected flag; `None` means "not unexpected".
    #[inline]
    pub fn unexpected_flag(&self) -> Option<bool> {
        self.is_unexpected
    }

    /// How many times this error has been marshalled on its way here.
    #[inline]
    pub fn marshal_count(&self) -> u32 {
        self.marshal_count
    }

    /// Messages of the errors this one wrapped, nearest first.
    #[inline]
    pub fn message_chain(&self) -> &[String] {
        &self.message_chain
    }

    /// The wrapped error, whatever its type.
    #[inline]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_ref().map(Cause::as_dyn)
    }

    /// The wrapped error, when it is itself structured.
    #[inline]
    pub fn cause_error(&self) -> Option<&Error> {
        match self.cause.as_ref()? {
            Cause::Structured(err) => Some(&**err),
            Cause::Foreign { .. } => None,
        }
    }
}

/// Merge `extra` over `base` into a new map. Keys in `extra` win.
pub(crate) fn merge_params(base: Option<&Params>, extra: Option<Params>) -> Params {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(extra) = extra {
        merged.extend(extra);
    }
    merged
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("params", &self.params)
            .field("frames", &self.stack.len())
            .field("is_retryable", &self.is_retryable)
            .field("is_unexpected", &self.is_unexpected)
            .field("marshal_count", &self.marshal_count)
            .field("message_chain", &self.message_chain)
            .field("cause", &self.cause().map(|cause| cause.to_string()))
            .finish()
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.cause.as_ref()? {
            Cause::Structured(err) => Some(&**err),
            Cause::Foreign { err, .. } => Some(&**err),
        }
    }
}

//! Boundary operations: bringing any error into the structured world.
//!
//! Every operation here is total over its error input. `None` comes back out
//! as `None`; anything else is normalized into an [`Error`], never dropped.
//!
//! | Operation | Structured input | Foreign input |
//! |---|---|---|
//! | [`wrap`] | copy with merged params | new `internal_service`, cause = input |
//! | [`wrap_with_code`] | copy with merged params | new error with the given code |
//! | [`augment`] | new message, cause = input, no new stack | [`new_internal_with_cause`] |
//! | [`propagate`] | identity | new `internal_service`, cause = input |
//! | [`new_internal_with_cause`] | new `internal_service[.sub]` | same |
//!
//! Whenever a new error is built around a foreign cause, a retryability
//! reported by that cause (see [`ReportsRetryable`](crate::ReportsRetryable))
//! is adopted as the explicit flag.

use crate::classification::foreign_retryable;
use crate::{
    BoxError, Cause, Error, MAX_CHAIN_DEPTH, Normalized, Params, SharedError, Stack, codes,
    merge_params,
};
use std::error::Error as StdError;
use std::iter::FusedIterator;
use std::sync::Arc;

// ============================================================================
// Chain Walking
// ============================================================================

/// One link of a cause chain.
#[derive(Clone, Copy)]
pub(crate) enum Link<'a> {
    Structured(&'a Error),
    /// A foreign link always terminates the walk. `echoed` is copied from
    /// the cause.
    Foreign {
        err: &'a (dyn StdError + Send + Sync + 'static),
        echoed: bool,
    },
}

/// Walks an error and its causes, at most [`MAX_CHAIN_DEPTH`] links.
pub(crate) struct Links<'a> {
    next: Option<Link<'a>>,
    remaining: usize,
}

impl<'a> Iterator for Links<'a> {
    type Item = Link<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next.take()?;
        self.remaining -= 1;
        if let Link::Structured(err) = current {
            self.next = err.cause.as_ref().map(|cause| match cause {
                Cause::Structured(err) => Link::Structured(&**err),
                Cause::Foreign { err, echoed } => Link::Foreign {
                    err: &**err,
                    echoed: *echoed,
                },
            });
        }
        Some(current)
    }
}

impl FusedIterator for Links<'_> {}

impl Error {
    /// This error followed by its causes, nearest first.
    pub(crate) fn links(&self) -> Links<'_> {
        Links {
            next: Some(Link::Structured(self)),
            remaining: MAX_CHAIN_DEPTH,
        }
    }
}

// ============================================================================
// Boundary Operations
// ============================================================================

/// Build a fresh error around a foreign cause, capturing a stack.
///
/// The message is expected to be the cause's rendering, so the cause is
/// marked as echoed and rendering prints it once. `skip` counts the public frames above this helper.
#[inline(never)]
fn from_foreign(
    cause: SharedError,
    code: String,
    message: String,
    params: Option<Params>,
    skip: usize,
) -> Error {
    let mut err = Error::from_parts(code, message, params, Stack::capture(skip + 1));
    err.is_retryable = foreign_retryable(cause.as_ref());
    err.cause = Some(Cause::Foreign {
        err: cause,
        echoed: true,
    });
    err
}

#[inline(never)]
pub(crate) fn wrap_inner(err: Normalized, params: Option<Params>, code: &str, skip: usize) -> Error {
    match err {
        Normalized::Structured(err) => err.with_merged_params(params),
        Normalized::Foreign(cause) => {
            let message = cause.to_string();
            from_foreign(cause, code.to_owned(), message, params, skip + 1)
        }
    }
}

/// Attach params to an error, converting foreign errors on the way.
///
/// A structured error keeps its code, message, stack, cause, classification
/// and marshal count; only its params change, and into a new map. A foreign
/// error becomes an `internal_service` error whose message is the foreign
/// error's rendering and whose cause is the foreign error.
///
/// # Example
///
/// ```rust
/// use relay_errors::{params, wrap};
///
/// let io = std::io::Error::other("Look here, an error");
/// let err = wrap(Some(io), Some(params! { "blub" => "dub" })).unwrap();
///
/// assert_eq!(err.to_string(), "internal_service: Look here, an error");
/// assert_eq!(err.param("blub"), Some("dub"));
/// ```
#[inline(never)]
pub fn wrap<E: Into<BoxError>>(err: Option<E>, params: Option<Params>) -> Option<Error> {
    let err = Normalized::from_any(err?);
    Some(wrap_inner(err, params, codes::INTERNAL_SERVICE, 1))
}

/// [`wrap`] with a caller-chosen code for foreign errors.
///
/// Structured errors keep their own code.
///
/// ```rust
/// use relay_errors::{codes, wrap_with_code};
///
/// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "open not/a/file: no such file");
/// let err = wrap_with_code(Some(io), None, codes::NOT_FOUND).unwrap();
/// assert_eq!(err.to_string(), "not_found: open not/a/file: no such file");
/// ```
#[inline(never)]
pub fn wrap_with_code<E: Into<BoxError>>(
    err: Option<E>,
    params: Option<Params>,
    code: &str,
) -> Option<Error> {
    let err = Normalized::from_any(err?);
    Some(wrap_inner(err, params, code, 1))
}

/// Add context to an error.
///
/// The result's message is `context` and its cause is `err`, so rendering
/// shows both. For a structured `err` the code, classification and marshal
/// count carry over and no new stack is captured: the original capture point
/// is the useful one. The wrapped message is pushed onto the message chain so
/// it survives a wire hop. A foreign `err` goes through
/// [`new_internal_with_cause`].
///
/// ```rust
/// use relay_errors::{Error, augment};
///
/// let base = Error::not_found("foo", "failed to find foo", None);
/// let err = augment(Some(base), "added context", None).unwrap();
/// assert_eq!(err.to_string(), "not_found.foo: added context: failed to find foo");
/// assert!(err.stack().is_empty());
/// ```
#[inline(never)]
pub fn augment<E: Into<BoxError>>(
    err: Option<E>,
    context: impl Into<String>,
    params: Option<Params>,
) -> Option<Error> {
    let err = Normalized::from_any(err?);
    Some(augment_inner(err, context.into(), params, 1))
}

#[inline(never)]
pub(crate) fn augment_inner(
    err: Normalized,
    context: String,
    params: Option<Params>,
    skip: usize,
) -> Error {
    match err {
        Normalized::Structured(err) => augment_structured(err, context, params),
        foreign => internal_with_cause(foreign, context, params, "", skip + 1),
    }
}

fn augment_structured(err: Error, context: String, params: Option<Params>) -> Error {
    let mut message_chain = Vec::with_capacity(err.message_chain.len() + 1);
    message_chain.push(err.message.clone());
    message_chain.extend(err.message_chain.iter().cloned());

    Error {
        code: err.code.clone(),
        message: context,
        params: Some(Arc::new(merge_params(err.params.as_deref(), params))),
        stack: Stack::empty(),
        is_retryable: err.is_retryable,
        is_unexpected: err.is_unexpected,
        marshal_count: err.marshal_count,
        message_chain,
        cause: Some(Cause::Structured(Arc::new(err))),
    }
}

/// Make sure an error is structured.
///
/// Structured errors pass through untouched. A foreign error becomes an
/// `internal_service` error with the foreign rendering as its message, a
/// fresh stack and the foreign error as its cause.
#[inline(never)]
pub fn propagate<E: Into<BoxError>>(err: Option<E>) -> Option<Error> {
    let err = Normalized::from_any(err?);
    Some(propagate_inner(err, 1))
}

#[inline(never)]
pub(crate) fn propagate_inner(err: Normalized, skip: usize) -> Error {
    match err {
        Normalized::Structured(err) => err,
        Normalized::Foreign(cause) => {
            let message = cause.to_string();
            from_foreign(
                cause,
                codes::INTERNAL_SERVICE.to_owned(),
                message,
                None,
                skip + 1,
            )
        }
    }
}

/// Build an `internal_service` error (optionally `internal_service.<sub_code>`)
/// caused by `err`.
///
/// The message chain starts with the cause's message followed by whatever
/// chain the cause already carried. Retryability is inherited from a
/// structured cause with an explicit flag, or from a foreign cause that
/// reports it; otherwise it stays unset and the code decides.
///
/// ```rust
/// use relay_errors::new_internal_with_cause;
///
/// let inner = new_internal_with_cause("wrapped error", "inner", None, "");
/// let outer = new_internal_with_cause(inner, "outer", None, "downstream");
///
/// assert_eq!(outer.code(), "internal_service.downstream");
/// assert_eq!(outer.message_chain(), ["inner", "wrapped error"]);
/// ```
#[inline(never)]
pub fn new_internal_with_cause<E: Into<BoxError>>(
    err: E,
    message: impl Into<String>,
    params: Option<Params>,
    sub_code: &str,
) -> Error {
    internal_with_cause(Normalized::from_any(err), message.into(), params, sub_code, 1)
}

#[inline(never)]
fn internal_with_cause(
    err: Normalized,
    message: String,
    params: Option<Params>,
    sub_code: &str,
    skip: usize,
) -> Error {
    let code = codes::with_sub_code(codes::INTERNAL_SERVICE, sub_code);
    let mut new_err = Error::from_parts(code, message, params, Stack::capture(skip + 1));

    match &err {
        Normalized::Structured(cause) => {
            new_err.message_chain.reserve(cause.message_chain.len() + 1);
            new_err.message_chain.push(cause.message.clone());
            new_err.message_chain.extend(cause.message_chain.iter().cloned());
            new_err.is_retryable = cause.is_retryable;
            new_err.is_unexpected = cause.is_unexpected;
        }
        Normalized::Foreign(cause) => {
            new_err.message_chain.push(cause.to_string());
            new_err.is_retryable = foreign_retryable(cause.as_ref());
        }
    }

    new_err.cause = Some(err.into_cause());
    new_err
}

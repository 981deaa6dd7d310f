//! Error code namespace - hierarchical, dot-delimited classification strings.
//!
//! A code reads general-to-specific from left to right:
//! `bad_request.missing_param.foo` is a `bad_request`, more specifically a
//! missing parameter, more specifically the `foo` parameter.
//!
//! # Generic Codes
//!
//! A small fixed set of top-level codes covers the common failure families.
//! Callers append their own segments with `.` to get as specific as they need:
//!
//! | Family | Code | Retryable by default |
//! |---|---|---|
//! | [`CodeFamily::BadRequest`] | `bad_request` | no |
//! | [`CodeFamily::BadResponse`] | `bad_response` | no |
//! | [`CodeFamily::Forbidden`] | `forbidden` | no |
//! | [`CodeFamily::InternalService`] | `internal_service` | yes |
//! | [`CodeFamily::NotFound`] | `not_found` | no |
//! | [`CodeFamily::PreconditionFailed`] | `precondition_failed` | no |
//! | [`CodeFamily::Timeout`] | `timeout` | yes |
//! | [`CodeFamily::Unauthorized`] | `unauthorized` | no |
//! | [`CodeFamily::Unknown`] | `unknown` | yes |
//! | [`CodeFamily::RateLimited`] | `rate_limited` | yes |
//!
//! # Prefix Semantics
//!
//! Matching is a plain "starts with" test on the joined prefix, exactly as the
//! code string is written. `not_found` therefore matches `not_found.user`
//! (and, since the test is textual, `not_found_anything` as well). Choose
//! sub-codes with that in mind.
//!
//! # Example
//!
//! ```rust
//! use relay_errors::codes::{self, CodeFamily};
//!
//! let code = codes::with_sub_code(codes::NOT_FOUND, "user");
//! assert_eq!(code, "not_found.user");
//! assert!(codes::has_prefix(&code, &["not_found"]));
//! assert_eq!(CodeFamily::of(&code), Some(CodeFamily::NotFound));
//! ```

use std::borrow::Cow;
use std::fmt;

// ============================================================================
// Generic Codes
// ============================================================================

/// The request was malformed or failed validation.
pub const BAD_REQUEST: &str = "bad_request";
/// A downstream dependency answered with something we could not use.
pub const BAD_RESPONSE: &str = "bad_response";
/// The caller is authenticated but not allowed to do this.
pub const FORBIDDEN: &str = "forbidden";
/// Something failed inside the service itself.
pub const INTERNAL_SERVICE: &str = "internal_service";
/// The requested entity does not exist.
pub const NOT_FOUND: &str = "not_found";
/// The request conflicts with the current state of the target.
pub const PRECONDITION_FAILED: &str = "precondition_failed";
/// The operation did not finish in time.
pub const TIMEOUT: &str = "timeout";
/// The caller could not be authenticated.
pub const UNAUTHORIZED: &str = "unauthorized";
/// Nothing more specific is known.
pub const UNKNOWN: &str = "unknown";
/// The caller has been throttled.
pub const RATE_LIMITED: &str = "rate_limited";

/// Separator between code segments.
pub const SEPARATOR: char = '.';

// ============================================================================
// Code Families
// ============================================================================

/// Top-level family of a code, derived from its first segment.
///
/// Copy-enabled metadata: cheap to extract and pass around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeFamily {
    /// `bad_request`
    BadRequest,
    /// `bad_response`
    BadResponse,
    /// `forbidden`
    Forbidden,
    /// `internal_service`
    InternalService,
    /// `not_found`
    NotFound,
    /// `precondition_failed`
    PreconditionFailed,
    /// `timeout`
    Timeout,
    /// `unauthorized`
    Unauthorized,
    /// `unknown`
    Unknown,
    /// `rate_limited`
    RateLimited,
}

impl CodeFamily {
    /// Every family, in declaration order.
    pub const ALL: [CodeFamily; 10] = [
        Self::BadRequest,
        Self::BadResponse,
        Self::Forbidden,
        Self::InternalService,
        Self::NotFound,
        Self::PreconditionFailed,
        Self::Timeout,
        Self::Unauthorized,
        Self::Unknown,
        Self::RateLimited,
    ];

    /// The code string for this family.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => BAD_REQUEST,
            Self::BadResponse => BAD_RESPONSE,
            Self::Forbidden => FORBIDDEN,
            Self::InternalService => INTERNAL_SERVICE,
            Self::NotFound => NOT_FOUND,
            Self::PreconditionFailed => PRECONDITION_FAILED,
            Self::Timeout => TIMEOUT,
            Self::Unauthorized => UNAUTHORIZED,
            Self::Unknown => UNKNOWN,
            Self::RateLimited => RATE_LIMITED,
        }
    }

    /// Family of `code`, judged by its first segment only.
    ///
    /// Returns `None` for caller-defined top-level codes.
    pub fn of(code: &str) -> Option<Self> {
        let head = code.split(SEPARATOR).next().unwrap_or_default();
        Self::ALL.into_iter().find(|family| family.as_str() == head)
    }

    /// Whether errors of this family are retryable when nothing says otherwise.
    ///
    /// This is the only place the default retry policy is written down;
    /// [`is_retryable_by_default`] reads it.
    #[inline]
    pub const fn retryable_by_default(self) -> bool {
        matches!(
            self,
            Self::InternalService | Self::Timeout | Self::Unknown | Self::RateLimited
        )
    }
}

impl fmt::Display for CodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Code Helpers
// ============================================================================

/// Join code segments with `.`.
///
/// A single segment is returned borrowed.
pub fn join<'a>(parts: &[&'a str]) -> Cow<'a, str> {
    match parts {
        [] => Cow::Borrowed(""),
        [single] => Cow::Borrowed(*single),
        _ => {
            let mut joined = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    joined.push(SEPARATOR);
                }
                joined.push_str(part);
            }
            Cow::Owned(joined)
        }
    }
}

/// `base.sub_code`, or just `base` when `sub_code` is empty.
pub fn with_sub_code(base: &str, sub_code: &str) -> String {
    if sub_code.is_empty() {
        return base.to_owned();
    }
    let mut code = String::with_capacity(base.len() + 1 + sub_code.len());
    code.push_str(base);
    code.push(SEPARATOR);
    code.push_str(sub_code);
    code
}

/// Whether `code` starts with the `.`-joined `parts`.
#[inline]
pub fn has_prefix(code: &str, parts: &[&str]) -> bool {
    code.starts_with(join(parts).as_ref())
}

/// Whether `code` prefix-matches a family that is retryable by default.
///
/// Uses the same textual prefix test as [`has_prefix`].
pub fn is_retryable_by_default(code: &str) -> bool {
    CodeFamily::ALL
        .into_iter()
        .filter(|family| family.retryable_by_default())
        .any(|family| code.starts_with(family.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_zero_one_and_many_parts() {
        assert_eq!(join(&[]), "");
        assert!(matches!(join(&["bad_request"]), Cow::Borrowed("bad_request")));
        assert_eq!(
            join(&["bad_request", "missing_param", "foo"]),
            "bad_request.missing_param.foo"
        );
    }

    #[test]
    fn sub_code_is_optional() {
        assert_eq!(with_sub_code(INTERNAL_SERVICE, ""), "internal_service");
        assert_eq!(
            with_sub_code(INTERNAL_SERVICE, "downstream"),
            "internal_service.downstream"
        );
    }

    #[test]
    fn prefix_is_textual() {
        let code = "bad_request.missing_param.foo";
        assert!(has_prefix(code, &[BAD_REQUEST]));
        assert!(has_prefix(code, &[BAD_REQUEST, "missing_param"]));
        assert!(!has_prefix(code, &[BAD_REQUEST, "missing_param", "foo1"]));
        assert!(!has_prefix(code, &["missing_param"]));
        assert!(has_prefix("not_found_extra", &[NOT_FOUND]));
    }

    #[test]
    fn default_retry_policy_follows_families() {
        let retryable: Vec<_> = CodeFamily::ALL
            .into_iter()
            .filter(|family| is_retryable_by_default(family.as_str()))
            .collect();
        assert_eq!(
            retryable,
            [
                CodeFamily::InternalService,
                CodeFamily::Timeout,
                CodeFamily::Unknown,
                CodeFamily::RateLimited,
            ]
        );
        assert!(is_retryable_by_default("rate_limited.api"));
        assert!(is_retryable_by_default("timeout_db"));
        assert!(!is_retryable_by_default("not_found.user"));
        assert!(!is_retryable_by_default("service.timeout"));
        assert!(!is_retryable_by_default(""));
    }

    #[test]
    fn family_uses_first_segment() {
        assert_eq!(CodeFamily::of("timeout.db"), Some(CodeFamily::Timeout));
        assert_eq!(CodeFamily::of("service.foo"), None);
        assert_eq!(CodeFamily::of(""), None);
    }
}

//! Code matching.
//!
//! Codes are hierarchical, so matching is by prefix: an error coded
//! `not_found.user.profile` matches `["not_found"]`, `["not_found", "user"]`
//! and `["not_found.user.profile"]`. Parts are joined with `.` before the
//! comparison, which is a plain textual `starts_with`.
//!
//! [`is`] is the matcher to reach for: it also looks through the cause chain.
//! [`matches`] compares against the full rendering and survives only for
//! older call sites.

use crate::chain::Link;
use crate::{Error, codes};
use std::error::Error as StdError;

impl Error {
    /// Whether this error's own code starts with the joined `parts`.
    ///
    /// Causes are not consulted; see [`Error::is`].
    #[inline]
    pub fn prefix_matches(&self, parts: &[&str]) -> bool {
        codes::has_prefix(&self.code, parts)
    }

    /// Whether this error or any structured error in its cause chain
    /// prefix-matches the joined `parts`.
    ///
    /// A foreign cause ends the search without matching. At most
    /// [`MAX_CHAIN_DEPTH`](crate::MAX_CHAIN_DEPTH) links are examined.
    ///
    /// ```rust
    /// use relay_errors::{Error, augment, new_internal_with_cause};
    ///
    /// let cause = Error::not_found("account", "no such account", None);
    /// let err = new_internal_with_cause(cause, "loading balance", None, "");
    /// let err = augment(Some(err), "rendering statement", None).unwrap();
    ///
    /// assert!(err.is(&["internal_service"]));
    /// assert!(err.is(&["not_found", "account"]));
    /// assert!(!err.is(&["forbidden"]));
    /// ```
    pub fn is(&self, parts: &[&str]) -> bool {
        let prefix = codes::join(parts);
        self.links().any(|link| match link {
            Link::Structured(err) => err.code.starts_with(prefix.as_ref()),
            Link::Foreign { .. } => false,
        })
    }

    /// Whether the full rendering contains `needle`.
    ///
    /// This also matches on message text and on any part of a code, which
    /// makes it easy to match more than intended. Prefer [`Error::is`].
    #[inline]
    pub fn matches(&self, needle: &str) -> bool {
        self.to_string().contains(needle)
    }
}

/// [`Error::prefix_matches`] for any error.
///
/// A foreign error is treated as the `internal_service` error [`wrap`](crate::wrap)
/// would turn it into. `None` never matches.
pub fn prefix_matches(err: Option<&(dyn StdError + 'static)>, parts: &[&str]) -> bool {
    match err {
        None => false,
        Some(err) => match err.downcast_ref::<Error>() {
            Some(err) => err.prefix_matches(parts),
            None => codes::has_prefix(codes::INTERNAL_SERVICE, parts),
        },
    }
}

/// [`Error::is`] for any error. Foreign errors and `None` never match.
pub fn is(err: Option<&(dyn StdError + 'static)>, parts: &[&str]) -> bool {
    err.and_then(|err| err.downcast_ref::<Error>())
        .is_some_and(|err| err.is(parts))
}

/// [`Error::matches`] for any error.
///
/// A foreign error is rendered the way [`wrap`](crate::wrap) would render it.
/// `None` never matches.
pub fn matches(err: Option<&(dyn StdError + 'static)>, needle: &str) -> bool {
    match err {
        None => false,
        Some(err) => match err.downcast_ref::<Error>() {
            Some(err) => err.matches(needle),
            None => format!("{}: {err}", codes::INTERNAL_SERVICE).contains(needle),
        },
    }
}

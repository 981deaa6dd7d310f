//! Shorthands for everyday call sites.
//!
//! - [`params!`](crate::params) builds a [`Params`] map inline.
//! - [`ResultExt`] applies the boundary operations to the error side of a
//!   `Result`, so they compose with `?`.
//!
//! ```rust
//! use relay_errors::{ResultExt, params};
//!
//! fn read_config(path: &str) -> relay_errors::Result<String> {
//!     std::fs::read_to_string(path).augment_err("reading config", Some(params! { "path" => path }))
//! }
//!
//! let err = read_config("/definitely/not/here.toml").unwrap_err();
//! assert_eq!(err.code(), "internal_service");
//! assert_eq!(err.param("path"), Some("/definitely/not/here.toml"));
//! ```

use crate::chain::{augment_inner, propagate_inner, wrap_inner};
use crate::{BoxError, Error, Normalized, Params, codes};
use std::result;

/// Build a [`Params`] map from `key => value` pairs.
///
/// Keys and values may be anything implementing `ToString`.
///
/// ```rust
/// use relay_errors::params;
///
/// let attempt = 3;
/// let params = params! { "user_id" => "u-1", "attempt" => attempt };
/// assert_eq!(params["attempt"], "3");
/// assert!(params! {}.is_empty());
/// ```
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut params = $crate::Params::new();
        $(
            params.insert(
                ::std::string::ToString::to_string(&$key),
                ::std::string::ToString::to_string(&$value),
            );
        )*
        params
    }};
}

/// Boundary operations on the error side of a `Result`.
///
/// Each method behaves like the free function of the same name, with the
/// stack (where one is captured) starting at the caller of the method.
pub trait ResultExt<T> {
    /// [`wrap`](crate::wrap) the error.
    fn wrap_err(self, params: Option<Params>) -> crate::Result<T>;

    /// [`augment`](crate::augment) the error with `context`.
    fn augment_err(self, context: impl Into<String>, params: Option<Params>) -> crate::Result<T>;

    /// [`propagate`](crate::propagate) the error.
    fn propagate_err(self) -> crate::Result<T>;
}

impl<T, E: Into<BoxError>> ResultExt<T> for result::Result<T, E> {
    #[inline(never)]
    fn wrap_err(self, params: Option<Params>) -> crate::Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(wrap_inner(
                Normalized::from_any(err),
                params,
                codes::INTERNAL_SERVICE,
                1,
            )),
        }
    }

    #[inline(never)]
    fn augment_err(self, context: impl Into<String>, params: Option<Params>) -> crate::Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(augment_inner(
                Normalized::from_any(err),
                context.into(),
                params,
                1,
            )),
        }
    }

    #[inline(never)]
    fn propagate_err(self) -> crate::Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(propagate_inner(Normalized::from_any(err), 1)),
        }
    }
}

impl Error {
    /// Shorthand for `Err(self)`, for call sites that build and return.
    #[inline]
    pub fn into_result<T>(self) -> crate::Result<T> {
        Err(self)
    }
}

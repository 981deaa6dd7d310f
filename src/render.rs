//! Human-readable renderings of an [`Error`].
//!
//! | Rendering | Shape |
//! |---|---|
//! | `Display` / [`Error::short_string`] | `code: message: cause message: ...` |
//! | [`Error::stack_string`] | one `"\n  file:line in method"` line per frame, `"\n---"` between links |
//! | [`Error::verbose_string`] / [`Error::verbose`] | short form, params, then the stack string |
//!
//! All renderings walk at most [`MAX_CHAIN_DEPTH`](crate::MAX_CHAIN_DEPTH)
//! links. The stack string is additionally capped at
//! [`MAX_STACK_STRING_LEN`] bytes.

use crate::chain::Link;
use crate::logging::truncate_to;
use crate::{Error, Frame, Params};
use std::fmt;

/// Upper bound in bytes for [`Error::stack_string`], truncation marker included.
pub const MAX_STACK_STRING_LEN: usize = 64 * 1024;

/// Written between the stack blocks of consecutive links.
const STACK_DIVIDER: &str = "\n---";

static NO_PARAMS: Params = Params::new();

impl Error {
    fn write_short(&self, f: &mut impl fmt::Write) -> fmt::Result {
        if self.cause.is_none() {
            if self.message.is_empty() {
                return f.write_str(&self.code);
            }
            if self.code.is_empty() {
                return f.write_str(&self.message);
            }
            return write!(f, "{}: {}", self.code, self.message);
        }

        f.write_str(&self.code)?;
        for link in self.links() {
            match link {
                Link::Structured(err) => {
                    f.write_str(": ")?;
                    f.write_str(&err.message)?;
                }
                // Already printed as the wrapping error's message.
                Link::Foreign { echoed: true, .. } => {}
                Link::Foreign { err, echoed: false } => write!(f, ": {err}")?,
            }
        }
        Ok(())
    }

    /// The plain rendering, same as `to_string()`.
    pub fn short_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_short(&mut out);
        out
    }

    /// Every frame of every structured link, innermost link first.
    ///
    /// Links without a stack (e.g. the result of [`augment`](crate::augment))
    /// contribute nothing. The output starts with a newline when non-empty.
    pub fn stack_string(&self) -> String {
        let mut out = String::new();
        let mut blocks = 0usize;

        for link in self.links() {
            let Link::Structured(err) = link else { break };
            if err.stack.is_empty() {
                continue;
            }
            if blocks > 0 {
                out.push_str(STACK_DIVIDER);
            }
            blocks += 1;

            for frame in err.stack.iter() {
                push_frame(&mut out, frame);
                if out.len() > MAX_STACK_STRING_LEN {
                    return truncate_to(&out, MAX_STACK_STRING_LEN).into_owned();
                }
            }
        }
        out
    }

    /// Rendering, params and stack in one string.
    pub fn verbose_string(&self) -> String {
        self.verbose().to_string()
    }

    /// Display adapter producing [`Error::verbose_string`].
    #[inline]
    pub fn verbose(&self) -> Verbose<'_> {
        Verbose(self)
    }
}

fn push_frame(out: &mut String, frame: &Frame) {
    out.push_str("\n  ");
    out.push_str(&frame.filename);
    out.push(':');
    out.push_str(&frame.line.to_string());
    out.push_str(" in ");
    out.push_str(&frame.method);
}

/// Displays an error with its params and stack.
///
/// ```rust
/// use relay_errors::{Error, Frame};
///
/// let err = Error::builder()
///     .code("not_found.foo")
///     .message("missing")
///     .param("id", "7")
///     .frames(vec![Frame::new("svc.rs", 10, "svc::lookup")])
///     .build();
///
/// assert_eq!(
///     err.verbose().to_string(),
///     "not_found.foo: missing\nParams: {\"id\": \"7\"}\n\n  svc.rs:10 in svc::lookup"
/// );
/// ```
#[derive(Clone, Copy)]
pub struct Verbose<'a>(&'a Error);

impl fmt::Display for Verbose<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.0.params().unwrap_or(&NO_PARAMS);
        self.0.write_short(f)?;
        write!(f, "\nParams: {params:?}\n")?;
        f.write_str(&self.0.stack_string())
    }
}

impl fmt::Debug for Verbose<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The short form, whatever the flags. Use [`Error::verbose`] for the rest.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_short(f)
    }
}

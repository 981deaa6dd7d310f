//! Call-stack snapshots taken when an error is constructed.
//!
//! A [`Stack`] is captured once, resolved eagerly, and never re-captured.
//! Frames live behind an `Arc<[Frame]>` so copies of an error made by the
//! wrapping operations share one snapshot instead of duplicating it.
//!
//! Capture is best-effort: optimized builds may inline or elide frames, and
//! binaries without debug info resolve to placeholder file/method names.

use backtrace::Symbol;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// Method recorded for frames whose symbol could not be resolved.
pub const UNKNOWN_METHOD: &str = "<unknown>";

/// Filename recorded for frames without source information.
pub const UNKNOWN_FILE: &str = "<unknown>";

/// Symbol path of the capture routine; frames up to and including it are dropped.
const CAPTURE_SYMBOL: &str = "relay_errors::stack::Stack::capture";

/// One resolved frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Source file of the frame.
    pub filename: String,
    /// Line within `filename`, 0 when unknown.
    pub line: u32,
    /// Demangled symbol path without the trailing hash.
    pub method: String,
    /// Raw instruction address. Process-local, never sent over the wire.
    pub address: usize,
}

impl Frame {
    /// Build a frame from its parts.
    pub fn new(filename: impl Into<String>, line: u32, method: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            line,
            method: method.into(),
            address: 0,
        }
    }

    /// Attach a raw address.
    pub fn with_address(mut self, address: usize) -> Self {
        self.address = address;
        self
    }

    fn from_symbol(symbol: &Symbol, address: usize) -> Self {
        Self {
            filename: symbol
                .filename()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| UNKNOWN_FILE.to_owned()),
            line: symbol.lineno().unwrap_or(0),
            method: symbol
                .name()
                .map(|name| format!("{name:#}"))
                .unwrap_or_else(|| UNKNOWN_METHOD.to_owned()),
            address,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}:{} in {}", self.filename, self.line, self.method)
    }
}

/// Ordered, immutable sequence of frames, innermost first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Stack(Arc<[Frame]>);

impl Stack {
    /// An empty stack.
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Capture the current call stack.
    ///
    /// Frames belonging to the capture machinery are always dropped; `skip`
    /// removes that many further frames (the caller's own constructors).
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let mut ips: Vec<*mut c_void> = Vec::new();
        backtrace::trace(|frame| {
            ips.push(frame.ip());
            true
        });

        let mut resolved = Vec::with_capacity(ips.len());
        for ip in ips {
            let address = ip as usize;
            let mut any = false;
            backtrace::resolve(ip, |symbol| {
                any = true;
                resolved.push(Frame::from_symbol(symbol, address));
            });
            if !any {
                resolved.push(Frame {
                    filename: UNKNOWN_FILE.to_owned(),
                    line: 0,
                    method: UNKNOWN_METHOD.to_owned(),
                    address,
                });
            }
        }

        let start = resolved
            .iter()
            .rposition(|frame| frame.method.starts_with(CAPTURE_SYMBOL))
            .map(|idx| idx + 1)
            .unwrap_or_else(|| {
                resolved
                    .iter()
                    .take_while(|frame| frame.method.starts_with("backtrace::"))
                    .count()
            });

        let start = start.saturating_add(skip).min(resolved.len());
        Self(Arc::from(resolved.split_off(start)))
    }

    /// Wrap already-known frames, e.g. ones received over the wire.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self(Arc::from(frames))
    }

    /// The frames, innermost first.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    /// Iterate the frames.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.0.iter()
    }

    /// Number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether two stacks share the same snapshot allocation.
    #[inline]
    pub fn shares_snapshot(&self, other: &Stack) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn capture_here() -> Stack {
        Stack::capture(0)
    }

    #[test]
    fn capture_produces_frames() {
        let stack = capture_here();
        assert!(!stack.is_empty());
        assert!(
            stack
                .iter()
                .all(|frame| !frame.method.starts_with(CAPTURE_SYMBOL))
        );
    }

    #[test]
    fn skipping_everything_yields_empty_stack() {
        let stack = Stack::capture(usize::MAX);
        assert!(stack.is_empty());
    }

    #[test]
    fn clones_share_the_snapshot() {
        let stack = Stack::from_frames(vec![Frame::new("a.rs", 1, "a::b")]);
        let copy = stack.clone();
        assert!(stack.shares_snapshot(&copy));
        assert!(!stack.shares_snapshot(&Stack::from_frames(stack.frames().to_vec())));
    }

    #[test]
    fn frame_display_format() {
        let frame = Frame::new("src/lib.rs", 42, "svc::handler").with_address(0xdead);
        assert_eq!(frame.to_string(), "  src/lib.rs:42 in svc::handler");
        assert_eq!(frame.address, 0xdead);
    }
}

//! Structured log views of an [`Error`].
//!
//! Two shapes are offered:
//!
//! - [`Error::log_metadata`]: a flat, owned string map for sinks that merge
//!   error context into their own key/value metadata.
//! - [`InternalLog`]: a borrowed view with typed accessors, a bounded
//!   [`InternalLog::write_to`] and [`InternalLog::emit`], which forwards the
//!   record to `tracing`.
//!
//! `InternalLog` borrows from the error that created it and cannot outlive
//! it; build one right where the record is written.
//!
//! This crate never installs a subscriber. Without one, [`InternalLog::emit`]
//! is a no-op.

use crate::{Error, Params};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Maximum length for any individual field in formatted output.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings
pub(crate) const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Metadata key: file of the first frame outside this crate.
pub const METADATA_FILE: &str = "error_file";
/// Metadata key: method of the first frame outside this crate.
pub const METADATA_FUNCTION: &str = "error_function";
/// Metadata key: line of the first frame outside this crate.
pub const METADATA_LINE: &str = "error_line";
/// Metadata key: address of the first frame outside this crate.
pub const METADATA_PC: &str = "error_pc";
/// Metadata key: comma-joined addresses of all frames outside this crate.
pub const METADATA_STACK: &str = "error_stack";

/// Frames whose method starts with this belong to the crate itself.
const CRATE_PATH_PREFIX: &str = "relay_errors::";

// ============================================================================
// Flat Metadata
// ============================================================================

impl Error {
    /// Params plus the location the error came from, as one flat map.
    ///
    /// Frames inside this crate are ignored. When no other frame is left the
    /// params are returned as they are. Params win over the location keys.
    ///
    /// ```rust
    /// use relay_errors::{Error, Frame};
    ///
    /// let err = Error::builder()
    ///     .code("timeout")
    ///     .param("shard", "7")
    ///     .frames(vec![Frame::new("ledger.rs", 88, "ledger::post").with_address(4096)])
    ///     .build();
    ///
    /// let meta = err.log_metadata();
    /// assert_eq!(meta["error_file"], "ledger.rs");
    /// assert_eq!(meta["error_line"], "88");
    /// assert_eq!(meta["error_stack"], "4096");
    /// assert_eq!(meta["shard"], "7");
    /// ```
    pub fn log_metadata(&self) -> Params {
        let params = self.params().cloned().unwrap_or_default();

        let mut frames = self
            .stack
            .iter()
            .filter(|frame| !frame.method.starts_with(CRATE_PATH_PREFIX))
            .peekable();
        let Some(first) = frames.peek().copied() else {
            return params;
        };

        let stack = frames
            .map(|frame| frame.address.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut meta = Params::new();
        meta.insert(METADATA_FILE.to_owned(), first.filename.clone());
        meta.insert(METADATA_FUNCTION.to_owned(), first.method.clone());
        meta.insert(METADATA_LINE.to_owned(), first.line.to_string());
        meta.insert(METADATA_PC.to_owned(), first.address.to_string());
        meta.insert(METADATA_STACK.to_owned(), stack);
        meta.extend(params);
        meta
    }

    /// Borrowed structured view for logging.
    ///
    /// ```rust
    /// use relay_errors::Error;
    ///
    /// let err = Error::not_found("invoice", "no invoice 9", None);
    /// let log = err.internal_log();
    /// assert_eq!(log.code(), "not_found.invoice");
    /// assert!(!log.is_retryable());
    /// ```
    #[inline]
    pub fn internal_log(&self) -> InternalLog<'_> {
        InternalLog {
            code: &self.code,
            message: &self.message,
            params: self.params(),
            message_chain: &self.message_chain,
            cause: self.cause(),
            retryable: self.retryable(),
            unexpected: self.unexpected(),
            marshal_count: self.marshal_count,
        }
    }

    /// Callback-style access to [`Error::internal_log`].
    ///
    /// ```rust
    /// # use relay_errors::Error;
    /// # let err = Error::timeout("", "slow", None);
    /// let line = err.with_internal_log(|log| {
    ///     let mut buffer = String::new();
    ///     log.write_to(&mut buffer).map(|_| buffer)
    /// });
    /// assert!(line.unwrap().starts_with("[timeout] [RETRYABLE]"));
    /// ```
    #[inline]
    pub fn with_internal_log<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&InternalLog<'_>) -> R,
    {
        let log = self.internal_log();
        f(&log)
    }
}

// ============================================================================
// Borrowed Log View
// ============================================================================

/// Structured log entry borrowing from an [`Error`].
///
/// Classification is already resolved: `retryable` and `unexpected` are the
/// effective values, not the raw flags.
#[derive(Debug)]
pub struct InternalLog<'a> {
    code: &'a str,
    message: &'a str,
    params: Option<&'a Params>,
    message_chain: &'a [String],
    cause: Option<&'a (dyn StdError + Send + Sync + 'static)>,
    retryable: bool,
    unexpected: bool,
    marshal_count: u32,
}

impl<'a> InternalLog<'a> {
    /// Write a single-line record without materializing it first.
    ///
    /// Every free-text field is cut at [`MAX_FIELD_OUTPUT_LEN`] bytes with a
    /// visible marker.
    ///
    /// Layout: `[code] [RETRYABLE] [UNEXPECTED] message='…' cause='…'
    /// chain='…' hops=N key='value'…`, omitting parts that do not apply.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "[{}]", truncate_with_indicator(self.code))?;
        if self.retryable {
            f.write_str(" [RETRYABLE]")?;
        }
        if self.unexpected {
            f.write_str(" [UNEXPECTED]")?;
        }
        write!(f, " message='{}'", truncate_with_indicator(self.message))?;

        if let Some(cause) = self.cause {
            let rendered = cause.to_string();
            write!(f, " cause='{}'", truncate_with_indicator(&rendered))?;
        }

        if !self.message_chain.is_empty() {
            let chain = self.message_chain.join(": ");
            write!(f, " chain='{}'", truncate_with_indicator(&chain))?;
        }

        if self.marshal_count > 0 {
            write!(f, " hops={}", self.marshal_count)?;
        }

        for (key, value) in self.params.into_iter().flatten() {
            write!(
                f,
                " {}='{}'",
                truncate_with_indicator(key),
                truncate_with_indicator(value)
            )?;
        }

        Ok(())
    }

    /// Forward this record to `tracing`.
    ///
    /// Unexpected errors are emitted at `ERROR`, everything else at `WARN`.
    /// Code, classification and hop count travel as structured fields; the
    /// event message is the bounded [`InternalLog::write_to`] line.
    pub fn emit(&self) {
        let mut line = String::new();
        if self.write_to(&mut line).is_err() {
            line.clear();
        }
        let line = truncate_to(&line, MAX_FIELD_OUTPUT_LEN * 4);

        if self.unexpected {
            tracing::error!(
                code = self.code,
                retryable = self.retryable,
                unexpected = self.unexpected,
                marshal_count = self.marshal_count,
                "{line}"
            );
        } else {
            tracing::warn!(
                code = self.code,
                retryable = self.retryable,
                unexpected = self.unexpected,
                marshal_count = self.marshal_count,
                "{line}"
            );
        }
    }

    // Untruncated accessors for structured sinks; serialization limits are
    // the sink's business.

    /// The error code.
    #[inline]
    pub const fn code(&self) -> &'a str {
        self.code
    }

    /// The error's own message.
    #[inline]
    pub const fn message(&self) -> &'a str {
        self.message
    }

    /// Params, when present.
    #[inline]
    pub const fn params(&self) -> Option<&'a Params> {
        self.params
    }

    /// Messages of the wrapped errors.
    #[inline]
    pub const fn message_chain(&self) -> &'a [String] {
        self.message_chain
    }

    /// The wrapped error.
    #[inline]
    pub const fn cause(&self) -> Option<&'a (dyn StdError + Send + Sync + 'static)> {
        self.cause
    }

    /// Effective retryability.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Effective unexpectedness.
    #[inline]
    pub const fn is_unexpected(&self) -> bool {
        self.unexpected
    }

    /// Wire hops so far.
    #[inline]
    pub const fn marshal_count(&self) -> u32 {
        self.marshal_count
    }
}

// ============================================================================
// Truncation
// ============================================================================

/// Truncate a string for display to [`MAX_FIELD_OUTPUT_LEN`] bytes.
///
/// Returns a Cow<str> to avoid allocation when no truncation is needed.
pub(crate) fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    truncate_to(s, MAX_FIELD_OUTPUT_LEN)
}

/// Cut `s` to at most `limit` bytes, marker included, on a char boundary.
pub(crate) fn truncate_to(s: &str, limit: usize) -> Cow<'_, str> {
    if s.len() <= limit {
        return Cow::Borrowed(s);
    }

    let budget = limit.saturating_sub(TRUNCATION_INDICATOR.len());
    let kept = s
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|&end| end <= budget)
        .last()
        .unwrap_or(0);

    if kept == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }
    Cow::Owned(format!("{}{TRUNCATION_INDICATOR}", &s[..kept]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frame, MAX_STACK_STRING_LEN, augment, new_internal_with_cause, params};

    #[test]
    fn log_field_fills_its_budget_exactly() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 10);
        let truncated = truncate_with_indicator(&s);

        assert_eq!(truncated.len(), MAX_FIELD_OUTPUT_LEN);
        assert_eq!(
            truncated.strip_suffix(TRUNCATION_INDICATOR),
            Some("a".repeat(MAX_FIELD_OUTPUT_LEN - TRUNCATION_INDICATOR.len()).as_str())
        );
    }

    #[test]
    fn stack_sized_input_at_the_cap_is_borrowed() {
        let s = "\n  svc.rs:1 in svc::f".repeat(MAX_STACK_STRING_LEN);
        let at_cap = &s[..MAX_STACK_STRING_LEN];

        assert!(matches!(truncate_to(at_cap, MAX_STACK_STRING_LEN), Cow::Borrowed(_)));
        assert!(matches!(
            truncate_to(&s[..MAX_STACK_STRING_LEN + 1], MAX_STACK_STRING_LEN),
            Cow::Owned(_)
        ));
    }

    #[test]
    fn stack_cap_cuts_on_a_char_boundary() {
        let frame = "\n  файл.rs:1 in модуль::функция";
        let s = frame.repeat(MAX_STACK_STRING_LEN / frame.len() + 2);
        let truncated = truncate_to(&s, MAX_STACK_STRING_LEN);

        assert!(truncated.len() <= MAX_STACK_STRING_LEN);
        let kept = truncated.strip_suffix(TRUNCATION_INDICATOR).unwrap();
        assert!(s.starts_with(kept));
        assert!(MAX_STACK_STRING_LEN - TRUNCATION_INDICATOR.len() - kept.len() < 4);
    }

    #[test]
    fn four_byte_chars_are_never_split() {
        let s = "🔥".repeat(8);
        assert_eq!(truncate_to(&s, TRUNCATION_INDICATOR.len() + 7), "🔥...[TRUNCATED]");
        assert_eq!(truncate_to(&s, TRUNCATION_INDICATOR.len() + 3), TRUNCATION_INDICATOR);
    }

    #[test]
    fn tiny_limit_yields_only_the_marker() {
        assert_eq!(truncate_to("abcdefghijklmnopqrstuvwxyz", 4), TRUNCATION_INDICATOR);
    }

    #[test]
    fn metadata_uses_first_frame_outside_the_crate() {
        let err = Error::builder()
            .code("bad_request")
            .param("user", "u1")
            .frames(vec![
                Frame::new("src/chain.rs", 10, "relay_errors::chain::wrap").with_address(1),
                Frame::new("svc/handler.rs", 20, "svc::handler::post").with_address(2),
                Frame::new("svc/main.rs", 30, "svc::main").with_address(3),
            ])
            .build();

        let meta = err.log_metadata();
        assert_eq!(
            meta,
            params! {
                "error_file" => "svc/handler.rs",
                "error_function" => "svc::handler::post",
                "error_line" => "20",
                "error_pc" => "2",
                "error_stack" => "2,3",
                "user" => "u1",
            }
        );
    }

    #[test]
    fn metadata_params_win_on_collision() {
        let err = Error::builder()
            .param(METADATA_FILE, "overridden")
            .frames(vec![Frame::new("a.rs", 1, "a::b")])
            .build();
        assert_eq!(err.log_metadata()[METADATA_FILE], "overridden");
    }

    #[test]
    fn metadata_without_usable_frames_is_just_params() {
        let err = Error::builder().param("k", "v").build();
        assert_eq!(err.log_metadata(), params! { "k" => "v" });

        let err = Error::builder()
            .frames(vec![Frame::new("src/lib.rs", 1, "relay_errors::Error::new")])
            .build();
        assert!(err.log_metadata().is_empty());
    }

    #[test]
    fn internal_log_exposes_resolved_fields() {
        let inner = Error::not_found("user", "no such user", None);
        let err = augment(Some(inner), "loading profile", Some(params! { "id" => "7" }))
            .unwrap()
            .with_unexpected(true);

        let log = err.internal_log();
        assert_eq!(log.code(), "not_found.user");
        assert_eq!(log.message(), "loading profile");
        assert_eq!(log.message_chain(), ["no such user"]);
        assert_eq!(log.params().and_then(|p| p.get("id")).map(String::as_str), Some("7"));
        assert!(!log.is_retryable());
        assert!(log.is_unexpected());
        assert!(log.cause().is_some());
    }

    #[test]
    fn write_to_layout() {
        let err = new_internal_with_cause("socket closed", "calling ledger", Some(params! { "shard" => "3" }), "");
        let mut out = String::new();
        err.internal_log().write_to(&mut out).unwrap();
        assert_eq!(
            out,
            "[internal_service] [RETRYABLE] message='calling ledger' cause='socket closed' \
             chain='socket closed' shard='3'"
        );
    }

    #[test]
    fn write_to_truncates_long_fields() {
        let err = Error::new("c", "x".repeat(MAX_FIELD_OUTPUT_LEN * 2), None);
        let mut out = String::new();
        err.internal_log().write_to(&mut out).unwrap();
        assert!(out.contains(TRUNCATION_INDICATOR));
        assert!(out.len() < MAX_FIELD_OUTPUT_LEN + 64);
    }

    // ------------------------------------------------------------------------
    // emit() against a capturing subscriber
    // ------------------------------------------------------------------------

    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    type Captured = Vec<(Level, BTreeMap<&'static str, String>)>;

    #[derive(Default)]
    struct FieldValues(BTreeMap<&'static str, String>);

    impl Visit for FieldValues {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name(), value.to_owned());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name(), format!("{value:?}"));
        }
    }

    #[derive(Clone, Default)]
    struct CaptureLayer(Arc<Mutex<Captured>>);

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = FieldValues::default();
            event.record(&mut fields);
            self.0.lock().unwrap().push((*event.metadata().level(), fields.0));
        }
    }

    fn captured_by(f: impl FnOnce()) -> Captured {
        let layer = CaptureLayer::default();
        let events = Arc::clone(&layer.0);
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), f);
        let captured = events.lock().unwrap().clone();
        captured
    }

    #[test]
    fn emit_unexpected_at_error_with_fields() {
        let err = Error::builder()
            .code("internal_service.db")
            .message("pool exhausted")
            .retryable(false)
            .unexpected(true)
            .marshal_count(2)
            .build();

        let events = captured_by(|| err.internal_log().emit());
        assert_eq!(events.len(), 1);
        let (level, fields) = &events[0];
        assert_eq!(*level, Level::ERROR);
        assert_eq!(fields["code"], "internal_service.db");
        assert_eq!(fields["retryable"], "false");
        assert_eq!(fields["unexpected"], "true");
        assert_eq!(fields["marshal_count"], "2");
        assert!(fields["message"].starts_with("[internal_service.db] [UNEXPECTED] message='pool exhausted'"));
    }

    #[test]
    fn emit_expected_at_warn_with_fields() {
        let err = Error::builder().code("timeout.ledger").message("slow").build();

        let events = captured_by(|| err.internal_log().emit());
        assert_eq!(events.len(), 1);
        let (level, fields) = &events[0];
        assert_eq!(*level, Level::WARN);
        assert_eq!(fields["code"], "timeout.ledger");
        assert_eq!(fields["retryable"], "true");
        assert_eq!(fields["unexpected"], "false");
        assert_eq!(fields["marshal_count"], "0");
        assert_eq!(fields["message"], "[timeout.ledger] [RETRYABLE] message='slow'");
    }

    #[test]
    fn emit_without_subscriber_is_harmless() {
        let err = Error::internal_service("db", "pool exhausted", None).with_unexpected(true);
        err.internal_log().emit();
        Error::not_found("", "", None).internal_log().emit();
    }
}

//! Property-based tests for relay_errors
//!
//! These tests use proptest to generate random inputs and verify invariants hold.

use proptest::prelude::*;
use relay_errors::{
    Error, Frame, MAX_CHAIN_DEPTH, MAX_FIELD_OUTPUT_LEN, MAX_STACK_STRING_LEN, Params, WireError,
    augment, codes, is_retryable, marshal, new_internal_with_cause, propagate, unmarshal, wrap,
};
use std::io;

// ============================================================================
// STRATEGIES
// ============================================================================

fn code_segment() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

fn code() -> impl Strategy<Value = String> {
    prop::collection::vec(code_segment(), 1..4).prop_map(|parts| parts.join("."))
}

fn params() -> impl Strategy<Value = Params> {
    prop::collection::btree_map("[a-z]{1,8}", "\\PC{0,16}", 0..6)
}

fn frames() -> impl Strategy<Value = Vec<Frame>> {
    prop::collection::vec(
        ("[a-z/]{1,20}\\.rs", 0u32..5000, "[a-z:]{1,30}")
            .prop_map(|(file, line, method)| Frame::new(file, line, method)),
        0..8,
    )
}

prop_compose! {
    fn structured_error()(
        code in code(),
        message in "\\PC{0,64}",
        params in prop::option::of(params()),
        frames in frames(),
        retryable in prop::option::of(any::<bool>()),
        unexpected in prop::option::of(any::<bool>()),
        marshal_count in 0u32..1000,
        chain in prop::collection::vec("\\PC{0,16}", 0..4),
    ) -> Error {
        let mut builder = Error::builder()
            .code(code)
            .message(message)
            .frames(frames)
            .marshal_count(marshal_count)
            .message_chain(chain);
        if let Some(params) = params {
            builder = builder.params(params);
        }
        if let Some(retryable) = retryable {
            builder = builder.retryable(retryable);
        }
        if let Some(unexpected) = unexpected {
            builder = builder.unexpected(unexpected);
        }
        builder.build()
    }
}

// ============================================================================
// WIRE CODEC PROPERTIES
// ============================================================================

proptest! {
    /// Every encode adds exactly one hop
    #[test]
    fn marshal_count_is_monotonic(err in structured_error(), hops in 1usize..6) {
        let mut current = err.clone();
        for hop in 1..=hops {
            current = unmarshal(Some(&marshal(Some(&current))));
            prop_assert_eq!(current.marshal_count(), err.marshal_count() + hop as u32);
        }
    }

    /// A hop keeps everything except the cause and the absent/empty distinction
    #[test]
    fn round_trip_preserves_fields(err in structured_error()) {
        let received = unmarshal(Some(&marshal(Some(&err))));

        let expected_code = if err.code().is_empty() { codes::UNKNOWN } else { err.code() };
        prop_assert_eq!(received.code(), expected_code);
        prop_assert_eq!(received.message(), err.message());
        prop_assert_eq!(received.params().cloned().unwrap_or_default(), err.params().cloned().unwrap_or_default());
        prop_assert_eq!(received.retryable_flag(), err.retryable_flag());
        prop_assert_eq!(received.unexpected_flag(), err.unexpected_flag());
        prop_assert_eq!(received.retryable(), err.retryable());
        prop_assert_eq!(received.message_chain(), err.message_chain());
        prop_assert_eq!(received.stack_trace(), err.stack_trace());
    }

    /// JSON transport never changes the record
    #[test]
    fn json_is_lossless(err in structured_error()) {
        let record = marshal(Some(&err));
        let decoded = WireError::from_json(&record.to_json().unwrap()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    /// Arbitrary input never panics the decoder
    #[test]
    fn decoding_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(record) = WireError::from_json_slice(&bytes) {
            let err = unmarshal(Some(&record));
            prop_assert!(!err.code().is_empty());
        }
    }
}

// ============================================================================
// WRAPPING PROPERTIES
// ============================================================================

proptest! {
    /// Wrapping copies; the original keeps its params
    #[test]
    fn wrap_never_mutates_the_original(err in structured_error(), extra in params()) {
        let before = err.params().cloned();
        let wrapped = wrap(Some(err.clone()), Some(extra.clone())).unwrap();
        let _ = augment(Some(err.clone()), "ctx", Some(extra.clone()));

        prop_assert_eq!(err.params().cloned(), before);
        for (key, value) in &extra {
            prop_assert_eq!(wrapped.param(key), Some(value.as_str()));
        }
        prop_assert!(wrapped.stack().shares_snapshot(err.stack()));
    }

    /// Propagating a structured error is the identity
    #[test]
    fn propagate_is_identity_for_structured(err in structured_error()) {
        let out = propagate(Some(err.clone())).unwrap();
        prop_assert_eq!(out.code(), err.code());
        prop_assert_eq!(out.message(), err.message());
        prop_assert!(out.stack().shares_snapshot(err.stack()));
    }

    /// Foreign errors always come out as internal_service with a cause
    #[test]
    fn foreign_errors_become_internal_service(message in "\\PC{1,64}") {
        let out = propagate(Some(io::Error::other(message.clone()))).unwrap();
        prop_assert_eq!(out.code(), codes::INTERNAL_SERVICE);
        prop_assert_eq!(out.message(), message.as_str());
        prop_assert!(out.cause().is_some());
        prop_assert!(is_retryable(Some(io::Error::other(message))));
    }

    /// Augmenting prepends to the message chain
    #[test]
    fn augment_prepends_message(err in structured_error(), context in "\\PC{0,32}") {
        let out = augment(Some(err.clone()), context.clone(), None).unwrap();
        prop_assert_eq!(out.message(), context.as_str());
        prop_assert_eq!(&out.message_chain()[0], err.message());
        prop_assert_eq!(&out.message_chain()[1..], err.message_chain());
        prop_assert_eq!(out.marshal_count(), err.marshal_count());
    }
}

// ============================================================================
// MATCHING PROPERTIES
// ============================================================================

proptest! {
    /// Every leading run of segments matches, through any number of wraps
    #[test]
    fn is_matches_every_prefix(segments in prop::collection::vec(code_segment(), 1..5), depth in 0usize..5) {
        let code = segments.join(".");
        let mut err = Error::new(code.as_str(), "base", None);
        for i in 0..depth {
            err = new_internal_with_cause(err, format!("layer {i}"), None, "");
        }

        for n in 1..=segments.len() {
            let parts: Vec<&str> = segments[..n].iter().map(String::as_str).collect();
            prop_assert!(err.is(&parts));
        }
        prop_assert!(err.is(&[codes::INTERNAL_SERVICE]) || depth == 0);
    }

    /// Prefix matching only looks at the error's own code
    #[test]
    fn prefix_matches_is_starts_with(code in code(), prefix in code()) {
        let err = Error::new(code.as_str(), "", None);
        prop_assert_eq!(err.prefix_matches(&[prefix.as_str()]), code.starts_with(&prefix));
    }
}

// ============================================================================
// RENDERING PROPERTIES
// ============================================================================

proptest! {
    /// Rendering is bounded however deep the chain
    #[test]
    fn rendering_is_bounded(depth in 0usize..(MAX_CHAIN_DEPTH * 2), message in "\\PC{0,32}") {
        let mut err = Error::new("deep", message.as_str(), None);
        for _ in 0..depth {
            err = augment(Some(err), message.as_str(), None).unwrap();
        }
        let rendered = err.to_string();
        prop_assert!(rendered.len() <= "deep".len() + MAX_CHAIN_DEPTH * (message.len() + 2));
        prop_assert!(err.stack_string().len() <= MAX_STACK_STRING_LEN);
    }

    /// Log lines stay valid UTF-8 and bounded
    #[test]
    fn log_line_is_bounded(message in "\\PC{0,5000}", key in "[a-z]{1,8}", value in "\\PC{0,5000}") {
        let mut params = Params::new();
        params.insert(key, value);
        let err = Error::new("bad_request.body", message, Some(params));

        let mut buffer = String::new();
        err.internal_log().write_to(&mut buffer).unwrap();
        prop_assert!(std::str::from_utf8(buffer.as_bytes()).is_ok());
        prop_assert!(buffer.len() < MAX_FIELD_OUTPUT_LEN * 4);
    }
}

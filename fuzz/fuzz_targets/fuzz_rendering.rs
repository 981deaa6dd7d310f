#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_errors::{MAX_STACK_STRING_LEN, augment, new_internal_with_cause};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut parts = text.split('\n');
    let code = parts.next().unwrap_or_default();
    let foreign = parts.next().unwrap_or_default().to_owned();

    let mut err = new_internal_with_cause(foreign, code, None, code);
    for part in parts.take(64) {
        err = match augment(Some(err.clone()), part, None) {
            Some(next) => next,
            None => err,
        };
    }

    let mut line = String::new();
    let _ = err.internal_log().write_to(&mut line);
    let _ = err.to_string();
    assert!(err.stack_string().len() <= MAX_STACK_STRING_LEN);
    let _ = err.is(&[code]);
});

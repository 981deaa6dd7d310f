#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_errors::{WireError, marshal, unmarshal};

fuzz_target!(|data: &[u8]| {
    let Ok(record) = WireError::from_json_slice(data) else {
        return;
    };

    let err = unmarshal(Some(&record));
    assert!(!err.code().is_empty());
    assert!(err.cause().is_none());

    let _ = err.to_string();
    let _ = err.verbose_string();

    let again = marshal(Some(&err));
    assert_eq!(again.marshal_count, record.marshal_count.saturating_add(1));
    assert_eq!(again.message, record.message);
});

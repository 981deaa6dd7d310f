//! Two "services" talking over JSON: the ledger fails, the gateway decides.

use relay_errors::{
    Error, ResultExt, WireError, codes, marshal, new_internal_with_cause, unmarshal,
};
use std::io;

/// Downstream service: fails, then serializes the failure for the response body.
fn ledger_post(amount: u64) -> String {
    let outcome: Result<(), io::Error> = Err(io::Error::new(
        io::ErrorKind::TimedOut,
        "upstream bank did not answer within 2s",
    ));

    let err = match outcome.augment_err("posting transfer", None) {
        Ok(()) => return String::new(),
        Err(err) => err,
    };

    let err = new_internal_with_cause(
        err,
        format!("ledger rejected transfer of {amount}"),
        None,
        "ledger",
    );
    err.internal_log().emit();

    marshal(Some(&err))
        .to_json()
        .unwrap_or_else(|encode_err| format!("{{\"message\":\"{encode_err}\"}}"))
}

/// Upstream service: decodes the body and classifies.
fn gateway(body: &str) -> Error {
    match WireError::from_json(body) {
        Ok(record) => unmarshal(Some(&record)),
        Err(decode_err) => {
            new_internal_with_cause(decode_err, "could not decode ledger response", None, "decode")
                .with_unexpected(true)
        }
    }
}

fn main() {
    println!("--- Service Hop Example ---\n");

    let body = ledger_post(4200);
    println!("1. On the wire:\n   {body}\n");

    let err = gateway(&body);
    println!("2. Received at the gateway:");
    println!("   \"{err}\"");
    println!("   code:          {}", err.code());
    println!("   hops:          {}", err.marshal_count());
    println!("   message chain: {:?}", err.message_chain());
    println!("   is internal_service.ledger? {}", err.is(&[codes::INTERNAL_SERVICE, "ledger"]));
    println!("   retry?        {}", err.retryable());

    println!("\n3. Forwarded again:");
    let forwarded = unmarshal(Some(&marshal(Some(&err))));
    println!("   hops: {}", forwarded.marshal_count());
}

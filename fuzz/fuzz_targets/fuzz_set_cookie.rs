//! Fuzz testing for the `Set-Cookie` splitter.
//!
//! Backend `Set-Cookie` headers are untrusted input. For any string the
//! splitter and the cookie lookup must:
//!
//! - Never panic
//! - Return pieces that are subslices of the input, in order
//! - Return a `token` value that contains no `;`
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_set_cookie
//! cargo +nightly fuzz run fuzz_set_cookie -- -max_total_time=60
//! ```

#![no_main]

use edge_gatekeeper::relay::{find_cookie, split_set_cookie};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    let mut offset = 0;
    for piece in split_set_cookie(header) {
        let found = header[offset..]
            .find(piece)
            .expect("piece must come from the input");
        offset += found + piece.len();
    }

    if let Some(value) = find_cookie([header], "token") {
        assert!(!value.contains(';'));
        assert!(!value.is_empty());
    }
});

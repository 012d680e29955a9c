#![no_main]

use attest_client::{join_session_url, Endpoint};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (base, location) = input.split_once('\n').unwrap_or((input, "session/x"));

    if let Ok(endpoint) = Endpoint::parse(base) {
        assert!(endpoint.as_str().ends_with('/'));
        let url = endpoint.session_url(location);
        assert!(url.starts_with(endpoint.as_str()));
        assert_eq!(url, join_session_url(endpoint.as_str(), location));
    }
});

#![no_main]

use attest_client::ResponseBuffer;
use libfuzzer_sys::fuzz_target;

// First byte picks the limit, the rest is split into chunks on 0xff.
fuzz_target!(|data: &[u8]| {
    let Some((&limit, rest)) = data.split_first() else {
        return;
    };
    let limit = usize::from(limit) * 4;
    let mut buffer = ResponseBuffer::with_limit(Some(limit));
    let mut expected = Vec::new();

    for chunk in rest.split(|b| *b == 0xff) {
        match buffer.append(chunk) {
            Ok(()) => expected.extend_from_slice(chunk),
            Err(_) => {
                assert!(expected.len() + chunk.len() > limit);
                break;
            }
        }
    }

    assert!(buffer.len() <= limit);
    assert_eq!(buffer.as_bytes(), expected.as_slice());
});

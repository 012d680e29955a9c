//! Exit-code mapping for the `attest` binary.

use attest_client::AttestError;

pub use attest_client::exit_codes::*;

/// Map a failed run to its exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AttestError>() {
        Some(e) => e.exit_code(),
        None => INTERNAL_ERROR,
    }
}

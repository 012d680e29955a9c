//! Token file loading.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use attest_client::AttestError;

/// Read a token file of at most `max_bytes` bytes.
///
/// Oversized and empty files are input errors; the file is never truncated.
pub fn read_token(path: &Path, max_bytes: u64) -> anyhow::Result<Vec<u8>> {
    let file =
        File::open(path).with_context(|| format!("token file not found: {}", path.display()))?;

    let mut token = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut token)
        .with_context(|| format!("failed to read token file: {}", path.display()))?;

    if token.is_empty() {
        return Err(AttestError::Input {
            message: format!("token file is empty: {}", path.display()),
        }
        .into());
    }
    if token.len() as u64 > max_bytes {
        return Err(AttestError::Input {
            message: format!(
                "token file exceeds {} bytes: {}",
                max_bytes,
                path.display()
            ),
        }
        .into());
    }

    Ok(token)
}

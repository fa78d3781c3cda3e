//! Blocking payload fetch with cancellation checks

use std::fs::File;
use std::io::Read;

use super::cancel::CancellationToken;
use super::error::AcquireError;
use super::server::Locator;

const READ_CHUNK: usize = 64 * 1024;

pub trait Fetch: Send + Sync {
    /// Fetch the encoded payload behind `locator`. Implementations return
    /// `AcquireError::Cancelled` as soon as they notice `token` is cancelled.
    fn fetch(&self, locator: &Locator, token: &CancellationToken) -> Result<Vec<u8>, AcquireError>;
}

/// Reads `file://` locators from disk, checking the token between chunks
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFetcher;

impl Fetch for FileFetcher {
    fn fetch(&self, locator: &Locator, token: &CancellationToken) -> Result<Vec<u8>, AcquireError> {
        let path = locator
            .file_path()
            .ok_or_else(|| AcquireError::UnsupportedLocator(locator.to_string()))?;
        let io_err = |source| AcquireError::Fetch {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(io_err)?;
        let mut payload = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            token.check()?;
            let read = file.read(&mut chunk).map_err(io_err)?;
            if read == 0 {
                break;
            }
            payload.extend_from_slice(&chunk[..read]);
        }
        Ok(payload)
    }
}

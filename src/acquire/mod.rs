//! Fetching and decoding page images, one superseding request at a time

mod acquisition;
mod cancel;
mod codec;
mod error;
mod fetch;
pub mod server;

pub use acquisition::{AcquisitionEvent, Generation, ImageAcquisition};
pub use cancel::CancellationToken;
pub use codec::decode_bitmap;
pub use error::AcquireError;
pub use fetch::{Fetch, FileFetcher};
pub use server::{FolderServer, ImageServer, Locator, RenderParams};

//! Per-surface acquisition: locate, fetch and decode one page image at a time

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::cancel::CancellationToken;
use super::codec::decode_bitmap;
use super::error::AcquireError;
use super::fetch::Fetch;
use super::server::{ImageServer, RenderParams};
use crate::page::PageId;
use crate::render::Bitmap;

pub type Generation = u64;

#[derive(Debug)]
pub enum AcquisitionEvent {
    Loaded(Bitmap),
    /// Inline error text for the affected surface
    Failed(String),
}

#[derive(Debug)]
struct Outcome {
    generation: Generation,
    result: Result<Bitmap, AcquireError>,
}

/// Runs at most one live acquisition. Starting a new one cancels the
/// previous one first, and results from superseded generations are dropped
/// (which releases their bitmaps) instead of being applied.
pub struct ImageAcquisition {
    server: Arc<dyn ImageServer>,
    fetcher: Arc<dyn Fetch>,
    generation: Generation,
    current: Option<CancellationToken>,
    tx: Sender<Outcome>,
    rx: Receiver<Outcome>,
}

impl ImageAcquisition {
    pub fn new(server: Arc<dyn ImageServer>, fetcher: Arc<dyn Fetch>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            server,
            fetcher,
            generation: 0,
            current: None,
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// An acquisition is in flight and its result has not been applied yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Supersede whatever is in flight and acquire `page` with `params`
    pub fn start(&mut self, page: &PageId, params: RenderParams) -> Generation {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.current = Some(token.clone());

        let server = Arc::clone(&self.server);
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let page_id = page.clone();

        debug!("Acquiring {page} (generation {generation})");
        let spawned = std::thread::Builder::new()
            .name(format!("acquire-{}", page.index))
            .spawn(move || {
                let result = acquire(server.as_ref(), fetcher.as_ref(), &page_id, &params, &token);
                let _ = tx.send(Outcome { generation, result });
            });

        if let Err(e) = spawned {
            let _ = self.tx.send(Outcome {
                generation,
                result: Err(AcquireError::Spawn(e)),
            });
        }
        generation
    }

    /// Abort the in-flight acquisition, if any. Its result will never be applied.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
            debug!("Cancelled acquisition generation {}", self.generation);
        }
    }

    /// Apply whatever has arrived, without blocking
    pub fn poll(&mut self) -> Option<AcquisitionEvent> {
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(event) = self.accept(outcome) {
                return Some(event);
            }
        }
        None
    }

    /// Block until the current acquisition resolves or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<AcquisitionEvent> {
        let deadline = Instant::now() + timeout;
        while self.current.is_some() {
            match self.rx.recv_deadline(deadline) {
                Ok(outcome) => {
                    if let Some(event) = self.accept(outcome) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        None
    }

    fn accept(&mut self, outcome: Outcome) -> Option<AcquisitionEvent> {
        if outcome.generation != self.generation || self.current.is_none() {
            debug!("Dropping stale acquisition generation {}", outcome.generation);
            return None;
        }
        self.current = None;

        match outcome.result {
            Ok(bitmap) => Some(AcquisitionEvent::Loaded(bitmap)),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                warn!("Acquisition failed: {e}");
                Some(AcquisitionEvent::Failed(e.to_string()))
            }
        }
    }
}

impl Drop for ImageAcquisition {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn acquire(
    server: &dyn ImageServer,
    fetcher: &dyn Fetch,
    page: &PageId,
    params: &RenderParams,
    token: &CancellationToken,
) -> Result<Bitmap, AcquireError> {
    token.check()?;
    let locator = server.page_locator(page, params)?;
    token.check()?;
    let payload = fetcher.fetch(&locator, token)?;
    token.check()?;
    let bitmap = decode_bitmap(&payload)?;
    token.check()?;
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{ImageFormat, RgbaImage};

    use super::*;
    use crate::acquire::server::Locator;
    use crate::page::SourceId;
    use crate::view::{FitMode, Rotation};

    struct IndexServer;

    impl ImageServer for IndexServer {
        fn page_locator(&self, page: &PageId, _: &RenderParams) -> Result<Locator, AcquireError> {
            Ok(Locator::new(format!("mem://{}", page.index)))
        }

        fn thumb_locator(&self, page: &PageId, _: u32) -> Result<Locator, AcquireError> {
            Ok(Locator::new(format!("mem://{}", page.index)))
        }
    }

    /// Page `n` is an (n+1)x1 PNG; page 0 is slow, page 9 is corrupt
    struct MemFetcher {
        calls: AtomicUsize,
    }

    impl Fetch for MemFetcher {
        fn fetch(&self, locator: &Locator, token: &CancellationToken) -> Result<Vec<u8>, AcquireError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index: u32 = locator.as_str()["mem://".len()..].parse().unwrap();
            if index == 0 {
                std::thread::sleep(Duration::from_millis(150));
            }
            token.check()?;
            if index == 9 {
                return Ok(b"garbage".to_vec());
            }
            let mut bytes = Vec::new();
            RgbaImage::new(index + 1, 1)
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .unwrap();
            Ok(bytes)
        }
    }

    fn acquisition() -> ImageAcquisition {
        ImageAcquisition::new(
            Arc::new(IndexServer),
            Arc::new(MemFetcher {
                calls: AtomicUsize::new(0),
            }),
        )
    }

    fn page(index: u32) -> PageId {
        PageId::new(SourceId::new("mem"), index)
    }

    fn params() -> RenderParams {
        RenderParams {
            fit: FitMode::FitContain,
            viewport_w: 100,
            viewport_h: 100,
            scale: 1.0,
            rotation: Rotation::Deg0,
            dpi: 1.0,
        }
    }

    #[test]
    fn only_latest_generation_applies() {
        let mut acq = acquisition();
        acq.start(&page(0), params());
        let second = acq.start(&page(2), params());
        assert_eq!(second, 2);

        match acq.wait(Duration::from_secs(5)) {
            Some(AcquisitionEvent::Loaded(bitmap)) => assert_eq!(bitmap.dimensions(), (3, 1)),
            other => panic!("expected page 2, got {other:?}"),
        }
        std::thread::sleep(Duration::from_millis(300));
        assert!(acq.poll().is_none());
    }

    #[test]
    fn failure_is_reported_as_text() {
        let mut acq = acquisition();
        acq.start(&page(9), params());
        match acq.wait(Duration::from_secs(5)) {
            Some(AcquisitionEvent::Failed(text)) => assert!(text.contains("decode")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!acq.is_pending());
    }

    #[test]
    fn cancel_is_silent() {
        let mut acq = acquisition();
        acq.start(&page(0), params());
        acq.cancel();
        assert!(!acq.is_pending());
        assert!(acq.wait(Duration::from_millis(10)).is_none());
        std::thread::sleep(Duration::from_millis(300));
        assert!(acq.poll().is_none());
    }
}

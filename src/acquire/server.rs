//! Image-serving collaborator: page ids to fetchable locators

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::AcquireError;
use crate::page::{PageId, PageMeta};
use crate::view::{FitMode, Rotation};

const FILE_SCHEME: &str = "file://";

/// Fetchable address of an encoded image payload
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `file://` path with any query string stripped
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        let rest = self.0.strip_prefix(FILE_SCHEME)?;
        let path = rest.split_once('?').map_or(rest, |(path, _)| path);
        Some(PathBuf::from(path))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters a server may use to render the payload for one page
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RenderParams {
    pub fit: FitMode,
    pub viewport_w: u32,
    pub viewport_h: u32,
    pub scale: f32,
    pub rotation: Rotation,
    pub dpi: f32,
}

impl RenderParams {
    fn query(&self) -> String {
        format!(
            "fit={}&w={}&h={}&scale={:.3}&rotation={}&dpi={}",
            self.fit,
            self.viewport_w,
            self.viewport_h,
            self.scale,
            self.rotation.degrees(),
            self.dpi
        )
    }
}

pub trait ImageServer: Send + Sync {
    fn page_locator(&self, page: &PageId, params: &RenderParams) -> Result<Locator, AcquireError>;

    /// Locator for a thumbnail whose longest edge is `longest` pixels
    fn thumb_locator(&self, page: &PageId, longest: u32) -> Result<Locator, AcquireError>;
}

/// Serves pages straight from their files in a folder.
/// Thumbnails reuse the page file; the longest edge is passed along as a hint.
#[derive(Clone, Debug)]
pub struct FolderServer {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FolderServer {
    pub fn new(root: impl Into<PathBuf>, pages: &[PageMeta]) -> Self {
        let root = root.into();
        let files = pages.iter().map(|p| root.join(&p.rel_path)).collect();
        Self { root, files }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, page: &PageId) -> Result<&Path, AcquireError> {
        self.files
            .get(page.index as usize)
            .map(PathBuf::as_path)
            .ok_or_else(|| AcquireError::UnknownPage {
                source_id: page.source_id.to_string(),
                index: page.index,
            })
    }
}

impl ImageServer for FolderServer {
    fn page_locator(&self, page: &PageId, params: &RenderParams) -> Result<Locator, AcquireError> {
        let path = self.file_for(page)?;
        Ok(Locator::new(format!(
            "{FILE_SCHEME}{}?{}",
            path.display(),
            params.query()
        )))
    }

    fn thumb_locator(&self, page: &PageId, longest: u32) -> Result<Locator, AcquireError> {
        let path = self.file_for(page)?;
        Ok(Locator::new(format!(
            "{FILE_SCHEME}{}?thumb={longest}",
            path.display()
        )))
    }
}

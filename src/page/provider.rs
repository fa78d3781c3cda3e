//! Page metadata listing for a folder of images

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use walkdir::WalkDir;

use super::types::{PageId, PageMeta, SourceId};

/// Supported image file extensions (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "avif"];

/// Source of ordered page metadata
pub trait PageProvider {
    fn list_pages(&self, source_id: &SourceId) -> Result<Vec<PageMeta>>;
}

/// Lists the images directly inside one directory, in natural order
#[derive(Clone, Debug)]
pub struct FolderPages {
    root: PathBuf,
}

impl FolderPages {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect_entries(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            bail!("{:?} is not a directory", self.root);
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Failed to read {:?}", self.root))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if is_hidden(path) || !is_supported_image(path) {
                continue;
            }
            let rel = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
            entries.push(rel);
        }

        entries.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        Ok(entries)
    }
}

impl PageProvider for FolderPages {
    fn list_pages(&self, source_id: &SourceId) -> Result<Vec<PageMeta>> {
        let entries = self.collect_entries()?;
        debug!("Found {} pages in {:?}", entries.len(), self.root);

        let pages = entries
            .into_iter()
            .enumerate()
            .map(|(index, rel_path)| {
                let (width, height) = match imagesize::size(self.root.join(&rel_path)) {
                    Ok(size) => (size.width as u32, size.height as u32),
                    Err(e) => {
                        warn!("Failed to read image size for {rel_path:?}: {e}");
                        (0, 0)
                    }
                };
                PageMeta {
                    id: PageId::new(source_id.clone(), index as u32),
                    rel_path,
                    width,
                    height,
                    is_double_spread: width > height,
                }
            })
            .collect();

        Ok(pages)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('.'))
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Case-insensitive comparison treating digit runs as numbers ("2" < "10")
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let a_tokens = tokenize(&a_lower);
    let b_tokens = tokenize(&b_lower);

    for (lhs, rhs) in a_tokens.iter().zip(b_tokens.iter()) {
        let ord = match (lhs, rhs) {
            (Token::Number(a_digits, a_val), Token::Number(b_digits, b_val)) => a_val
                .cmp(b_val)
                .then_with(|| a_digits.len().cmp(&b_digits.len())),
            (Token::Text(a_text), Token::Text(b_text)) => a_text.cmp(b_text),
            (Token::Number(..), Token::Text(..)) => Ordering::Less,
            (Token::Text(..), Token::Number(..)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    a_tokens.len().cmp(&b_tokens.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Number(&'a str, u128),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let bytes = input.as_bytes();
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx].is_ascii_digit() {
            if text_start < idx {
                tokens.push(Token::Text(&input[text_start..idx]));
            }
            let start = idx;
            while idx < bytes.len() && bytes[idx].is_ascii_digit() {
                idx += 1;
            }
            let digits = &input[start..idx];
            tokens.push(Token::Number(digits, digits.parse().unwrap_or(u128::MAX)));
            text_start = idx;
        } else {
            idx += 1;
        }
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }

    tokens
}

//! Page grouping: turns a flat page list plus a layout mode into display units

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::PageMeta;

/// How pages are arranged in the viewport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One page at a time
    #[default]
    Single,
    /// Facing pages, spreads shown alone
    Double,
    /// Continuous vertical strip
    Vertical,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Single => "single",
            LayoutMode::Double => "double",
            LayoutMode::Vertical => "vertical",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            "vertical" => Ok(Self::Vertical),
            other => Err(format!("unknown layout mode: {other}")),
        }
    }
}

/// A display unit: one page, or two facing pages in double layout.
///
/// `start_index..=end_index` is the range of source positions covered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageGroup {
    pub id: String,
    pub pages: Vec<PageMeta>,
    pub start_index: usize,
    pub end_index: usize,
}

impl PageGroup {
    fn new(pages: Vec<PageMeta>, start_index: usize) -> Self {
        let end_index = start_index + pages.len().saturating_sub(1);
        Self {
            id: format!("{start_index}-{end_index}"),
            pages,
            start_index,
            end_index,
        }
    }

    #[must_use]
    pub fn contains(&self, page_index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&page_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Group `pages` for the given layout mode
#[must_use]
pub fn group_pages(pages: &[PageMeta], mode: LayoutMode) -> Vec<PageGroup> {
    match mode {
        LayoutMode::Single | LayoutMode::Vertical => pages
            .iter()
            .enumerate()
            .map(|(idx, page)| PageGroup::new(vec![page.clone()], idx))
            .collect(),
        LayoutMode::Double => group_double(pages),
    }
}

// The first page always stands alone (cover). A flagged spread is never
// paired, and a page is never paired with a following spread.
fn group_double(pages: &[PageMeta]) -> Vec<PageGroup> {
    let mut groups = Vec::with_capacity(pages.len() / 2 + 1);
    let mut idx = 0;

    while idx < pages.len() {
        let current = &pages[idx];

        if idx == 0 || current.is_double_spread {
            groups.push(PageGroup::new(vec![current.clone()], idx));
            idx += 1;
            continue;
        }

        match pages.get(idx + 1) {
            Some(next) if !next.is_double_spread => {
                groups.push(PageGroup::new(vec![current.clone(), next.clone()], idx));
                idx += 2;
            }
            _ => {
                groups.push(PageGroup::new(vec![current.clone()], idx));
                idx += 1;
            }
        }
    }

    groups
}

/// Index of the group owning `page_index`.
///
/// Indices outside every range clamp to the nearest boundary group.
#[must_use]
pub fn group_index_for_page(groups: &[PageGroup], page_index: usize) -> usize {
    if groups.is_empty() {
        return 0;
    }

    let found = groups.binary_search_by(|group| {
        if group.end_index < page_index {
            std::cmp::Ordering::Less
        } else if group.start_index > page_index {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });

    match found {
        Ok(idx) => idx,
        Err(insert_at) => insert_at.min(groups.len() - 1),
    }
}

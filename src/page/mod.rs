//! Page metadata and display grouping

pub mod grouping;
pub mod provider;
mod types;

pub use grouping::{LayoutMode, PageGroup, group_index_for_page, group_pages};
pub use provider::{FolderPages, PageProvider};
pub use types::*;

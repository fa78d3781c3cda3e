pub mod acquire;
pub mod page;
pub mod panic_handler;
pub mod render;
pub mod settings;
pub mod view;
pub mod viewport;

pub use page::{LayoutMode, PageGroup, PageId, PageMeta, SourceId, group_index_for_page, group_pages};
pub use view::{FitMode, Offset, Rotation, ViewAction, ViewState, ZoomLimits};
pub use viewport::{ReadingDirection, RenderSurface, ViewportComposer};

//! Arranges render surfaces for the active layout mode

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use super::surface::{RenderSurface, SurfaceFactory};
use crate::page::{LayoutMode, PageGroup, PageMeta, Rect, Size, group_index_for_page, group_pages};
use crate::view::{Point, ViewAction, ViewState, ZoomLimits};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl ReadingDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingDirection::LeftToRight => "ltr",
            ReadingDirection::RightToLeft => "rtl",
        }
    }
}

impl fmt::Display for ReadingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ltr" | "left_to_right" => Ok(ReadingDirection::LeftToRight),
            "rtl" | "right_to_left" => Ok(ReadingDirection::RightToLeft),
            other => Err(format!("unknown reading direction: {other}")),
        }
    }
}

/// Where one page goes. In vertical mode `rect` is in scroll-content
/// coordinates; otherwise it is in viewport coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slot {
    pub group_index: usize,
    pub page: PageMeta,
    pub rect: Rect,
    pub active: bool,
}

struct Mounted {
    surface: RenderSurface,
    rect: Rect,
}

pub struct ViewportComposer<F: SurfaceFactory> {
    factory: F,
    pages: Vec<PageMeta>,
    layout: LayoutMode,
    direction: ReadingDirection,
    groups: Vec<PageGroup>,
    active_group: usize,
    view: ViewState,
    limits: ZoomLimits,
    viewport: Size,
    device_pixel_ratio: f32,
    scroll_top: f32,
    /// Keyed by page index
    mounted: BTreeMap<usize, Mounted>,
}

impl<F: SurfaceFactory> ViewportComposer<F> {
    pub fn new(
        factory: F,
        pages: Vec<PageMeta>,
        layout: LayoutMode,
        direction: ReadingDirection,
        view: ViewState,
        limits: ZoomLimits,
    ) -> Self {
        let groups = group_pages(&pages, layout);
        Self {
            factory,
            pages,
            layout,
            direction,
            groups,
            active_group: 0,
            view,
            limits,
            viewport: Size::default(),
            device_pixel_ratio: 1.0,
            scroll_top: 0.0,
            mounted: BTreeMap::new(),
        }
    }

    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    pub fn groups(&self) -> &[PageGroup] {
        &self.groups
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn direction(&self) -> ReadingDirection {
        self.direction
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn active_group(&self) -> usize {
        self.active_group
    }

    /// First page of the active group, if any
    pub fn active_page(&self) -> Option<usize> {
        self.groups.get(self.active_group).map(|g| g.start_index)
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_pages(&mut self, pages: Vec<PageMeta>) {
        let keep = self.active_page().unwrap_or(0);
        self.pages = pages;
        self.regroup(keep);
    }

    pub fn set_viewport(&mut self, viewport: Size, device_pixel_ratio: f32) {
        self.viewport = viewport;
        self.device_pixel_ratio = device_pixel_ratio;
        self.center_active();
        self.remount();
    }

    /// Switch layout, staying on the group that owns the current page
    pub fn set_layout_mode(&mut self, layout: LayoutMode) {
        if layout == self.layout {
            return;
        }
        let keep = self.active_page().unwrap_or(0);
        self.layout = layout;
        self.regroup(keep);
    }

    pub fn set_reading_direction(&mut self, direction: ReadingDirection) {
        if direction != self.direction {
            self.direction = direction;
            self.remount();
        }
    }

    fn regroup(&mut self, page_index: usize) {
        self.groups = group_pages(&self.pages, self.layout);
        self.active_group = group_index_for_page(&self.groups, page_index);
        debug!(
            "{} pages in {} groups ({}), active group {}",
            self.pages.len(),
            self.groups.len(),
            self.layout,
            self.active_group
        );
        self.center_active();
        self.remount();
    }

    /// Make the group owning `page_index` active. Returns true if it changed.
    pub fn set_active_page(&mut self, page_index: usize) -> bool {
        let group = group_index_for_page(&self.groups, page_index);
        self.set_active_group(group)
    }

    pub fn set_active_group(&mut self, group: usize) -> bool {
        if self.groups.is_empty() {
            return false;
        }
        let group = group.min(self.groups.len() - 1);
        if group == self.active_group {
            return false;
        }
        self.active_group = group;
        self.center_active();
        self.remount();
        true
    }

    pub fn next_group(&mut self) -> bool {
        self.set_active_group(self.active_group + 1)
    }

    pub fn prev_group(&mut self) -> bool {
        match self.active_group.checked_sub(1) {
            Some(group) => self.set_active_group(group),
            None => false,
        }
    }

    /// User scroll in vertical mode; does not change the active group
    pub fn set_scroll_top(&mut self, scroll_top: f32) {
        if self.layout != LayoutMode::Vertical || !scroll_top.is_finite() {
            return;
        }
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll());
        self.remount();
    }

    /// Reduce once against the shared state and fan out to every surface
    pub fn apply(&mut self, action: ViewAction) -> bool {
        let next = self.view.reduce(action, &self.limits);
        self.share_view(next, None)
    }

    /// Wheel tick at `at` in viewport coordinates. The surface under the
    /// pointer computes the focal offset; the others only take the new zoom.
    pub fn wheel(&mut self, at: Point, delta_y: f32) -> bool {
        let hit = self
            .mounted
            .iter()
            .map(|(&index, m)| (index, self.screen_rect(m.rect)))
            .find(|(_, rect)| rect.contains(at.x, at.y));

        let (next, origin) = match hit {
            Some((index, rect)) => {
                let local = Point::new(at.x - rect.x, at.y - rect.y);
                let Some(mounted) = self.mounted.get_mut(&index) else {
                    return false;
                };
                match mounted.surface.wheel(local, delta_y) {
                    Some(next) => (next, Some(index)),
                    None => return false,
                }
            }
            None => match self.view.wheel_zoom(delta_y, &self.limits) {
                Some(next) => (next, None),
                None => return false,
            },
        };
        self.share_view(next, origin)
    }

    fn share_view(&mut self, next: ViewState, skip: Option<usize>) -> bool {
        if next == self.view {
            return false;
        }
        self.view = next;
        for (index, mounted) in &mut self.mounted {
            if Some(*index) != skip {
                mounted.surface.set_view(next);
            }
        }
        true
    }

    /// Slots for the current layout. Vertical mode lays out every group.
    pub fn slots(&self) -> Vec<Slot> {
        let Some(active) = self.groups.get(self.active_group) else {
            return Vec::new();
        };
        let (vw, vh) = (self.viewport.width, self.viewport.height);

        match self.layout {
            LayoutMode::Single => vec![Slot {
                group_index: self.active_group,
                page: active.pages[0].clone(),
                rect: Rect::new(0.0, 0.0, vw, vh),
                active: true,
            }],

            LayoutMode::Double => {
                let pages = self.ordered(active);
                let half = vw / 2.0;
                let rects: Vec<Rect> = match pages.as_slice() {
                    // A spread already shows two pages, so alone it takes the full width.
                    [page] if page.is_double_spread => vec![Rect::new(0.0, 0.0, vw, vh)],
                    [_] => vec![Rect::new(half / 2.0, 0.0, half, vh)],
                    _ => vec![Rect::new(0.0, 0.0, half, vh), Rect::new(half, 0.0, half, vh)],
                };
                pages
                    .into_iter()
                    .zip(rects)
                    .map(|(page, rect)| Slot {
                        group_index: self.active_group,
                        page: page.clone(),
                        rect,
                        active: true,
                    })
                    .collect()
            }

            LayoutMode::Vertical => {
                let mut slots = Vec::with_capacity(self.pages.len());
                let mut top = 0.0;
                for (group_index, group) in self.groups.iter().enumerate() {
                    let row_height = self.row_height(group);
                    let width = vw / group.len() as f32;
                    for (i, page) in self.ordered(group).into_iter().enumerate() {
                        slots.push(Slot {
                            group_index,
                            page: page.clone(),
                            rect: Rect::new(i as f32 * width, top, width, row_height),
                            active: group_index == self.active_group,
                        });
                    }
                    top += row_height;
                }
                slots
            }
        }
    }

    /// Slots that currently get a surface
    pub fn visible_slots(&self) -> Vec<Slot> {
        let mut slots = self.slots();
        if self.layout == LayoutMode::Vertical {
            let (top, bottom) = (self.scroll_top, self.scroll_top + self.viewport.height);
            slots.retain(|s| s.active || s.rect.intersects_rows(top, bottom));
        }
        slots
    }

    fn ordered<'a>(&self, group: &'a PageGroup) -> Vec<&'a PageMeta> {
        let mut pages: Vec<&PageMeta> = group.pages.iter().collect();
        if self.direction == ReadingDirection::RightToLeft {
            pages.reverse();
        }
        pages
    }

    /// Vertical strip: pages fit the column width, the row takes the tallest
    fn row_height(&self, group: &PageGroup) -> f32 {
        let width = self.viewport.width / group.len().max(1) as f32;
        group
            .pages
            .iter()
            .map(|p| {
                if p.width > 0 && p.height > 0 {
                    width * p.height as f32 / p.width as f32
                } else {
                    self.viewport.height
                }
            })
            .fold(0.0, f32::max)
    }

    pub fn content_height(&self) -> f32 {
        match self.layout {
            LayoutMode::Vertical => self.groups.iter().map(|g| self.row_height(g)).sum(),
            _ => self.viewport.height,
        }
    }

    fn max_scroll(&self) -> f32 {
        (self.content_height() - self.viewport.height).max(0.0)
    }

    fn center_active(&mut self) {
        if self.layout != LayoutMode::Vertical {
            self.scroll_top = 0.0;
            return;
        }
        let top: f32 = self.groups[..self.active_group.min(self.groups.len())]
            .iter()
            .map(|g| self.row_height(g))
            .sum();
        let height = self
            .groups
            .get(self.active_group)
            .map_or(0.0, |g| self.row_height(g));
        let centered = top + height / 2.0 - self.viewport.height / 2.0;
        self.scroll_top = centered.clamp(0.0, self.max_scroll());
    }

    fn screen_rect(&self, rect: Rect) -> Rect {
        match self.layout {
            LayoutMode::Vertical => Rect::new(rect.x, rect.y - self.scroll_top, rect.width, rect.height),
            _ => rect,
        }
    }

    /// Create surfaces for newly displayed slots, update the rest, dispose the gone
    fn remount(&mut self) {
        let slots = self.visible_slots();
        let wanted: BTreeMap<usize, Slot> = slots.into_iter().map(|s| (s.page.index(), s)).collect();

        let gone: Vec<usize> = self
            .mounted
            .keys()
            .filter(|index| !wanted.contains_key(index))
            .copied()
            .collect();
        for index in gone {
            if let Some(mut mounted) = self.mounted.remove(&index) {
                mounted.surface.dispose();
            }
        }

        for (index, slot) in wanted {
            let mounted = self.mounted.entry(index).or_insert_with(|| Mounted {
                surface: self.factory.create_surface(),
                rect: slot.rect,
            });
            mounted.rect = slot.rect;
            mounted.surface.set_view(self.view);
            mounted.surface.resize(slot.rect.size(), self.device_pixel_ratio);
            mounted.surface.set_page(Some(slot.page));
        }
    }

    pub fn surface(&self, page_index: usize) -> Option<&RenderSurface> {
        self.mounted.get(&page_index).map(|m| &m.surface)
    }

    pub fn surface_mut(&mut self, page_index: usize) -> Option<&mut RenderSurface> {
        self.mounted.get_mut(&page_index).map(|m| &mut m.surface)
    }

    /// Mounted surfaces with their on-screen rectangles, in page order
    pub fn surfaces(&self) -> impl Iterator<Item = (Rect, &RenderSurface)> {
        self.mounted
            .values()
            .map(|m| (self.screen_rect(m.rect), &m.surface))
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// One display refresh: apply finished acquisitions, then paint.
    /// Returns how many surfaces painted on this thread.
    pub fn tick(&mut self) -> usize {
        let mut painted = 0;
        for mounted in self.mounted.values_mut() {
            mounted.surface.poll();
            if mounted.surface.on_frame() {
                painted += 1;
            }
        }
        painted
    }

    /// Block until every mounted surface has finished loading (or `timeout`),
    /// then run one refresh. Returns true if nothing is still loading.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        for mounted in self.mounted.values_mut() {
            while mounted.surface.is_loading() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                mounted.surface.wait(remaining);
            }
        }
        self.tick();
        self.mounted.values().all(|m| !m.surface.is_loading())
    }

    /// Dispose every surface
    pub fn dispose(&mut self) {
        for (_, mut mounted) in std::mem::take(&mut self.mounted) {
            mounted.surface.dispose();
        }
    }
}

impl<F: SurfaceFactory> Drop for ViewportComposer<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

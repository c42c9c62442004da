//! The capabilities the overlay needs from the window manager around it.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::sys::geometry::Rect;
use crate::sys::scene::ActorId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(id: u64) -> Self { Self(id) }

    pub const fn get(self) -> u64 { self.0 }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MonitorId(u32);

impl MonitorId {
    pub const fn new(id: u32) -> Self { Self(id) }

    pub const fn as_u32(self) -> u32 { self.0 }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Monitor {
    pub id: MonitorId,
    pub rect: Rect,
}

/// Which edge of the monitor a stack overlay covers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppIconSource {
    pub app_id: String,
    pub icon_name: String,
}

pub trait WindowHandle {
    /// The committed frame, which lags behind while the window animates.
    fn frame_rect(&self) -> Rect;

    /// Where the window is animating to horizontally, if it is moving.
    fn destination_x(&self) -> Option<f64>;

    fn visual_element(&self) -> ActorId;

    fn app_icon_source(&self) -> Option<&AppIconSource>;
}

/// The slice of the layout engine the overlays read from.
pub trait Tiling {
    type Window: WindowHandle;

    fn window(&self, id: WindowId) -> Option<&Self::Window>;

    /// Window order of the space `id` belongs to, left to right.
    fn space_of(&self, id: WindowId) -> Option<&[WindowId]>;

    fn minimap_offset(&self, id: WindowId) -> (f64, f64);

    fn panel_height(&self) -> f64;

    /// The window bounding a `direction` overlay that stands in for `id`.
    ///
    /// A left overlay covers the sliver left of the window after `id`, a right
    /// overlay the sliver right of the window before it.
    fn neighbour(&self, id: WindowId, direction: Direction) -> Option<WindowId> {
        let space = self.space_of(id)?;
        let idx = space.iter().position(|&w| w == id)?;
        let neighbour = match direction {
            Direction::Left => space.get(idx + 1),
            Direction::Right => idx.checked_sub(1).and_then(|i| space.get(i)),
        };
        neighbour.copied()
    }
}

use crate::common::collections::HashMap;
use crate::model::window::{AppIconSource, Tiling, WindowHandle, WindowId};
use crate::sys::geometry::{Point, Rect};
use crate::sys::scene::{ActorId, Scene};

#[derive(Debug, Clone)]
pub struct StaticWindow {
    frame: Rect,
    destination_x: Option<f64>,
    actor: ActorId,
    app: Option<AppIconSource>,
    minimap_offset: (f64, f64),
}

impl WindowHandle for StaticWindow {
    fn frame_rect(&self) -> Rect { self.frame }

    fn destination_x(&self) -> Option<f64> { self.destination_x }

    fn visual_element(&self) -> ActorId { self.actor }

    fn app_icon_source(&self) -> Option<&AppIconSource> { self.app.as_ref() }
}

/// A layout engine stand-in holding fixed window state, used by the binary
/// and by tests.
#[derive(Debug, Default)]
pub struct StaticTiling {
    windows: HashMap<WindowId, StaticWindow>,
    spaces: Vec<Vec<WindowId>>,
    panel_height: f64,
}

impl StaticTiling {
    pub fn new(panel_height: f64) -> Self {
        Self {
            panel_height,
            ..Default::default()
        }
    }

    /// Registers a window and creates its actor in the window group.
    pub fn add_window(&mut self, scene: &mut Scene, id: WindowId, frame: Rect) -> ActorId {
        let actor = scene.add_window_actor(id, frame);
        self.windows.insert(id, StaticWindow {
            frame,
            destination_x: None,
            actor,
            app: None,
            minimap_offset: (0.0, 0.0),
        });
        actor
    }

    pub fn remove_window(&mut self, scene: &mut Scene, id: WindowId) {
        if let Some(window) = self.windows.remove(&id) {
            scene.destroy(window.actor);
        }
        for space in &mut self.spaces {
            space.retain(|&w| w != id);
        }
    }

    /// Adds a space with windows ordered left to right.
    pub fn add_space(&mut self, windows: Vec<WindowId>) { self.spaces.push(windows); }

    pub fn set_app(&mut self, id: WindowId, app: Option<AppIconSource>) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.app = app;
        }
    }

    /// Commits a new frame, ending any animation toward a destination.
    pub fn set_frame(&mut self, scene: &mut Scene, id: WindowId, frame: Rect) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.frame = frame;
            window.destination_x = None;
            scene.set_rect(window.actor, frame);
        }
    }

    /// Starts (or with `None`, ends) an animation toward `x`. The committed
    /// frame and the actor stay where they are.
    pub fn set_destination_x(&mut self, id: WindowId, x: Option<f64>) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.destination_x = x;
        }
    }

    /// Moves the window's actor without committing a frame, like an in-flight
    /// animation frame.
    pub fn move_actor(&self, scene: &mut Scene, id: WindowId, origin: Point) {
        if let Some(window) = self.windows.get(&id) {
            scene.set_position(window.actor, origin);
        }
    }

    pub fn set_minimap_offset(&mut self, id: WindowId, offset: (f64, f64)) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.minimap_offset = offset;
        }
    }

    pub fn set_panel_height(&mut self, height: f64) { self.panel_height = height; }

    /// Every window in space order, bottom to top as the host would stack them.
    pub fn window_order(&self) -> Vec<WindowId> { self.spaces.iter().flatten().copied().collect() }
}

impl Tiling for StaticTiling {
    type Window = StaticWindow;

    fn window(&self, id: WindowId) -> Option<&StaticWindow> { self.windows.get(&id) }

    fn space_of(&self, id: WindowId) -> Option<&[WindowId]> {
        self.spaces.iter().find(|space| space.contains(&id)).map(Vec::as_slice)
    }

    fn minimap_offset(&self, id: WindowId) -> (f64, f64) {
        self.windows.get(&id).map_or((0.0, 0.0), |w| w.minimap_offset)
    }

    fn panel_height(&self) -> f64 { self.panel_height }
}

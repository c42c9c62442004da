use crate::model::window::AppIconSource;
use crate::sys::geometry::Rect;
use crate::sys::scene::{ActorContent, ActorId, Scene, SceneError};

pub const MISSING_ICON: &str = "icon-missing";

/// Adds a `size`-square app icon under `parent`, falling back to the
/// placeholder icon when the window has no resolvable application.
pub fn create_app_icon(
    scene: &mut Scene,
    parent: ActorId,
    source: Option<&AppIconSource>,
    size: f64,
) -> Result<ActorId, SceneError> {
    let name = source.map_or(MISSING_ICON, |s| s.icon_name.as_str());
    let icon = scene.add_actor(parent, "stack-overlay-icon", ActorContent::Icon {
        name: name.to_owned(),
        size,
    })?;
    scene.set_rect(icon, Rect::new(0.0, 0.0, size, size));
    Ok(icon)
}

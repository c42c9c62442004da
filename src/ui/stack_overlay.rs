//! Clickable strips standing in for the visible sliver of stacked windows.
//!
//! Only a few pixels of a stacked window are on screen, and clicking it starts
//! an animation that moves the window under the pointer before the button is
//! released. The strip swallows the press and turns the release into a plain
//! activation of the window it stands in for, wherever the release lands.
//!
//! Strips live in the window group so they can paint directly above their
//! target, between it and the windows stacked over it. The host resets that
//! group to true window order whenever window stacking changes, so each strip
//! subscribes to the restack notification and re-inserts itself.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::actor::overlay_manager::{Request, RequestSender};
use crate::common::config::OverlaySettings;
use crate::model::server::StripData;
use crate::model::window::{Direction, Tiling, WindowHandle, WindowId};
use crate::sys::geometry::{Point, Rect};
use crate::sys::scene::{
    ActorContent, ActorId, EventPropagation, Scene, SceneError, Signal, SignalHandlerId,
};
use crate::ui::icon::create_app_icon;

/// Vertical nudge of the icon below the top of the window it decorates.
const ICON_TOP_OFFSET: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    window: WindowId,
    actor: ActorId,
}

/// State shared between an overlay and the handlers it connects.
pub(crate) struct StripState {
    strip: ActorId,
    target: Cell<Option<Target>>,
    icon: Cell<Option<ActorId>>,
}

impl StripState {
    /// Untargets and hides the strip. The icon belonged to the old target, so
    /// it goes too.
    pub(crate) fn clear(&self, scene: &mut Scene) {
        self.target.set(None);
        self.drop_icon(scene);
        scene.hide(self.strip);
    }

    fn drop_icon(&self, scene: &mut Scene) {
        if let Some(icon) = self.icon.take() {
            scene.destroy(icon);
        }
    }

    /// Puts the strip directly above its target's actor. Returns false if the
    /// target's actor can no longer be stacked against.
    fn sync_stacking(&self, scene: &mut Scene) -> bool {
        let Some(target) = self.target.get() else { return true };
        match scene.set_child_above_sibling(self.strip, target.actor) {
            Ok(moved) => {
                if moved {
                    trace!(window = ?target.window, "strip restacked above target");
                }
                true
            }
            Err(e) => {
                debug!(window = ?target.window, "cannot restack strip: {e}");
                false
            }
        }
    }
}

/// Computes the strip covering the sliver next to `neighbour`.
///
/// The neighbour's animation destination is preferred over its committed
/// frame, since this is routinely called while windows are still moving.
pub fn resolve_strip(
    direction: Direction,
    monitor: Rect,
    neighbour: &impl WindowHandle,
    top: f64,
    height: f64,
    gap: f64,
) -> Rect {
    let frame = neighbour.frame_rect();
    let neighbour_x = neighbour.destination_x().unwrap_or(frame.x);
    match direction {
        Direction::Left => Rect::new(monitor.x, top, (neighbour_x - gap).max(0.0), height),
        Direction::Right => {
            let x = neighbour_x + frame.width + gap;
            Rect::new(x, top, (monitor.max_x() - x).max(0.0), height)
        }
    }
}

pub struct StackOverlay {
    direction: Direction,
    monitor: Rect,
    show_icon: bool,
    settings: OverlaySettings,
    state: Rc<StripState>,
    press_id: SignalHandlerId,
    release_id: SignalHandlerId,
    restack_id: SignalHandlerId,
}

impl StackOverlay {
    pub fn new(
        scene: &mut Scene,
        direction: Direction,
        monitor: Rect,
        show_icon: bool,
        settings: OverlaySettings,
        panel_height: f64,
        requests: RequestSender,
    ) -> Result<Self, SceneError> {
        let strip = scene.add_actor(scene.window_group(), "stack-overlay", ActorContent::Plain)?;
        scene.set_reactive(strip, true);
        scene.hide(strip);

        let state = Rc::new(StripState {
            strip,
            target: Cell::new(None),
            icon: Cell::new(None),
        });

        // Swallow the press so the mostly hidden window never sees it.
        let press_id = scene.connect(strip, Signal::ButtonPress, |_, _| EventPropagation::Stop);

        let release_state = state.clone();
        let release_id = scene.connect(strip, Signal::ButtonRelease, move |_, event| {
            if let Some(target) = release_state.target.get() {
                debug!(window = ?target.window, "activating stacked window");
                requests.send(Request::ActivateWindow {
                    window: target.window,
                    time: event.time,
                });
            }
            EventPropagation::Stop
        });

        let restack_state = state.clone();
        let restack_id = scene.connect_restacked(move |scene, _| {
            if !restack_state.sync_stacking(scene) {
                restack_state.clear(scene);
            }
            EventPropagation::Propagate
        });

        let overlay = Self {
            direction,
            monitor,
            show_icon,
            settings,
            state,
            press_id,
            release_id,
            restack_id,
        };
        let rect = Rect::new(
            monitor.x,
            overlay.strip_top(panel_height),
            overlay.settings.stack_margin,
            overlay.strip_height(panel_height),
        );
        scene.set_rect(strip, rect);
        Ok(overlay)
    }

    pub fn direction(&self) -> Direction { self.direction }

    pub fn monitor(&self) -> Rect { self.monitor }

    pub fn strip(&self) -> ActorId { self.state.strip }

    pub fn icon(&self) -> Option<ActorId> { self.state.icon.get() }

    pub fn target(&self) -> Option<WindowId> { self.state.target.get().map(|t| t.window) }

    pub fn is_visible(&self, scene: &Scene) -> bool { scene.is_visible(self.state.strip) }

    pub(crate) fn shared(&self) -> Rc<StripState> { self.state.clone() }

    fn strip_top(&self, panel_height: f64) -> f64 {
        self.monitor.y + panel_height + self.settings.margin_tb
    }

    fn strip_height(&self, panel_height: f64) -> f64 {
        (self.monitor.height - panel_height - self.settings.margin_tb).max(0.0)
    }

    pub fn set_monitor(&mut self, monitor: Rect) { self.monitor = monitor; }

    pub fn update_settings(&mut self, settings: OverlaySettings) {
        self.show_icon = settings.show_icon;
        self.settings = settings;
    }

    fn bail(&self, scene: &mut Scene) -> bool {
        self.state.clear(scene);
        false
    }

    /// Points the strip at `window`, the stacked window it should activate.
    ///
    /// Returns false, leaving the strip hidden and untargeted, when `window`
    /// is `None` or has no neighbour in this overlay's direction (the window
    /// is at the end of its stack).
    pub fn set_target(
        &mut self,
        scene: &mut Scene,
        tiling: &impl Tiling,
        window: Option<WindowId>,
    ) -> bool {
        let Some(window) = window else { return self.bail(scene) };

        let panel_height = tiling.panel_height();
        let top = self.strip_top(panel_height);
        let height = self.strip_height(panel_height);

        let Some(handle) = tiling.window(window) else {
            debug!(?window, direction = %self.direction, "target window is gone");
            return self.bail(scene);
        };
        let Some(neighbour) =
            tiling.neighbour(window, self.direction).and_then(|n| tiling.window(n))
        else {
            debug!(?window, direction = %self.direction, "no neighbour, hiding strip");
            return self.bail(scene);
        };

        let gap = self.settings.window_gap;
        let rect = resolve_strip(self.direction, self.monitor, neighbour, top, height, gap);
        scene.set_rect(self.state.strip, rect);
        self.state.target.set(Some(Target {
            window,
            actor: handle.visual_element(),
        }));

        if self.show_icon {
            self.update_icon(scene, tiling);
        } else {
            self.state.drop_icon(scene);
        }

        if !self.state.sync_stacking(scene) {
            return self.bail(scene);
        }

        scene.set_opacity(self.state.strip, u8::MAX);
        scene.show(self.state.strip);
        debug!(?window, direction = %self.direction, ?rect, "strip targeted");
        true
    }

    /// Rebuilds the app icon of the current target inside the strip.
    pub fn update_icon(&self, scene: &mut Scene, tiling: &impl Tiling) {
        self.state.drop_icon(scene);
        let Some(target) = self.state.target.get() else { return };
        let Some(handle) = tiling.window(target.window) else { return };
        let (Some(strip), Some(actor)) = (scene.rect(self.state.strip), scene.rect(target.actor))
        else {
            return;
        };

        let size = self.settings.icon_size;
        let inset = self.settings.icon_inset;
        let icon = match create_app_icon(scene, self.state.strip, handle.app_icon_source(), size)
        {
            Ok(icon) => icon,
            Err(e) => {
                warn!("failed to create stack overlay icon: {e}");
                return;
            }
        };

        // A window this far left is docked at the screen edge; keep the icon
        // on that edge instead of against the neighbour.
        let x = if actor.x <= self.settings.stack_margin {
            inset
        } else {
            strip.width - inset - size
        };
        let (_, dy) = tiling.minimap_offset(target.window);
        let y = actor.y + dy + ICON_TOP_OFFSET - strip.y;
        scene.set_position(icon, Point::new(x, y));
        self.state.icon.set(Some(icon));
    }

    /// Fades the strip out. Target and visibility are left alone.
    pub fn fade_out(&self, scene: &mut Scene) {
        scene.ease_opacity(self.state.strip, 0, self.settings.fade_duration());
    }

    pub fn snapshot(&self, scene: &Scene) -> StripData {
        StripData {
            direction: self.direction,
            visible: self.is_visible(scene),
            target: self.target(),
            frame: scene.rect(self.state.strip).unwrap_or_default(),
            icon: self.icon().and_then(|icon| scene.rect(icon)),
        }
    }

    /// Disconnects every handler before the strip (and its icon) is destroyed.
    pub fn destroy(self, scene: &mut Scene) {
        scene.disconnect(self.press_id);
        scene.disconnect(self.release_id);
        scene.disconnect(self.restack_id);
        scene.destroy(self.state.strip);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor::{self, Receiver};
    use crate::model::tiling::StaticTiling;
    use crate::model::window::AppIconSource;

    const A: WindowId = WindowId::new(1);
    const B: WindowId = WindowId::new(2);
    const C: WindowId = WindowId::new(3);
    const MONITOR: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

    struct Fixture {
        scene: Scene,
        tiling: StaticTiling,
        rx: Receiver<Request>,
        left: StackOverlay,
        right: StackOverlay,
    }

    fn settings() -> OverlaySettings {
        OverlaySettings {
            window_gap: 8.0,
            ..Default::default()
        }
    }

    fn fixture(show_icon: bool) -> Fixture {
        let mut scene = Scene::new();
        let mut tiling = StaticTiling::new(27.0);
        tiling.add_window(&mut scene, A, Rect::new(0.0, 35.0, 392.0, 1000.0));
        tiling.add_window(&mut scene, B, Rect::new(400.0, 35.0, 600.0, 1000.0));
        tiling.add_window(&mut scene, C, Rect::new(1008.0, 35.0, 900.0, 1000.0));
        tiling.add_space(vec![A, B, C]);

        let (tx, rx) = actor::channel();
        let mut new_overlay = |direction| {
            StackOverlay::new(&mut scene, direction, MONITOR, show_icon, settings(), 27.0, tx.clone())
                .unwrap()
        };
        let left = new_overlay(Direction::Left);
        let right = new_overlay(Direction::Right);
        Fixture { scene, tiling, rx, left, right }
    }

    fn actor_of(f: &Fixture, window: WindowId) -> ActorId {
        f.tiling.window(window).unwrap().visual_element()
    }

    #[test]
    fn new_strip_is_hidden_with_default_extent() {
        let f = fixture(false);
        assert!(!f.left.is_visible(&f.scene));
        assert_eq!(f.left.target(), None);
        assert_eq!(f.scene.rect(f.left.strip()), Some(Rect::new(0.0, 29.0, 75.0, 1051.0)));
    }

    #[test]
    fn left_strip_ends_a_gap_before_the_next_window() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert_eq!(f.left.target(), Some(A));
        assert!(f.left.is_visible(&f.scene));
        assert_eq!(f.scene.rect(f.left.strip()), Some(Rect::new(0.0, 29.0, 392.0, 1051.0)));
    }

    #[test]
    fn right_strip_starts_a_gap_after_the_previous_window() {
        let mut f = fixture(false);
        assert!(f.right.set_target(&mut f.scene, &f.tiling, Some(C)));
        assert_eq!(f.scene.rect(f.right.strip()), Some(Rect::new(1008.0, 29.0, 912.0, 1051.0)));
    }

    #[test]
    fn stack_ends_have_no_strip() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(!f.left.set_target(&mut f.scene, &f.tiling, Some(C)));
        assert_eq!(f.left.target(), None);
        assert!(!f.left.is_visible(&f.scene));

        assert!(!f.right.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(!f.right.is_visible(&f.scene));
    }

    #[test]
    fn clearing_the_target_hides_the_strip() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(!f.left.set_target(&mut f.scene, &f.tiling, None));
        assert_eq!(f.left.target(), None);
        assert!(!f.left.is_visible(&f.scene));
    }

    #[test]
    fn unknown_target_degrades_to_inactive() {
        let mut f = fixture(false);
        assert!(!f.left.set_target(&mut f.scene, &f.tiling, Some(WindowId::new(42))));
        assert!(!f.left.is_visible(&f.scene));
    }

    #[test]
    fn animating_neighbour_is_measured_at_its_destination() {
        let mut f = fixture(false);
        f.tiling.set_destination_x(B, Some(700.0));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert_eq!(f.scene.rect(f.left.strip()).unwrap().width, 692.0);

        f.tiling.set_destination_x(B, Some(100.0));
        assert!(f.right.set_target(&mut f.scene, &f.tiling, Some(C)));
        let rect = f.scene.rect(f.right.strip()).unwrap();
        assert_eq!((rect.x, rect.width), (708.0, 1212.0));
    }

    #[test]
    fn destination_is_a_snapshot_not_a_binding() {
        let mut f = fixture(false);
        f.tiling.set_destination_x(B, Some(700.0));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        f.tiling.set_destination_x(B, Some(300.0));
        assert_eq!(f.scene.rect(f.left.strip()).unwrap().width, 692.0);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert_eq!(f.scene.rect(f.left.strip()).unwrap().width, 292.0);
    }

    #[test]
    fn overlapping_geometry_clamps_width_to_zero() {
        let mut f = fixture(false);
        f.tiling.set_destination_x(B, Some(3.0));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert_eq!(f.scene.rect(f.left.strip()).unwrap().width, 0.0);

        f.tiling.set_destination_x(B, Some(1900.0));
        assert!(f.right.set_target(&mut f.scene, &f.tiling, Some(C)));
        assert_eq!(f.scene.rect(f.right.strip()).unwrap().width, 0.0);
    }

    #[test]
    fn strip_follows_panel_height_changes() {
        let mut f = fixture(false);
        f.tiling.set_panel_height(40.0);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let rect = f.scene.rect(f.left.strip()).unwrap();
        assert_eq!((rect.y, rect.height), (42.0, 1038.0));
    }

    #[test]
    fn strip_paints_directly_above_its_target() {
        let mut f = fixture(false);
        assert!(f.right.set_target(&mut f.scene, &f.tiling, Some(C)));
        assert!(f.scene.is_immediately_above(f.right.strip(), actor_of(&f, C)));

        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(f.scene.is_immediately_above(f.left.strip(), actor_of(&f, A)));
        assert!(f.scene.is_immediately_above(f.right.strip(), actor_of(&f, C)));
    }

    #[test_log::test]
    fn host_restack_is_undone_by_the_subscription() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(f.right.set_target(&mut f.scene, &f.tiling, Some(C)));

        let order = f.tiling.window_order();
        f.scene.sync_window_stacking(&order);
        assert!(f.scene.is_immediately_above(f.left.strip(), actor_of(&f, A)));
        assert!(f.scene.is_immediately_above(f.right.strip(), actor_of(&f, C)));

        f.scene.sync_window_stacking(&[C, B, A]);
        assert!(f.scene.is_immediately_above(f.left.strip(), actor_of(&f, A)));
        assert!(f.scene.is_immediately_above(f.right.strip(), actor_of(&f, C)));
    }

    #[test]
    fn restack_after_target_vanished_deactivates_strip() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        f.tiling.remove_window(&mut f.scene, A);
        let order = f.tiling.window_order();
        f.scene.sync_window_stacking(&order);
        assert_eq!(f.left.target(), None);
        assert!(!f.left.is_visible(&f.scene));
    }

    #[test]
    fn press_is_swallowed_and_release_activates_target() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));

        assert_eq!(f.scene.button_press(Point::new(380.0, 500.0), 10), EventPropagation::Stop);
        assert_eq!(f.scene.button_press(Point::new(380.0, 500.0), 11), EventPropagation::Stop);
        assert!(f.rx.try_recv().is_err());

        assert_eq!(f.scene.button_release(Point::new(20.0, 900.0), 12), EventPropagation::Stop);
        let (_, request) = f.rx.try_recv().unwrap();
        assert_eq!(request, Request::ActivateWindow { window: A, time: 12 });
    }

    #[test]
    fn hidden_strip_receives_no_input() {
        let mut f = fixture(false);
        assert_eq!(
            f.scene.button_release(Point::new(20.0, 500.0), 1),
            EventPropagation::Propagate
        );
        assert!(f.rx.try_recv().is_err());
    }

    #[test]
    fn icon_docks_left_for_window_at_screen_edge() {
        let mut f = fixture(true);
        f.tiling.set_minimap_offset(A, (0.0, 6.0));
        f.tiling.set_app(A, Some(AppIconSource {
            app_id: "firefox.desktop".into(),
            icon_name: "firefox".into(),
        }));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));

        let icon = f.left.icon().unwrap();
        // actor.y (35) + dy (6) + 4 - strip.y (29)
        assert_eq!(f.scene.rect(icon), Some(Rect::new(2.0, 16.0, 20.0, 20.0)));
        assert!(matches!(
            f.scene.actor(icon).unwrap().content(),
            ActorContent::Icon { name, .. } if name == "firefox"
        ));
    }

    #[test]
    fn icon_right_aligns_for_window_away_from_edge() {
        let mut f = fixture(true);
        f.tiling.move_actor(&mut f.scene, A, Point::new(76.0, 35.0));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let icon = f.scene.rect(f.left.icon().unwrap()).unwrap();
        assert_eq!(icon.x, 392.0 - 2.0 - 20.0);
    }

    #[test]
    fn icon_is_rebuilt_not_accumulated() {
        let mut f = fixture(true);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let first = f.left.icon().unwrap();
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(!f.scene.contains(first));
        assert_eq!(f.scene.children(f.left.strip()).len(), 1);
    }

    #[test]
    fn losing_the_target_drops_its_icon() {
        let mut f = fixture(true);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let icon = f.left.icon().unwrap();

        assert!(!f.left.set_target(&mut f.scene, &f.tiling, Some(C)));
        assert!(!f.scene.contains(icon));
        assert_eq!(f.left.icon(), None);
        assert_eq!(f.left.snapshot(&f.scene).icon, None);
        assert!(f.scene.children(f.left.strip()).is_empty());

        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert!(!f.left.set_target(&mut f.scene, &f.tiling, None));
        assert_eq!(f.left.icon(), None);
        assert!(f.scene.children(f.left.strip()).is_empty());
    }

    #[test]
    fn disabling_icons_drops_the_previous_targets_icon() {
        let mut f = fixture(true);
        f.tiling.set_app(A, Some(AppIconSource {
            app_id: "firefox.desktop".into(),
            icon_name: "firefox".into(),
        }));
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let icon = f.left.icon().unwrap();

        f.left.update_settings(OverlaySettings {
            show_icon: false,
            ..settings()
        });
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(B)));
        assert!(f.left.is_visible(&f.scene));
        assert!(!f.scene.contains(icon));
        assert_eq!(f.left.icon(), None);
        assert!(f.scene.children(f.left.strip()).is_empty());
    }

    #[test]
    fn fade_out_leaves_target_alone() {
        let mut f = fixture(false);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        f.left.fade_out(&mut f.scene);
        f.scene.advance(std::time::Duration::from_millis(250));
        assert_eq!(f.scene.actor(f.left.strip()).unwrap().opacity(), 0);
        assert_eq!(f.left.target(), Some(A));
        assert!(f.left.is_visible(&f.scene));

        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        assert_eq!(f.scene.actor(f.left.strip()).unwrap().opacity(), u8::MAX);
    }

    #[test]
    fn destroy_disconnects_before_removing_the_strip() {
        let mut f = fixture(true);
        assert!(f.left.set_target(&mut f.scene, &f.tiling, Some(A)));
        let strip = f.left.strip();
        let icon = f.left.icon().unwrap();
        let Fixture { mut scene, tiling, left, .. } = f;
        left.destroy(&mut scene);
        assert!(!scene.contains(strip));
        assert!(!scene.contains(icon));
        assert_eq!(scene.handler_count(scene.window_group()), 1);

        let order = tiling.window_order();
        scene.sync_window_stacking(&order);
    }
}

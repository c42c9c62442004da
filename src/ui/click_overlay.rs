//! Per-monitor pair of stack overlays plus a catcher that notices when the
//! pointer leaves the stack interaction.

use std::rc::Rc;

use tracing::debug;

use crate::actor::overlay_manager::{Request, RequestSender};
use crate::common::config::OverlaySettings;
use crate::model::server::OverlayData;
use crate::model::window::{Direction, Monitor};
use crate::sys::geometry::Rect;
use crate::sys::scene::{
    ActorContent, ActorId, EventPropagation, Scene, SceneError, Signal, SignalHandlerId,
};
use crate::ui::stack_overlay::{StackOverlay, StripState};

pub struct ClickOverlay {
    monitor: Monitor,
    pub left: StackOverlay,
    pub right: StackOverlay,
    catcher: ActorId,
    enter_id: SignalHandlerId,
}

fn reset_parts(scene: &mut Scene, strips: &[Rc<StripState>], catcher: ActorId) {
    for strip in strips {
        strip.clear(scene);
    }
    scene.set_size(catcher, 0.0, 0.0);
}

impl ClickOverlay {
    pub fn new(
        scene: &mut Scene,
        monitor: Monitor,
        settings: &OverlaySettings,
        panel_height: f64,
        requests: RequestSender,
    ) -> Result<Self, SceneError> {
        let new_overlay = |scene: &mut Scene, direction| {
            StackOverlay::new(
                scene,
                direction,
                monitor.rect,
                settings.show_icon,
                settings.clone(),
                panel_height,
                requests.clone(),
            )
        };
        let left = new_overlay(scene, Direction::Left)?;
        let right = match new_overlay(scene, Direction::Right) {
            Ok(right) => right,
            Err(e) => {
                left.destroy(scene);
                return Err(e);
            }
        };
        let catcher =
            match scene.add_actor(scene.ui_group(), "stack-overlay-catcher", ActorContent::Plain) {
                Ok(catcher) => catcher,
                Err(e) => {
                    left.destroy(scene);
                    right.destroy(scene);
                    return Err(e);
                }
            };
        scene.set_reactive(catcher, true);
        scene.set_rect(catcher, Rect::ZERO.with_origin(monitor.rect.origin()));

        let strips = [left.shared(), right.shared()];
        let enter_id = scene.connect(catcher, Signal::Enter, move |scene, event| {
            debug!(monitor = ?monitor.id, "pointer left the stack, resetting");
            reset_parts(scene, &strips, catcher);
            requests.send(Request::ActivateWorkspace {
                monitor: monitor.id,
                time: event.time,
            });
            EventPropagation::Stop
        });

        Ok(Self {
            monitor,
            left,
            right,
            catcher,
            enter_id,
        })
    }

    pub fn monitor(&self) -> Monitor { self.monitor }

    pub fn catcher(&self) -> ActorId { self.catcher }

    pub fn overlay(&self, direction: Direction) -> &StackOverlay {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    pub fn overlay_mut(&mut self, direction: Direction) -> &mut StackOverlay {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    pub fn is_active(&self, scene: &Scene) -> bool {
        scene.rect(self.catcher).is_some_and(|r| !r.is_empty())
    }

    /// Spreads the catcher over the whole monitor so the pointer entering it
    /// anywhere is noticed.
    pub fn activate(&self, scene: &mut Scene) { scene.set_rect(self.catcher, self.monitor.rect); }

    /// Untargets both strips and shrinks the catcher away.
    pub fn reset(&self, scene: &mut Scene) {
        reset_parts(scene, &[self.left.shared(), self.right.shared()], self.catcher);
    }

    /// Follows a monitor move or resize. An active catcher stays spread over
    /// the whole (new) monitor.
    pub fn update_monitor(&mut self, scene: &mut Scene, rect: Rect) {
        let active = self.is_active(scene);
        self.monitor.rect = rect;
        self.left.set_monitor(rect);
        self.right.set_monitor(rect);
        if active {
            self.activate(scene);
        } else {
            scene.set_rect(self.catcher, Rect::ZERO.with_origin(rect.origin()));
        }
    }

    pub fn update_settings(&mut self, settings: &OverlaySettings) {
        self.left.update_settings(settings.clone());
        self.right.update_settings(settings.clone());
    }

    pub fn snapshot(&self, scene: &Scene) -> OverlayData {
        OverlayData {
            monitor: self.monitor.id,
            monitor_frame: self.monitor.rect,
            catcher: scene.rect(self.catcher).unwrap_or_default(),
            left: self.left.snapshot(scene),
            right: self.right.snapshot(scene),
        }
    }

    /// Disconnects the catcher's handler, then tears down both strips and the
    /// catcher itself.
    pub fn destroy(self, scene: &mut Scene) {
        scene.disconnect(self.enter_id);
        self.left.destroy(scene);
        self.right.destroy(scene);
        scene.destroy(self.catcher);
    }
}

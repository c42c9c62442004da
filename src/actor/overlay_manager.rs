//! Owns the click overlays of every managed monitor.
//!
//! The layout engine tells the manager which monitors exist and which windows
//! are stacked; the manager keeps one [`ClickOverlay`] per monitor in sync with
//! that and forwards the user's intent back out as [`Request`]s.

use tracing::{debug, info, instrument, warn};

use crate::actor;
use crate::common::collections::{HashMap, HashSet, hash_map};
use crate::common::config::{Config, OverlaySettings};
use crate::model::server::OverlayData;
use crate::model::window::{Monitor, MonitorId, Tiling, WindowId};
use crate::sys::scene::Scene;
use crate::ui::ClickOverlay;

/// Effects the overlays ask the window manager to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Raise and focus `window`.
    ActivateWindow { window: WindowId, time: u32 },
    /// Bring the workspace shown on `monitor` to the foreground.
    ActivateWorkspace { monitor: MonitorId, time: u32 },
}

pub type RequestSender = actor::Sender<Request>;

#[derive(Debug, Clone)]
pub enum Event {
    /// The full set of managed monitors. Always sent before any other event.
    ScreenParametersChanged(Vec<Monitor>),
    /// The windows that should be reachable through the left and right strips
    /// of `monitor`. `None` clears a strip.
    StackTargetsChanged {
        monitor: MonitorId,
        left: Option<WindowId>,
        right: Option<WindowId>,
    },
    /// The pointer's monitor changed; every other monitor starts watching for
    /// the pointer to come back in.
    ActiveMonitorChanged(MonitorId),
    ResetMonitor(MonitorId),
    ConfigUpdated(Config),
}

pub struct OverlayManager {
    settings: OverlaySettings,
    requests: RequestSender,
    overlays: HashMap<MonitorId, ClickOverlay>,
}

impl OverlayManager {
    pub fn new(settings: OverlaySettings, requests: RequestSender) -> Self {
        Self {
            settings,
            requests,
            overlays: HashMap::default(),
        }
    }

    pub fn settings(&self) -> &OverlaySettings { &self.settings }

    pub fn overlay(&self, monitor: MonitorId) -> Option<&ClickOverlay> {
        self.overlays.get(&monitor)
    }

    pub fn overlay_mut(&mut self, monitor: MonitorId) -> Option<&mut ClickOverlay> {
        self.overlays.get_mut(&monitor)
    }

    pub fn monitors(&self) -> impl Iterator<Item = MonitorId> + '_ { self.overlays.keys().copied() }

    pub fn handle_event(&mut self, scene: &mut Scene, tiling: &impl Tiling, event: Event) {
        match event {
            Event::ScreenParametersChanged(monitors) => {
                self.screens_changed(scene, tiling, &monitors);
            }
            Event::StackTargetsChanged { monitor, left, right } => {
                self.set_targets(scene, tiling, monitor, left, right);
            }
            Event::ActiveMonitorChanged(active) => self.active_monitor_changed(scene, active),
            Event::ResetMonitor(monitor) => match self.overlays.get(&monitor) {
                Some(overlay) => overlay.reset(scene),
                None => debug!(?monitor, "reset for unmanaged monitor ignored"),
            },
            Event::ConfigUpdated(config) => self.update_settings(config.overlay),
        }
    }

    /// Creates overlays for newly managed monitors, follows geometry changes
    /// of known ones and tears down overlays of monitors that went away.
    #[instrument(skip_all, fields(monitors = monitors.len()))]
    pub fn screens_changed(&mut self, scene: &mut Scene, tiling: &impl Tiling, monitors: &[Monitor]) {
        let present: HashSet<MonitorId> = monitors.iter().map(|m| m.id).collect();
        let gone: Vec<MonitorId> =
            self.overlays.keys().copied().filter(|id| !present.contains(id)).collect();
        for id in gone {
            if let Some(overlay) = self.overlays.remove(&id) {
                info!(monitor = ?id, "monitor no longer managed, removing overlay");
                overlay.destroy(scene);
            }
        }

        for monitor in monitors {
            match self.overlays.entry(monitor.id) {
                hash_map::Entry::Occupied(mut entry) => {
                    if entry.get().monitor().rect != monitor.rect {
                        debug!(monitor = ?monitor.id, rect = ?monitor.rect, "monitor geometry changed");
                        entry.get_mut().update_monitor(scene, monitor.rect);
                    }
                }
                hash_map::Entry::Vacant(entry) => {
                    match ClickOverlay::new(
                        scene,
                        *monitor,
                        &self.settings,
                        tiling.panel_height(),
                        self.requests.clone(),
                    ) {
                        Ok(overlay) => {
                            info!(monitor = ?monitor.id, "managing monitor");
                            entry.insert(overlay);
                        }
                        Err(e) => warn!(monitor = ?monitor.id, "failed to create click overlay: {e}"),
                    }
                }
            }
        }
    }

    /// Points both strips of `monitor` at new targets.
    pub fn set_targets(
        &mut self,
        scene: &mut Scene,
        tiling: &impl Tiling,
        monitor: MonitorId,
        left: Option<WindowId>,
        right: Option<WindowId>,
    ) -> (bool, bool) {
        let Some(overlay) = self.overlays.get_mut(&monitor) else {
            debug!(?monitor, "stack targets for unmanaged monitor ignored");
            return (false, false);
        };
        (
            overlay.left.set_target(scene, tiling, left),
            overlay.right.set_target(scene, tiling, right),
        )
    }

    pub fn active_monitor_changed(&mut self, scene: &mut Scene, active: MonitorId) {
        for (id, overlay) in &self.overlays {
            if *id != active {
                overlay.activate(scene);
            }
        }
    }

    pub fn reset_all(&mut self, scene: &mut Scene) {
        for overlay in self.overlays.values() {
            overlay.reset(scene);
        }
    }

    pub fn update_settings(&mut self, settings: OverlaySettings) {
        if self.settings == settings {
            return;
        }
        debug!(?settings, "overlay settings updated");
        for overlay in self.overlays.values_mut() {
            overlay.update_settings(&settings);
        }
        self.settings = settings;
    }

    /// Snapshots of every overlay, ordered by monitor.
    pub fn snapshot(&self, scene: &Scene) -> Vec<OverlayData> {
        let mut data: Vec<_> = self.overlays.values().map(|o| o.snapshot(scene)).collect();
        data.sort_by_key(|d| d.monitor);
        data
    }

    /// Tears down every overlay. The manager is gone afterwards, so teardown
    /// cannot run twice.
    pub fn shutdown(self, scene: &mut Scene) {
        for (id, overlay) in self.overlays {
            debug!(monitor = ?id, "destroying overlay");
            overlay.destroy(scene);
        }
    }
}

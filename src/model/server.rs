use serde::{Deserialize, Serialize};

use crate::model::window::{Direction, MonitorId, WindowId};
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripData {
    pub direction: Direction,
    pub visible: bool,
    pub target: Option<WindowId>,
    pub frame: Rect,
    /// Icon frame relative to the strip.
    pub icon: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayData {
    pub monitor: MonitorId,
    pub monitor_frame: Rect,
    pub catcher: Rect,
    pub left: StripData,
    pub right: StripData,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn overlay_data_serializes_flat_frames() {
        let data = OverlayData {
            monitor: MonitorId::new(1),
            monitor_frame: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            catcher: Rect::ZERO,
            left: StripData {
                direction: Direction::Left,
                visible: true,
                target: Some(WindowId::new(10)),
                frame: Rect::new(0.0, 29.0, 392.0, 1051.0),
                icon: Some(Rect::new(2.0, 10.0, 20.0, 20.0)),
            },
            right: StripData {
                direction: Direction::Right,
                visible: false,
                target: None,
                frame: Rect::new(0.0, 29.0, 75.0, 1051.0),
                icon: None,
            },
        };

        let value = serde_json::to_value(&data).expect("serialize OverlayData");
        let expected = json!({
            "monitor": 1,
            "monitor_frame": { "x": 0.0, "y": 0.0, "width": 1920.0, "height": 1080.0 },
            "catcher": { "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0 },
            "left": {
                "direction": "left",
                "visible": true,
                "target": 10,
                "frame": { "x": 0.0, "y": 29.0, "width": 392.0, "height": 1051.0 },
                "icon": { "x": 2.0, "y": 10.0, "width": 20.0, "height": 20.0 },
            },
            "right": {
                "direction": "right",
                "visible": false,
                "target": null,
                "frame": { "x": 0.0, "y": 29.0, "width": 75.0, "height": 1051.0 },
                "icon": null,
            },
        });
        assert_eq!(value, expected);

        let back: OverlayData = serde_json::from_value(value).expect("deserialize OverlayData");
        assert_eq!(back, data);
    }
}

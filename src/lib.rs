//! Click-capture overlays for stacked windows in a scrolling tiling layout.
//!
//! A stacked window shows only a thin sliver at the edge of the monitor.
//! Each monitor gets a [`ui::ClickOverlay`]: a left and a right
//! [`ui::StackOverlay`] strip covering those slivers, plus a catcher that
//! notices when the pointer leaves the interaction. Strips keep themselves
//! painted directly above the window they stand in for, even though the host
//! keeps resetting the window group's paint order.

pub mod actor;
pub mod common;
pub mod model;
pub mod sys;
pub mod ui;

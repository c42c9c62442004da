pub mod click_overlay;
pub mod icon;
pub mod stack_overlay;

pub use click_overlay::ClickOverlay;
pub use stack_overlay::StackOverlay;

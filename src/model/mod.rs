pub mod server;
pub mod tiling;
pub mod window;

pub use tiling::StaticTiling;
pub use window::{AppIconSource, Direction, Monitor, MonitorId, Tiling, WindowHandle, WindowId};

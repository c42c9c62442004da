use std::path::PathBuf;

use clap::Parser;
use stack_overlay::actor::{self, overlay_manager};
use stack_overlay::actor::overlay_manager::{Event, OverlayManager};
use stack_overlay::common::config::Config;
use stack_overlay::common::log;
use stack_overlay::model::{Monitor, MonitorId, StaticTiling, WindowId};
use stack_overlay::sys::geometry::{Point, Rect};
use stack_overlay::sys::scene::Scene;
use tracing::info;

/// Runs the stack overlays against a simulated three-window stack and prints
/// the resulting scene.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Overlay config to load instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print overlay snapshots as JSON instead of the scene tree.
    #[arg(long)]
    json: bool,

    /// Log filter directives, e.g. `stack_overlay=debug`.
    #[arg(long)]
    log: Option<String>,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path.or_else(Config::default_path) {
        Some(path) if path.exists() => Config::read(&path),
        _ => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_logging(cli.log.as_deref())?;
    let config = load_config(cli.config)?;

    let (a, b, c) = (WindowId::new(1), WindowId::new(2), WindowId::new(3));
    let monitor = Monitor {
        id: MonitorId::new(0),
        rect: Rect::new(0.0, 0.0, 1920.0, 1080.0),
    };

    let mut scene = Scene::new();
    let mut tiling = StaticTiling::new(27.0);
    tiling.add_window(&mut scene, a, Rect::new(0.0, 35.0, 392.0, 1000.0));
    tiling.add_window(&mut scene, b, Rect::new(400.0, 35.0, 600.0, 1000.0));
    tiling.add_window(&mut scene, c, Rect::new(1008.0, 35.0, 900.0, 1000.0));
    tiling.add_space(vec![a, b, c]);

    let (requests, mut rx) = actor::channel::<overlay_manager::Request>();
    let mut manager = OverlayManager::new(config.overlay, requests);
    manager.handle_event(&mut scene, &tiling, Event::ScreenParametersChanged(vec![monitor]));
    manager.handle_event(&mut scene, &tiling, Event::StackTargetsChanged {
        monitor: monitor.id,
        left: Some(a),
        right: Some(c),
    });

    // The host restacks, then the user clicks the left sliver.
    scene.sync_window_stacking(&tiling.window_order());
    scene.button_press(Point::new(10.0, 500.0), 1);
    scene.button_release(Point::new(10.0, 500.0), 2);
    while let Ok((_, request)) = rx.try_recv() {
        info!(?request, "overlay request");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&manager.snapshot(&scene))?);
    } else {
        print!("{}", scene.dump_tree());
    }

    manager.shutdown(&mut scene);
    Ok(())
}

// src/main.rs
use eframe::egui;
use tokio::runtime::Runtime;

mod app;
mod client;
mod config;
mod countries;
mod dispatch;
mod menu;
mod parser;
mod reconciler;
mod runner;
mod status;

use app::TrayApp;
use config::AppConfig;

fn main() -> anyhow::Result<()> {
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();
    if let Some(e) = load_error {
        log::warn!("Could not read settings, using defaults: {:#}", e);
    }

    let runtime = Runtime::new()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(menu::APP_TITLE)
            .with_inner_size([280.0, 260.0])
            .with_min_inner_size([240.0, 200.0]),
        ..Default::default()
    };

    eframe::run_native(
        menu::APP_TITLE,
        options,
        Box::new(|cc| Ok(Box::new(TrayApp::new(cc, config, runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("Tray window failed: {}", e))
}

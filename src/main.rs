mod analysis;
mod app;
mod chart;
mod color;
mod config;
mod data;
mod state;
mod ui;

use anyhow::Context;
use app::DashboardApp;
use config::DashboardConfig;
use data::loader::load_economic_file;
use data::worldbank::{EconomicSource, FileEconomicSource, WorldBankClient};
use eframe::egui;
use state::AppState;

/// File-backed economic data when configured, the World Bank API otherwise.
fn economic_source(config: &DashboardConfig) -> anyhow::Result<Box<dyn EconomicSource>> {
    if let Some(path) = &config.economic_path {
        let table = load_economic_file(path)
            .with_context(|| format!("loading economic data from {}", path.display()))?;
        log::info!("Using {} economic rows from {}", table.len(), path.display());
        return Ok(Box::new(FileEconomicSource::new(
            path.display().to_string(),
            table,
        )));
    }
    let client = WorldBankClient::new(&config.worldbank_base, config.http_timeout)
        .context("building World Bank client")?;
    log::info!("Using World Bank API at {}", config.worldbank_base);
    Ok(Box::new(client))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::from_env();
    let source = economic_source(&config)?;
    let health_path = config.health_path.clone();

    let mut state = AppState::new(config, source);
    if let Some(path) = health_path {
        state.load_health(&path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Health and Economy Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}

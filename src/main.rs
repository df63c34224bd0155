use std::path::PathBuf;

use eframe::egui;
use survey_lens::app::SurveyLensApp;
use survey_lens::config::{DashboardConfig, CONFIG_ENV};

/// Dashboard from `SURVEY_LENS_CONFIG`, falling back to the first preset.
fn startup_config() -> DashboardConfig {
    let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) else {
        return DashboardConfig::faculty_satisfaction();
    };
    match DashboardConfig::load(&path) {
        Ok(config) => {
            log::info!("Using dashboard config {}", path.display());
            config
        }
        Err(e) => {
            log::error!("Ignoring {CONFIG_ENV}={}: {e}", path.display());
            DashboardConfig::faculty_satisfaction()
        }
    }
}

fn main() -> eframe::Result {
    env_logger::init();

    let app = SurveyLensApp::new(startup_config());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Survey Lens – Survey Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

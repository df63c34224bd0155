use eframe::egui;

use crate::config::DashboardConfig;
use crate::state::DashboardState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SurveyLensApp {
    pub state: DashboardState,
}

impl SurveyLensApp {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: DashboardState::new(config),
        }
    }
}

impl eframe::App for SurveyLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::dashboard_view(ui, &mut self.state);
        });

        panels::drill_down_window(ctx, &mut self.state);
    }
}

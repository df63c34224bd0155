use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::analytics::aggregate;
use crate::analytics::kpi::KpiCard;
use crate::color;
use crate::config::DashboardConfig;
use crate::render::{Chart, Renderer, SummaryRecord};
use crate::state::DashboardState;
use crate::ui::charts::EguiRenderer;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut DashboardState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds,
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // Clone what we need so we can mutate state inside the loop.
    let fields: Vec<String> = state
        .config
        .category_filters
        .iter()
        .filter(|f| dataset.has_column(f))
        .cloned()
        .collect();
    let unique = dataset.unique_values.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            view_selectors(ui, state);
            threshold_slider(ui, state);
            ui.separator();

            for field in &fields {
                let Some(all_values) = unique.get(field) else {
                    continue;
                };
                let n_total = all_values.len();
                let n_selected = all_values
                    .iter()
                    .filter(|v| state.is_selected(field, v))
                    .count();
                let header_text = format!("{field}  ({n_selected}/{n_total})");

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(field)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(field);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(field);
                            }
                        });

                        for val in all_values {
                            let mut checked = state.is_selected(field, val);
                            if ui.checkbox(&mut checked, val.to_string()).changed() {
                                state.toggle_category(field, val);
                            }
                        }
                    });
            }
        });
}

fn view_selectors(ui: &mut Ui, state: &mut DashboardState) {
    let metrics: Vec<(String, String)> = state
        .registry
        .iter()
        .map(|m| (m.id().to_string(), m.label().to_string()))
        .collect();
    if !metrics.is_empty() {
        ui.strong("Metric");
        let current = crate::dashboard::primary_metric(&state.registry, &state.view)
            .map(|m| m.label().to_string())
            .unwrap_or_default();
        egui::ComboBox::from_id_salt("metric_select")
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for (id, label) in &metrics {
                    let selected = state.view.metric.as_deref() == Some(id.as_str());
                    if ui.selectable_label(selected, label).clicked() {
                        state.view.metric = Some(id.clone());
                    }
                }
            });
    }

    let comparisons: Vec<String> = state.config.comparisons.iter().map(|c| c.label.clone()).collect();
    if comparisons.len() > 1 {
        ui.strong("Compare by");
        let current = comparisons.get(state.view.comparison).cloned().unwrap_or_default();
        egui::ComboBox::from_id_salt("comparison_select")
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for (i, label) in comparisons.iter().enumerate() {
                    ui.selectable_value(&mut state.view.comparison, i, label);
                }
            });
    }
}

fn threshold_slider(ui: &mut Ui, state: &mut DashboardState) {
    let Some(spec) = state.config.threshold_filter.clone() else {
        return;
    };
    let label = state
        .config
        .metric(&spec.metric)
        .map_or(spec.metric.clone(), |m| m.label.clone());

    ui.strong(format!("Minimum {label}"));
    let mut value = state.threshold().unwrap_or(spec.min);
    let slider = egui::Slider::new(&mut value, spec.min..=spec.max).step_by(spec.step);
    if ui.add(slider).changed() {
        state.set_threshold(Some(value));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut DashboardState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open survey data…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load dashboard config…").clicked() {
                open_config_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let loaded = state.dataset.is_some();
            if ui
                .add_enabled(loaded, egui::Button::new("Export filtered responses…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(loaded, egui::Button::new("Export report…"))
                .clicked()
            {
                report_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let current = state.config.title.clone();
        egui::ComboBox::from_id_salt("preset_select")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for preset in DashboardConfig::presets() {
                    if ui.selectable_label(preset.title == current, &preset.title).clicked()
                        && preset.title != current
                    {
                        state.set_config(preset);
                    }
                }
            });

        ui.separator();

        if state.dataset.is_some() {
            ui.label(format!(
                "Showing {} of {} responses",
                state.visible_indices.len(),
                state.total_rows()
            ));
            if ui
                .add_enabled(!state.filter.is_identity(), egui::Button::new("Reset filters"))
                .clicked()
            {
                state.reset_filters();
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// KPI strip followed by every chart in a two-column grid.
pub fn dashboard_view(ui: &mut Ui, state: &mut DashboardState) {
    let Some(dashboard) = state.dashboard() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a survey file to build the dashboard  (File → Open survey data…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            kpi_strip(ui, &dashboard.kpis);
            ui.separator();

            let mut selection = None;
            let column_width = (ui.available_width() - 16.0) / 2.0;
            for pair in dashboard.charts.chunks(2) {
                ui.horizontal_top(|ui: &mut Ui| {
                    for chart in pair {
                        ui.allocate_ui(egui::vec2(column_width, 0.0), |ui: &mut Ui| {
                            ui.set_width(column_width);
                            if let Some(s) = EguiRenderer::new(ui).draw(chart) {
                                selection = Some(s);
                            }
                        });
                    }
                });
                ui.add_space(12.0);
            }

            if let Some(s) = selection {
                if let SummaryRecord::Group { summary, .. } = s.record {
                    log::info!("Drill-down into {}", summary.label);
                    state.drill_down = Some(summary.label);
                }
            }
        });
}

fn kpi_strip(ui: &mut Ui, cards: &[KpiCard]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for card in cards {
            egui::Frame::group(ui.style())
                .stroke(egui::Stroke::new(2.0, color::band_color(card.band)))
                .inner_margin(8.0)
                .show(ui, |ui: &mut Ui| {
                    ui.set_min_width(140.0);
                    ui.vertical(|ui: &mut Ui| {
                        ui.label(RichText::new(&card.label).small());
                        ui.label(
                            RichText::new(&card.display)
                                .size(24.0)
                                .strong()
                                .color(color::band_color(card.band)),
                        );
                        if !card.subtitle.is_empty() {
                            ui.label(RichText::new(&card.subtitle).weak().small());
                        }
                    });
                });
        }
    });
}

// ---------------------------------------------------------------------------
// Drill-down window
// ---------------------------------------------------------------------------

pub fn drill_down_window(ctx: &egui::Context, state: &mut DashboardState) {
    let Some(group) = state.drill_down.clone() else {
        return;
    };
    let chart = state.drill_down_chart();

    let mut open = true;
    egui::Window::new(format!("{group} breakdown"))
        .open(&mut open)
        .default_width(420.0)
        .show(ctx, |ui: &mut Ui| match &chart {
            Some(chart) => {
                EguiRenderer::new(ui).draw(chart);
                ui.separator();
                breakdown_table(ui, chart);
            }
            None => {
                ui.label("No breakdown configured for this dashboard.");
            }
        });
    if !open {
        state.drill_down = None;
    }
}

fn breakdown_table(ui: &mut Ui, chart: &Chart) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::remainder())
        .column(Column::auto())
        .column(Column::auto())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Group");
            });
            header.col(|ui| {
                ui.strong("Mean");
            });
            header.col(|ui| {
                ui.strong("Responses");
            });
        })
        .body(|mut body| {
            for record in &chart.records {
                let SummaryRecord::Group { summary, .. } = record else {
                    continue;
                };
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(&summary.label);
                    });
                    row.col(|ui| {
                        ui.label(aggregate::display(summary.mean, 2));
                    });
                    row.col(|ui| {
                        ui.label(summary.count.to_string());
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut DashboardState) {
    let file = rfd::FileDialog::new()
        .set_title("Open survey responses")
        .add_filter("Supported files", &["json", "csv", "tsv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Tab-separated", &["tsv", "txt"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}

pub fn open_config_dialog(state: &mut DashboardState) {
    let file = rfd::FileDialog::new()
        .set_title("Load dashboard config")
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match DashboardConfig::load(&path) {
            Ok(config) => state.set_config(config),
            Err(e) => {
                log::error!("Failed to load config: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

fn export_dialog(state: &mut DashboardState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered responses")
        .add_filter("CSV", &["csv"])
        .add_filter("Tab-separated", &["tsv"])
        .set_file_name("filtered_responses.csv")
        .save_file();

    if let Some(path) = file {
        state.status_message = match state.export_visible(&path) {
            Ok(n) => Some(format!("Exported {n} responses")),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                Some(format!("Error: {e:#}"))
            }
        };
    }
}

fn report_dialog(state: &mut DashboardState) {
    let file = rfd::FileDialog::new()
        .set_title("Export report")
        .add_filter("Markdown", &["md"])
        .set_file_name("survey_report.md")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.write_report(&path) {
            log::error!("Report failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

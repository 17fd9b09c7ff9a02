use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export::{ECONOMIC_EXPORT_NAME, HEALTH_EXPORT_NAME};
use crate::data::model::{ECONOMIC_INDICATORS, HEALTH_INDICATORS, economic_indicator_name};
use crate::state::{AppState, ChartType};

// ---------------------------------------------------------------------------
// Left side panel – user inputs
// ---------------------------------------------------------------------------

/// Render the left input panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("User Inputs");
    ui.separator();

    let countries = match &state.health {
        Some(h) => h.countries(),
        None => {
            ui.label("No health data loaded.");
            ui.label("File → Open health data…");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Countries (multi-select) ----
            let header_text = format!(
                "Select Country Codes  ({}/{})",
                state.selection.countries.len(),
                countries.len()
            );
            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("countries")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut state.country_search)
                            .hint_text("Search…"),
                    );
                    if ui.small_button("Clear selection").clicked() {
                        state.clear_countries();
                    }

                    let needle = state.country_search.trim().to_ascii_uppercase();
                    ScrollArea::vertical()
                        .id_salt("country_list")
                        .max_height(220.0)
                        .show(ui, |ui: &mut Ui| {
                            for iso in countries
                                .iter()
                                .filter(|c| needle.is_empty() || c.contains(&needle))
                            {
                                let mut checked = state.selection.countries.contains(iso);
                                let mut text = RichText::new(iso);
                                if checked {
                                    text = text.color(state.colors.color_for(iso));
                                }
                                if ui.checkbox(&mut checked, text).changed() {
                                    state.toggle_country(iso);
                                }
                            }
                        });
                });
            ui.separator();

            // ---- Health indicator ----
            ui.strong("Select Health Indicator");
            let mut health_indicator = state.selection.health_indicator.clone();
            egui::ComboBox::from_id_salt("health_indicator")
                .selected_text(health_indicator.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for name in HEALTH_INDICATORS {
                        ui.selectable_value(&mut health_indicator, name.to_string(), *name);
                    }
                });
            state.set_health_indicator(health_indicator);
            ui.add_space(4.0);

            // ---- Economic indicator ----
            ui.strong("Select Economic Indicator");
            let mut code = state.selection.economic_indicator.clone();
            egui::ComboBox::from_id_salt("economic_indicator")
                .selected_text(economic_indicator_name(&code))
                .width(220.0)
                .show_ui(ui, |ui: &mut Ui| {
                    for ind in ECONOMIC_INDICATORS {
                        ui.selectable_value(&mut code, ind.code.to_string(), ind.name);
                    }
                });
            state.set_economic_indicator(code);
            ui.add_space(4.0);

            // ---- Chart type ----
            ui.strong("Select Chart Type");
            egui::ComboBox::from_id_salt("chart_type")
                .selected_text(state.chart_type.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for kind in ChartType::ALL {
                        ui.selectable_value(&mut state.chart_type, kind, kind.label());
                    }
                });
            ui.separator();

            // ---- Year range ----
            egui::CollapsingHeader::new(RichText::new("Select Year Range").strong())
                .id_salt("year_range")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    let (lo, hi) = state.config.year_bounds;
                    let (mut from, mut to) = state.selection.year_range;
                    ui.add(egui::Slider::new(&mut from, lo..=hi).text("From"));
                    ui.add(egui::Slider::new(&mut to, lo..=hi).text("To"));
                    state.set_year_range(from, to);
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open health data…").clicked() {
                open_health_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open economic data…").clicked() {
                open_economic_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Export health CSV…").clicked() {
                export_health_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export economic CSV…").clicked() {
                export_economic_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.strong("Health and Economy Dashboard");
        ui.separator();

        if let Some(h) = &state.health {
            let visible = state.health_view.as_ref().map_or(0, |v| v.len());
            ui.label(format!("{} country-years loaded, {visible} visible", h.len()));
            ui.separator();
        }

        ui.label(format!("Economic data: {}", state.economic_source_label()));
        ui.separator();

        if ui
            .selectable_label(state.minmax_scaling, "Min-Max Scaling")
            .clicked()
        {
            state.minmax_scaling = !state.minmax_scaling;
            state.mark_dirty();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_health_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open health data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_health(&path);
    }
}

pub fn open_economic_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open economic data")
        .add_filter("Supported files", &["csv", "json"])
        .pick_file();

    if let Some(path) = file {
        state.load_economic(&path);
    }
}

pub fn export_health_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download health data as CSV")
        .set_file_name(HEALTH_EXPORT_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_health(&path) {
            log::error!("Health export failed: {e:#}");
            state.status_message = Some(format!("Export failed: {e:#}"));
        }
    }
}

pub fn export_economic_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download economic data as CSV")
        .set_file_name(ECONOMIC_EXPORT_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_economic(&path) {
            log::error!("Economic export failed: {e:#}");
            state.status_message = Some(format!("Export failed: {e:#}"));
        }
    }
}

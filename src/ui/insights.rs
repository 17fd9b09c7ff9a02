use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::{EconomicTable, HealthTable, economic_indicator_name};
use crate::state::AppState;
use crate::ui::panels;

/// Rows shown in each data sample.
const SAMPLE_ROWS: usize = 5;
const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Additional insights column
// ---------------------------------------------------------------------------

/// Data samples, downloads and the GDP model.
pub fn additional_insights(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Additional Insights");
    ui.separator();

    let has_data = state.health_view.as_ref().is_some_and(|h| !h.is_empty())
        && state.economic_view.as_ref().is_some_and(|e| !e.is_empty());
    if !has_data {
        ui.label(
            RichText::new("Data is insufficient to display additional insights.")
                .color(Color32::from_rgb(230, 160, 40)),
        );
        return;
    }

    ScrollArea::vertical()
        .id_salt("insights_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(health) = &state.health_view {
                ui.strong("Health Data Sample");
                ui.push_id("health_sample", |ui: &mut Ui| health_sample(ui, health));
            }
            ui.add_space(6.0);
            if let Some(economic) = &state.economic_view {
                ui.strong("Economic Data Sample");
                ui.push_id("economic_sample", |ui: &mut Ui| economic_sample(ui, economic));
            }
            ui.separator();

            ui.strong("Download Data");
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Download Health Data").clicked() {
                    panels::export_health_dialog(state);
                }
                if ui.button("Download Economic Data").clicked() {
                    panels::export_economic_dialog(state);
                }
            });
            ui.separator();

            model_section(ui, state);
        });
}

// ---------------------------------------------------------------------------
// Sample tables
// ---------------------------------------------------------------------------

fn health_sample(ui: &mut Ui, health: &HealthTable) {
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .column(Column::auto().at_least(50.0))
            .column(Column::auto().at_least(40.0))
            .columns(Column::auto().at_least(70.0), health.columns.len())
            .header(ROW_HEIGHT, |mut header| {
                header.col(|ui| {
                    ui.strong("iso_code");
                });
                header.col(|ui| {
                    ui.strong("year");
                });
                for name in &health.columns {
                    header.col(|ui| {
                        ui.strong(name.as_str());
                    });
                }
            })
            .body(|mut body| {
                for row in health.rows.iter().take(SAMPLE_ROWS) {
                    body.row(ROW_HEIGHT, |mut cells| {
                        cells.col(|ui| {
                            ui.label(row.iso_code.as_str());
                        });
                        cells.col(|ui| {
                            ui.label(row.year.to_string());
                        });
                        for name in &health.columns {
                            cells.col(|ui| {
                                ui.label(row.value(name).map(format_value).unwrap_or_default());
                            });
                        }
                    });
                }
            });
    });
}

fn economic_sample(ui: &mut Ui, economic: &EconomicTable) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(40.0))
        .column(Column::auto().at_least(110.0))
        .column(Column::remainder())
        .header(ROW_HEIGHT, |mut header| {
            for name in ["iso_code", "year", "indicator_code", "value"] {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|mut body| {
            for row in economic.rows.iter().take(SAMPLE_ROWS) {
                body.row(ROW_HEIGHT, |mut cells| {
                    cells.col(|ui| {
                        ui.label(row.iso_code.as_str());
                    });
                    cells.col(|ui| {
                        ui.label(row.year.to_string());
                    });
                    cells.col(|ui| {
                        ui.label(row.indicator_code.as_str());
                    });
                    cells.col(|ui| {
                        ui.label(format_value(row.value));
                    });
                });
            }
        });
}

fn format_value(v: f64) -> String {
    if v.abs() >= 1e6 {
        format!("{v:.3e}")
    } else {
        format!("{v:.3}")
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

fn model_section(ui: &mut Ui, state: &mut AppState) {
    let target = economic_indicator_name(&state.selection.economic_indicator).to_string();
    ui.strong("Predictive Modeling");
    ui.label(format!("Linear regression of {target} on the health features."));
    if ui.button("Train model").clicked() {
        state.train_model();
    }

    let Some(report) = &state.training else {
        return;
    };

    ui.add_space(4.0);
    egui::Grid::new("training_metrics")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.label("Training rows");
            ui.label(report.train_rows.to_string());
            ui.end_row();
            ui.label("Test rows");
            ui.label(report.test_rows.to_string());
            ui.end_row();
            ui.label("RMSE");
            ui.label(report.rmse.map(format_value).unwrap_or_else(|| "n/a".into()));
            ui.end_row();
            ui.label("R²");
            ui.label(report.r2.map(|r| format!("{r:.4}")).unwrap_or_else(|| "n/a".into()));
            ui.end_row();
        });

    egui::CollapsingHeader::new("Coefficients")
        .id_salt("coefficients")
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("coefficient_grid")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    ui.label("intercept");
                    ui.label(format_value(report.model.intercept));
                    ui.end_row();
                    for (name, coef) in report
                        .model
                        .feature_names
                        .iter()
                        .zip(&report.model.coefficients)
                    {
                        ui.label(name.as_str());
                        ui.label(format_value(*coef));
                        ui.end_row();
                    }
                });
        });

    if state.forecasts.is_empty() {
        return;
    }
    ui.add_space(4.0);
    ui.strong(format!("Predicted {target}"));
    for (iso, year, value) in &state.forecasts {
        ui.label(format!("{iso} ({year}): {}", format_value(*value)));
    }
}

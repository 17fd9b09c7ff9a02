use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};

use crate::chart::{ComparisonChart, HeatmapGrid};
use crate::color::heat_color;
use crate::data::model::economic_indicator_name;
use crate::state::{AppState, ChartType};

// ---------------------------------------------------------------------------
// Visualizations column
// ---------------------------------------------------------------------------

/// Render the chart selected in the side panel, plus the correlation.
pub fn visualizations(ui: &mut Ui, state: &AppState) {
    ui.heading("Visualizations");
    ui.separator();

    if state.health.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a health data file  (File → Open health data…)");
        });
        return;
    }

    for notice in &state.notices {
        ui.label(RichText::new(notice).color(Color32::YELLOW));
    }

    match state.chart_type {
        ChartType::Comparison => match &state.comparison {
            Some(chart) if !chart.series.is_empty() => {
                comparison_plot(ui, state, chart);
                correlation_text(ui, state);
            }
            _ => warning(ui, "Insufficient data to generate comparison chart."),
        },
        ChartType::Heatmap => match &state.heatmap {
            Some(grid) if !grid.countries.is_empty() => heatmap_plot(ui, state, grid),
            _ => warning(ui, "Insufficient health data to generate heatmap."),
        },
    }
}

fn warning(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(Color32::from_rgb(230, 160, 40)));
}

fn correlation_text(ui: &mut Ui, state: &AppState) {
    ui.add_space(8.0);
    ui.strong("Correlation Analysis");
    let health = &state.selection.health_indicator;
    let econ = economic_indicator_name(&state.selection.economic_indicator);
    match state.correlation {
        Some(r) => {
            ui.label(format!("The correlation between {health} and {econ} is {r:.2}."));
        }
        None => {
            ui.label("Insufficient data or variability to calculate correlation.");
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison chart
// ---------------------------------------------------------------------------

/// Health (solid) and economic (dashed) lines per country, peaks annotated.
fn comparison_plot(ui: &mut Ui, state: &AppState, chart: &ComparisonChart) {
    let health_name = state.selection.health_indicator.as_str();
    let econ_name = economic_indicator_name(&state.selection.economic_indicator);
    ui.label(RichText::new(format!("Comparison of {health_name} and {econ_name}")).strong());

    let y_label = if state.minmax_scaling {
        "Scaled value (0–1)"
    } else {
        "Value"
    };

    Plot::new("comparison_plot")
        .legend(Legend::default())
        .height(380.0)
        .x_axis_label("Year")
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for s in &chart.series {
                let color = state.colors.color_for(&s.iso_code);

                plot_ui.line(
                    Line::new(PlotPoints::new(s.health.clone()))
                        .name(format!("{health_name} ({})", s.iso_code))
                        .color(color)
                        .width(2.0),
                );
                plot_ui.line(
                    Line::new(PlotPoints::new(s.economic.clone()))
                        .name(format!("{econ_name} ({})", s.iso_code))
                        .color(color)
                        .style(LineStyle::dashed_loose())
                        .width(2.0),
                );

                if let Some([x, y]) = s.health_peak {
                    plot_ui.points(peak_marker(x, y, color));
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(x, y),
                            format!("Peak Health ({}): {y:.2}", s.iso_code),
                        )
                        .color(color)
                        .anchor(Align2::CENTER_BOTTOM),
                    );
                }
                if let Some([x, y]) = s.economic_peak {
                    plot_ui.points(peak_marker(x, y, color));
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(x, y),
                            format!("Peak Economic ({}): {y:.2}", s.iso_code),
                        )
                        .color(color)
                        .anchor(Align2::CENTER_TOP),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Countries on y, years on x, one filled cell per present value.
fn heatmap_plot(ui: &mut Ui, state: &AppState, grid: &HeatmapGrid) {
    let indicator = state.selection.health_indicator.as_str();
    ui.label(
        RichText::new(format!("Heatmap of {indicator} Across Countries and Years")).strong(),
    );

    let countries = grid.countries.clone();
    Plot::new("heatmap_plot")
        .height(380.0)
        .show_grid(false)
        .x_axis_label("Year")
        .y_axis_label("Country Code")
        .x_axis_formatter(|mark, _range| {
            integral_label(mark.value)
                .map(|y| y.to_string())
                .unwrap_or_default()
        })
        .y_axis_formatter(move |mark, _range| {
            integral_label(mark.value)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| countries.get(i).cloned())
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for (ci, row) in grid.cells.iter().enumerate() {
                for (yi, cell) in row.iter().enumerate() {
                    let Some(v) = cell else {
                        continue;
                    };
                    let x = grid.years[yi] as f64;
                    let y = ci as f64;
                    let rect = vec![
                        [x - 0.5, y - 0.5],
                        [x + 0.5, y - 0.5],
                        [x + 0.5, y + 0.5],
                        [x - 0.5, y + 0.5],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(rect))
                            .fill_color(heat_color(grid.fraction(*v)))
                            .stroke(Stroke::NONE),
                    );
                }
            }
        });

    // Colour bar.
    if let Some((lo, hi)) = grid.range {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(format!("{lo:.2}"));
            for i in 0..=10 {
                ui.label(RichText::new("■").color(heat_color(i as f64 / 10.0)));
            }
            ui.label(format!("{hi:.2}"));
        });
    }
}

fn peak_marker(x: f64, y: f64, color: Color32) -> Points<'static> {
    Points::new(PlotPoints::new(vec![[x, y]]))
        .radius(4.0)
        .color(color)
}

/// `Some(n)` when an axis mark sits on an integer.
fn integral_label(value: f64) -> Option<i64> {
    let rounded = value.round();
    ((value - rounded).abs() < 1e-6).then_some(rounded as i64)
}

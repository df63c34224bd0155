use std::collections::BTreeMap;

use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Shape, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, HLine, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points, Text, VLine,
};

use crate::analytics::text::Sentiment;
use crate::color;
use crate::render::{self, Chart, ChartKind, Guide, Renderer, Selection, SummaryRecord};

const PLOT_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// egui renderer
// ---------------------------------------------------------------------------

/// Draws charts into an egui `Ui` with egui_plot.
pub struct EguiRenderer<'a> {
    pub ui: &'a mut Ui,
}

impl<'a> EguiRenderer<'a> {
    pub fn new(ui: &'a mut Ui) -> Self {
        Self { ui }
    }
}

impl Renderer for EguiRenderer<'_> {
    fn draw(&mut self, chart: &Chart) -> Option<Selection> {
        let ui = &mut *self.ui;
        ui.strong(&chart.title);

        if chart.records.is_empty() {
            ui.label("No responses match the current filters.");
            return None;
        }

        let clicked = match chart.kind {
            ChartKind::Bar | ChartKind::GroupedBar => bar_plot(ui, chart),
            ChartKind::Line => line_plot(ui, chart),
            ChartKind::Scatter => scatter_plot(ui, chart),
            ChartKind::Segments | ChartKind::StackedBar => stacked_plot(ui, chart),
            ChartKind::Heatmap => heatmap(ui, chart),
            ChartKind::Pie => pie(ui, chart),
            ChartKind::Radar => radar_plot(ui, chart),
        };

        if !chart.selectable {
            return None;
        }
        let category = chart.categories.get(clicked?)?;
        let record = chart
            .records
            .iter()
            .find(|r| r.category() == category)?
            .clone();
        log::debug!("Selected '{category}' on {}", chart.id);
        Some(Selection {
            chart: chart.id,
            record,
        })
    }
}

/// Category-indexed plot with the category names on the x axis.
fn category_plot(chart: &Chart) -> Plot<'static> {
    let categories = chart.categories.clone();
    Plot::new(chart.id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_y(chart.value_range.0)
        .include_y(chart.value_range.1)
        .y_axis_label(chart.value_label.clone())
        .x_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            categories.get(i as usize).cloned().unwrap_or_default()
        })
}

/// Hover text per (series, category).
fn group_hover(chart: &Chart) -> BTreeMap<(String, String), String> {
    chart
        .records
        .iter()
        .filter_map(|r| match r {
            SummaryRecord::Group { series, summary } => Some((
                (series.clone(), summary.label.clone()),
                render::hover_text(chart, r),
            )),
            _ => None,
        })
        .collect()
}

fn bar_plot(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let n_series = chart.series.len().max(1);
    let width = 0.8 / n_series as f64;
    let palette = color::generate_palette(n_series);
    let single = chart.kind == ChartKind::Bar;
    let hover = group_hover(chart);

    let mut charts = Vec::with_capacity(n_series);
    for (s, series) in chart.series.iter().enumerate() {
        let offset = (s as f64 - (n_series as f64 - 1.0) / 2.0) * width;
        let mut bars = Vec::new();
        for (i, category) in chart.categories.iter().enumerate() {
            let summary = chart.records.iter().find_map(|r| match r {
                SummaryRecord::Group { series: rs, summary } if rs == series && &summary.label == category => {
                    Some(summary)
                }
                _ => None,
            });
            let Some(mean) = summary.and_then(|s| s.mean) else {
                continue;
            };
            let fill = if single {
                color::score_color(Some(mean), chart.value_range.0, chart.value_range.1)
            } else {
                palette[s]
            };
            bars.push(
                Bar::new(i as f64 + offset, mean)
                    .width(width * 0.95)
                    .name(category)
                    .fill(fill),
            );
        }

        let texts = hover.clone();
        let key = series.clone();
        let categories = chart.categories.clone();
        let mut bar_chart = BarChart::new(bars)
            .name(series)
            .element_formatter(Box::new(move |bar: &Bar, _: &BarChart| {
                let i = (bar.argument - offset).round().max(0.0) as usize;
                categories
                    .get(i)
                    .and_then(|c| texts.get(&(key.clone(), c.clone())))
                    .cloned()
                    .unwrap_or_default()
            }));
        if !single {
            bar_chart = bar_chart.color(palette[s]);
        }
        charts.push(bar_chart);
    }

    let response = category_plot(chart)
        .show_x(false)
        .show(ui, |plot_ui| {
            for bar_chart in charts {
                plot_ui.bar_chart(bar_chart);
            }
            clicked_category(plot_ui, chart.categories.len())
        });
    response.inner
}

fn clicked_category(plot_ui: &egui_plot::PlotUi, n: usize) -> Option<usize> {
    if !plot_ui.response().clicked() {
        return None;
    }
    let x = plot_ui.pointer_coordinate()?.x.round();
    (x >= 0.0 && (x as usize) < n).then_some(x as usize)
}

fn line_plot(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let palette = color::generate_palette(chart.series.len());
    let hover = group_hover(chart);

    let lines: Vec<Line> = chart
        .series
        .iter()
        .zip(palette)
        .map(|(series, c)| {
            let points: PlotPoints = chart
                .categories
                .iter()
                .enumerate()
                .filter_map(|(i, category)| {
                    chart.records.iter().find_map(|r| match r {
                        SummaryRecord::Group { series: rs, summary }
                            if rs == series && &summary.label == category =>
                        {
                            summary.mean.map(|m| [i as f64, m])
                        }
                        _ => None,
                    })
                })
                .collect();
            Line::new(points).name(series).color(c).width(2.0)
        })
        .collect();

    let categories = chart.categories.clone();
    category_plot(chart)
        .label_formatter(move |name, value| {
            let i = value.x.round().max(0.0) as usize;
            categories
                .get(i)
                .and_then(|c| hover.get(&(name.to_string(), c.clone())))
                .cloned()
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for line in lines {
                plot_ui.line(line);
            }
        });
    None
}

fn scatter_plot(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let hover: BTreeMap<String, String> = chart
        .records
        .iter()
        .map(|r| (r.category().to_string(), render::hover_text(chart, r)))
        .collect();

    Plot::new(chart.id)
        .height(PLOT_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_y(chart.value_range.0)
        .include_y(chart.value_range.1)
        .x_axis_label(chart.series.first().cloned().unwrap_or_default())
        .y_axis_label(chart.value_label.clone())
        .label_formatter(move |name, _| hover.get(name).cloned().unwrap_or_default())
        .show(ui, |plot_ui| {
            for guide in &chart.guides {
                match *guide {
                    Guide::Horizontal(y) => plot_ui.hline(HLine::new(y).style(LineStyle::dashed_loose())),
                    Guide::Vertical(x) => plot_ui.vline(VLine::new(x).style(LineStyle::dashed_loose())),
                }
            }
            for record in &chart.records {
                let SummaryRecord::Quadrant(p) = record else {
                    continue;
                };
                let (Some(x), Some(y)) = (p.x, p.y) else {
                    continue;
                };
                plot_ui.points(
                    Points::new(vec![[x, y]])
                        .name(&p.label)
                        .radius(4.0 + (p.count as f32).sqrt())
                        .color(color::quadrant_color(p.quadrant)),
                );
            }
        });
    None
}

/// Three stacked horizontal bars per category: NPS segments or theme
/// sentiment shares.
fn stacked_plot(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let colors = match chart.kind {
        ChartKind::Segments => color::SEGMENT_COLORS,
        _ => color::SENTIMENT_COLORS,
    };
    let mut shares: [Vec<Bar>; 3] = Default::default();
    let mut hover: Vec<String> = Vec::new();
    for (i, record) in chart.records.iter().enumerate() {
        hover.push(render::hover_text(chart, record));
        let pcts = match record {
            SummaryRecord::Segments(s) => match s.breakdown {
                Some(b) => [b.detractor_pct(), b.passive_pct(), b.promoter_pct()],
                None => continue,
            },
            SummaryRecord::Theme(t) => Sentiment::ALL.map(|s| t.segment_pct(s)),
            _ => continue,
        };
        for (k, pct) in pcts.into_iter().enumerate() {
            shares[k].push(Bar::new(i as f64, pct).width(0.7).name(record.category()));
        }
    }

    let [first, second, third] = shares;
    let make = |bars: Vec<Bar>, k: usize| {
        let texts = hover.clone();
        BarChart::new(bars)
            .name(chart.series.get(k).cloned().unwrap_or_default())
            .color(colors[k])
            .horizontal()
            .element_formatter(Box::new(move |bar: &Bar, _: &BarChart| {
                texts.get(bar.argument.round() as usize).cloned().unwrap_or_default()
            }))
    };
    let first = make(first, 0);
    let second = make(second, 1).stack_on(&[&first]);
    let third = make(third, 2).stack_on(&[&first, &second]);

    let categories = chart.categories.clone();
    Plot::new(chart.id)
        .height(PLOT_HEIGHT.max(28.0 * chart.categories.len() as f32))
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_x(0.0)
        .include_x(100.0)
        .x_axis_label(chart.value_label.clone())
        .y_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            categories.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(first);
            plot_ui.bar_chart(second);
            plot_ui.bar_chart(third);
        });
    None
}

/// Correlation matrix painted cell by cell.
fn heatmap(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let n = chart.categories.len();
    if n == 0 {
        return None;
    }
    let label_width = 150.0;
    let header = 18.0;
    let cell = ((ui.available_width() - label_width) / n as f32).clamp(28.0, 64.0);
    let size = egui::vec2(label_width + cell * n as f32, header + cell * n as f32);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    let text_color = ui.visuals().text_color();
    let (lo, hi) = chart.value_range;

    let value = |i: usize, j: usize| {
        chart.records.iter().find_map(|r| match r {
            SummaryRecord::Correlation(c) if c.row == chart.categories[i] && c.column == chart.categories[j] => {
                Some(r)
            }
            _ => None,
        })
    };
    let cell_rect = |i: usize, j: usize| {
        Rect::from_min_size(
            egui::pos2(
                rect.left() + label_width + j as f32 * cell,
                rect.top() + header + i as f32 * cell,
            ),
            egui::vec2(cell, cell),
        )
    };

    for (i, label) in chart.categories.iter().enumerate() {
        let row_center = cell_rect(i, 0).left_center();
        painter.text(
            row_center - egui::vec2(6.0, 0.0),
            Align2::RIGHT_CENTER,
            format!("{}. {label}", i + 1),
            FontId::proportional(12.0),
            text_color,
        );
        painter.text(
            cell_rect(0, i).center_top() - egui::vec2(0.0, header / 2.0),
            Align2::CENTER_CENTER,
            (i + 1).to_string(),
            FontId::proportional(12.0),
            text_color,
        );
        for j in 0..n {
            let Some(SummaryRecord::Correlation(c)) = value(i, j) else {
                continue;
            };
            let r = cell_rect(i, j).shrink(1.0);
            painter.rect_filled(r, 2.0, color::score_color(Some(c.value), lo, hi));
            painter.text(
                r.center(),
                Align2::CENTER_CENTER,
                format!("{:.2}", c.value),
                FontId::proportional(11.0),
                Color32::BLACK,
            );
        }
    }

    let hovered = response.hover_pos().and_then(|pos| {
        let j = ((pos.x - rect.left() - label_width) / cell).floor();
        let i = ((pos.y - rect.top() - header) / cell).floor();
        if i < 0.0 || j < 0.0 || i as usize >= n || j as usize >= n {
            return None;
        }
        value(i as usize, j as usize).map(|r| render::hover_text(chart, r))
    });
    if let Some(text) = hovered {
        response.on_hover_text_at_pointer(text);
    }
    None
}

/// Pie painted slice by slice, legend on the right.
fn pie(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let slices: Vec<(&SummaryRecord, f32)> = chart
        .records
        .iter()
        .filter_map(|r| match r {
            SummaryRecord::Share(s) => Some((r, s.pct as f32 / 100.0 * TAU)),
            _ => None,
        })
        .collect();
    let palette = if slices.len() <= color::SENTIMENT_COLORS.len() {
        color::SENTIMENT_COLORS.to_vec()
    } else {
        color::generate_palette(slices.len())
    };

    let (rect, response) = ui.allocate_exact_size(egui::vec2(ui.available_width(), PLOT_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let text_color = ui.visuals().text_color();
    let radius = (rect.height() / 2.0 - 8.0).min(rect.width() / 4.0).max(8.0);
    let center = egui::pos2(rect.left() + radius + 8.0, rect.center().y);
    let at = |angle: f32| center + radius * egui::vec2(angle.cos(), angle.sin());

    let mut start = -FRAC_PI_2;
    for (k, &(record, sweep)) in slices.iter().enumerate() {
        let steps = (sweep / 0.05).ceil().max(1.0) as usize;
        for step in 0..steps {
            let a0 = start + sweep * step as f32 / steps as f32;
            let a1 = start + sweep * (step + 1) as f32 / steps as f32;
            painter.add(Shape::convex_polygon(vec![center, at(a0), at(a1)], palette[k], Stroke::NONE));
        }
        start += sweep;

        let row = egui::pos2(center.x + radius + 24.0, rect.top() + 24.0 + 22.0 * k as f32);
        painter.rect_filled(Rect::from_center_size(row, egui::vec2(12.0, 12.0)), 2.0, palette[k]);
        if let SummaryRecord::Share(s) = record {
            painter.text(
                row + egui::vec2(12.0, 0.0),
                Align2::LEFT_CENTER,
                format!("{}  {} ({:.1}%)", s.label, s.count, s.pct),
                FontId::proportional(13.0),
                text_color,
            );
        }
    }

    let hovered = response.hover_pos().and_then(|pos| {
        let d = pos - center;
        if d.length() > radius {
            return None;
        }
        let angle = (d.y.atan2(d.x) + FRAC_PI_2).rem_euclid(TAU);
        let mut end = 0.0_f32;
        slices.iter().find_map(|(record, sweep)| {
            end += *sweep;
            (angle < end).then(|| render::hover_text(chart, record))
        })
    });
    if let Some(text) = hovered {
        response.on_hover_text_at_pointer(text);
    }
    None
}

/// Radar with one spoke per category, scaled to the chart's value range.
fn radar_plot(ui: &mut Ui, chart: &Chart) -> Option<usize> {
    let n = chart.categories.len();
    if n < 3 {
        return None;
    }
    let (lo, hi) = chart.value_range;
    let span = (hi - lo).max(f64::EPSILON);
    let at = |i: usize, r: f64| {
        let angle = std::f64::consts::FRAC_PI_2 - std::f64::consts::TAU * i as f64 / n as f64;
        [r * angle.cos(), r * angle.sin()]
    };
    let grid = Color32::from_gray(140);

    let hover: BTreeMap<String, String> = chart
        .records
        .iter()
        .map(|r| (r.category().to_string(), render::hover_text(chart, r)))
        .collect();
    let palette = color::generate_palette(chart.series.len());

    Plot::new(chart.id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_x(-1.4)
        .include_x(1.4)
        .include_y(-1.2)
        .include_y(1.2)
        .label_formatter(move |name, _| hover.get(name).cloned().unwrap_or_default())
        .show(ui, |plot_ui| {
            for ring in [0.25, 0.5, 0.75, 1.0] {
                let points: PlotPoints = (0..=n).map(|i| at(i % n, ring)).collect();
                plot_ui.line(Line::new(points).color(grid).width(0.5).allow_hover(false));
            }
            for (i, label) in chart.categories.iter().enumerate() {
                plot_ui.line(Line::new(vec![[0.0, 0.0], at(i, 1.0)]).color(grid).width(0.5).allow_hover(false));
                let [x, y] = at(i, 1.15);
                plot_ui.text(Text::new(PlotPoint::new(x, y), label.clone()));
            }

            for (series, c) in chart.series.iter().zip(palette) {
                let radii: Vec<(String, f64)> = chart
                    .categories
                    .iter()
                    .map(|category| {
                        let mean = chart.records.iter().find_map(|r| match r {
                            SummaryRecord::Group { series: rs, summary } if rs == series && &summary.label == category => {
                                summary.mean
                            }
                            _ => None,
                        });
                        (category.clone(), mean.map_or(0.0, |m| ((m - lo) / span).clamp(0.0, 1.0)))
                    })
                    .collect();
                let outline: PlotPoints = (0..=n).map(|i| at(i % n, radii[i % n].1)).collect();
                plot_ui.line(Line::new(outline).name(series).color(c).width(2.0));
                for (i, (category, r)) in radii.iter().enumerate() {
                    plot_ui.points(Points::new(vec![at(i, *r)]).name(category).color(c).radius(3.0));
                }
            }
        });
    None
}

use std::fmt::Write;

use crate::analytics::aggregate;
use crate::analytics::kpi::{Band, KpiCard};
use crate::analytics::text::Sentiment;
use crate::dashboard::Dashboard;
use crate::render::{self, Chart, ChartKind, Renderer, Selection, SummaryRecord};

/// Renders charts as Markdown tables. Never reports a selection.
#[derive(Debug, Default)]
pub struct MarkdownReport {
    output: String,
}

impl MarkdownReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.output
    }
}

impl Renderer for MarkdownReport {
    fn draw(&mut self, chart: &Chart) -> Option<Selection> {
        let out = &mut self.output;
        let _ = writeln!(out, "## {}", chart.title);
        let _ = writeln!(out);

        if chart.records.is_empty() {
            let _ = writeln!(out, "No responses match the current filters.");
            let _ = writeln!(out);
            return None;
        }

        match chart.kind {
            ChartKind::Bar | ChartKind::GroupedBar | ChartKind::Line | ChartKind::Radar => {
                group_table(out, chart)
            }
            ChartKind::Heatmap => matrix_table(out, chart),
            ChartKind::Scatter => quadrant_table(out, chart),
            ChartKind::Segments => segment_table(out, chart),
            ChartKind::Pie => share_table(out, chart),
            ChartKind::StackedBar => theme_table(out, chart),
        }
        let _ = writeln!(out);
        None
    }
}

fn header(out: &mut String, columns: &[&str]) {
    let _ = writeln!(out, "| {} |", columns.join(" | "));
    let rule: Vec<&str> = columns.iter().map(|_| "---").collect();
    let _ = writeln!(out, "| {} |", rule.join(" | "));
}

/// One row per category, one column per series.
fn group_table(out: &mut String, chart: &Chart) {
    let mut columns = vec![""];
    columns.extend(chart.series.iter().map(String::as_str));
    columns.push("Responses");
    header(out, &columns);

    for category in &chart.categories {
        let mut cells = vec![category.clone()];
        let mut count = 0;
        for series in &chart.series {
            let found = chart.records.iter().find_map(|r| match r {
                SummaryRecord::Group { series: s, summary } if s == series && &summary.label == category => {
                    Some(summary)
                }
                _ => None,
            });
            if let Some(summary) = found {
                count = count.max(summary.count);
            }
            cells.push(aggregate::display(found.and_then(|s| s.mean), 2));
        }
        cells.push(count.to_string());
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
}

fn matrix_table(out: &mut String, chart: &Chart) {
    let mut columns = vec![""];
    columns.extend(chart.categories.iter().map(String::as_str));
    header(out, &columns);

    for row in &chart.categories {
        let mut cells = vec![row.clone()];
        for column in &chart.categories {
            let value = chart.records.iter().find_map(|r| match r {
                SummaryRecord::Correlation(c) if &c.row == row && &c.column == column => Some(c.value),
                _ => None,
            });
            cells.push(aggregate::display(value, 2));
        }
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
}

fn quadrant_table(out: &mut String, chart: &Chart) {
    header(out, &["Group", "Mean", chart.value_label.as_str(), "Responses", "Quadrant"]);
    for record in &chart.records {
        if let SummaryRecord::Quadrant(p) = record {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                p.label,
                aggregate::display(p.x, 2),
                aggregate::display(p.y, 1),
                p.count,
                render::quadrant_name(p.quadrant),
            );
        }
    }
}

fn segment_table(out: &mut String, chart: &Chart) {
    header(
        out,
        &["Question", "NPS", "Promoters %", "Passives %", "Detractors %", "Top box %", "Responses"],
    );
    for record in &chart.records {
        let SummaryRecord::Segments(s) = record else {
            continue;
        };
        match s.breakdown {
            Some(b) => {
                let _ = writeln!(
                    out,
                    "| {} | {:+} | {:.1} | {:.1} | {:.1} | {} | {} |",
                    s.label,
                    b.rounded(),
                    b.promoter_pct(),
                    b.passive_pct(),
                    b.detractor_pct(),
                    aggregate::display(s.top_box, 1),
                    b.valid()
                );
            }
            None => {
                let _ = writeln!(out, "| {} | n/a | n/a | n/a | n/a | n/a | 0 |", s.label);
            }
        }
    }
}

fn share_table(out: &mut String, chart: &Chart) {
    header(out, &["", "Responses", "Share %"]);
    for record in &chart.records {
        if let SummaryRecord::Share(s) = record {
            let _ = writeln!(out, "| {} | {} | {:.1} |", s.label, s.count, s.pct);
        }
    }
}

fn theme_table(out: &mut String, chart: &Chart) {
    let mut columns = vec!["Theme", "Mentions", "Prevalence %"];
    columns.extend(Sentiment::ALL.iter().map(|s| s.name()));
    header(out, &columns);
    for record in &chart.records {
        let SummaryRecord::Theme(t) = record else {
            continue;
        };
        let counts: Vec<String> = Sentiment::ALL
            .iter()
            .map(|&s| t.sentiment.count(s).to_string())
            .collect();
        let _ = writeln!(
            out,
            "| {} | {} | {:.1} | {} |",
            t.theme,
            t.mentions,
            t.prevalence_pct,
            counts.join(" | ")
        );
    }
}

fn band_name(band: Band) -> &'static str {
    match band {
        Band::Good => "good",
        Band::Warning => "warning",
        Band::Critical => "critical",
        Band::Neutral => "",
        Band::NoData => "no data",
    }
}

fn kpi_section(out: &mut String, kpis: &[KpiCard]) {
    let _ = writeln!(out, "## Key indicators");
    let _ = writeln!(out);
    if kpis.is_empty() {
        let _ = writeln!(out, "No indicators configured.");
        let _ = writeln!(out);
        return;
    }
    for card in kpis {
        let status = band_name(card.band);
        let _ = write!(out, "- **{}**: {}", card.label, card.display);
        if !card.subtitle.is_empty() {
            let _ = write!(out, " ({})", card.subtitle);
        }
        if !status.is_empty() {
            let _ = write!(out, " [{status}]");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);
}

/// Full Markdown report of a dashboard: headline, active filters, KPIs and
/// every chart as a table.
pub fn build_report(title: &str, filters: &[String], shown: usize, total: usize, dashboard: &Dashboard) -> String {
    let mut report = MarkdownReport::new();
    let out = &mut report.output;

    let _ = writeln!(out, "# {title}");
    let _ = writeln!(out, "Showing {shown} of {total} responses");
    let _ = writeln!(out);
    if !filters.is_empty() {
        let _ = writeln!(out, "Filters:");
        for f in filters {
            let _ = writeln!(out, "- {f}");
        }
        let _ = writeln!(out);
    }
    kpi_section(out, &dashboard.kpis);

    for chart in &dashboard.charts {
        report.draw(chart);
    }
    report.finish()
}

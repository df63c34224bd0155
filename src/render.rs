use crate::analytics::aggregate::{self, CorrelationCell, GroupSummary};
use crate::analytics::kpi::{NpsSummary, Quadrant, QuadrantPoint};
use crate::analytics::text::{Sentiment, Share, ThemeSummary};

// ---------------------------------------------------------------------------
// Chart description handed to a renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// One bar per category.
    Bar,
    /// One bar per (category, series).
    GroupedBar,
    /// One line per series across ordered categories.
    Line,
    /// One bubble per record.
    Scatter,
    /// Square matrix of correlations.
    Heatmap,
    /// Stacked detractor / passive / promoter shares.
    Segments,
    /// Horizontal bars split into sentiment shares.
    StackedBar,
    /// Parts of a whole.
    Pie,
    /// One spoke per category, one loop per series.
    Radar,
}

/// A single aggregated datum a chart element is drawn from.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRecord {
    Group {
        series: String,
        summary: GroupSummary,
    },
    Correlation(CorrelationCell),
    Quadrant(QuadrantPoint),
    Segments(NpsSummary),
    Share(Share),
    Theme(ThemeSummary),
}

impl SummaryRecord {
    /// Category the record belongs to on the chart's main axis.
    pub fn category(&self) -> &str {
        match self {
            SummaryRecord::Group { summary, .. } => &summary.label,
            SummaryRecord::Correlation(c) => &c.row,
            SummaryRecord::Quadrant(p) => &p.label,
            SummaryRecord::Segments(s) => &s.label,
            SummaryRecord::Share(s) => &s.label,
            SummaryRecord::Theme(t) => &t.theme,
        }
    }
}

/// Reference line drawn behind the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guide {
    Horizontal(f64),
    Vertical(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Stable identifier, used for widget ids and selections.
    pub id: &'static str,
    pub title: String,
    pub kind: ChartKind,
    /// Axis caption for the value dimension.
    pub value_label: String,
    /// Value axis extent (scale of the metric, 0–100 for shares, −1..1 for correlations).
    pub value_range: (f64, f64),
    /// Category axis, in display order.
    pub categories: Vec<String>,
    /// Series names (metrics) for multi-series charts.
    pub series: Vec<String>,
    pub records: Vec<SummaryRecord>,
    pub guides: Vec<Guide>,
    /// Whether selecting an element opens a drill-down.
    pub selectable: bool,
}

/// The user picked one element of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub chart: &'static str,
    pub record: SummaryRecord,
}

// ---------------------------------------------------------------------------
// Renderer contract
// ---------------------------------------------------------------------------

/// Anything that can turn a [`Chart`] into something visible.
///
/// `draw` produces the view and reports a selection when the user picks a
/// record of a selectable chart. Hover text for a record comes from
/// [`hover_text`], so every renderer shows the same tooltip.
pub trait Renderer {
    fn draw(&mut self, chart: &Chart) -> Option<Selection>;
}

/// Tooltip for one record of `chart`.
pub fn hover_text(chart: &Chart, record: &SummaryRecord) -> String {
    match record {
        SummaryRecord::Group { series, summary } => {
            let value = match summary.mean {
                Some(v) => format!("{v:.2}/{}", chart.value_range.1),
                None => aggregate::display(None, 2),
            };
            format!("{}\n{series}: {value}\nResponses: {}", summary.label, summary.count)
        }
        SummaryRecord::Correlation(c) => {
            format!("{} × {}\nr = {:.2}", c.row, c.column, c.value)
        }
        SummaryRecord::Quadrant(p) => format!(
            "{}\nMean: {}\nAt risk: {}\nResponses: {}\n{}",
            p.label,
            aggregate::display(p.x, 2),
            p.y.map_or_else(|| aggregate::display(None, 1), |y| format!("{y:.1}%")),
            p.count,
            quadrant_name(p.quadrant),
        ),
        SummaryRecord::Segments(s) => match s.breakdown {
            Some(b) => format!(
                "{}\nNPS: {:+}\nPromoters: {:.0}%\nPassives: {:.0}%\nDetractors: {:.0}%\nResponses: {}",
                s.label,
                b.rounded(),
                b.promoter_pct(),
                b.passive_pct(),
                b.detractor_pct(),
                b.valid(),
            ),
            None => format!("{}\nno responses", s.label),
        },
        SummaryRecord::Share(s) => format!("{}\nResponses: {}\nShare: {:.1}%", s.label, s.count, s.pct),
        SummaryRecord::Theme(t) => {
            let mut text = format!(
                "{}\nMentioned in {:.1}% of comments ({})",
                t.theme, t.prevalence_pct, t.mentions
            );
            for sentiment in Sentiment::ALL {
                text.push_str(&format!("\n{}: {}", sentiment.name(), t.sentiment.count(sentiment)));
            }
            text
        }
    }
}

pub fn quadrant_name(q: Quadrant) -> &'static str {
    match q {
        Quadrant::Healthy => "Healthy",
        Quadrant::Critical => "Needs attention",
        Quadrant::Watch => "Watch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregate::NpsBreakdown;

    fn chart() -> Chart {
        Chart {
            id: "group_metric",
            title: "Overall Satisfaction by College".to_string(),
            kind: ChartKind::Bar,
            value_label: "Overall Satisfaction".to_string(),
            value_range: (0.0, 5.0),
            categories: vec!["Law".to_string()],
            series: vec![],
            records: vec![],
            guides: vec![],
            selectable: true,
        }
    }

    #[test]
    fn group_tooltip_shows_mean_or_no_data() {
        let mut summary = GroupSummary {
            label: "Law".to_string(),
            mean: Some(3.456),
            count: 12,
        };
        let record = SummaryRecord::Group {
            series: "Overall Satisfaction".to_string(),
            summary: summary.clone(),
        };
        assert_eq!(
            hover_text(&chart(), &record),
            "Law\nOverall Satisfaction: 3.46/5\nResponses: 12"
        );

        summary.mean = None;
        let record = SummaryRecord::Group {
            series: "Overall Satisfaction".to_string(),
            summary,
        };
        assert!(hover_text(&chart(), &record).contains("n/a"));
    }

    #[test]
    fn segment_tooltip_is_signed() {
        let record = SummaryRecord::Segments(NpsSummary {
            label: "Morning Keynote".to_string(),
            mean: Some(8.1),
            breakdown: NpsBreakdown::new(6, 3, 1),
            top_box: Some(70.0),
        });
        let text = hover_text(&chart(), &record);
        assert!(text.contains("NPS: +50"));
        assert!(text.contains("Responses: 10"));
    }

    #[test]
    fn theme_tooltip_lists_sentiment_counts() {
        let record = SummaryRecord::Theme(ThemeSummary {
            theme: "Venue & Logistics".to_string(),
            mentions: 3,
            prevalence_pct: 37.5,
            sentiment: crate::analytics::text::SentimentTally {
                positive: 2,
                neutral: 0,
                negative: 1,
            },
        });
        assert_eq!(
            hover_text(&chart(), &record),
            "Venue & Logistics\nMentioned in 37.5% of comments (3)\nPositive: 2\nNeutral: 0\nNegative: 1"
        );
        assert_eq!(record.category(), "Venue & Logistics");
    }
}

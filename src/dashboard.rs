use crate::analytics::aggregate::{self, GroupSummary};
use crate::analytics::kpi::{self, KpiCard};
use crate::analytics::metrics::{Metric, MetricRegistry};
use crate::analytics::text::{self, Sentiment, SentimentTally};
use crate::config::DashboardConfig;
use crate::data::model::{CellValue, Dataset, Row};
use crate::render::{Chart, ChartKind, Guide, SummaryRecord};

/// User choices that change what the charts show but not which rows count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSelection {
    /// Metric id for the primary "metric by group" chart.
    pub metric: Option<String>,
    /// Index into `DashboardConfig::comparisons`.
    pub comparison: usize,
}

/// Everything drawn for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub kpis: Vec<KpiCard>,
    pub charts: Vec<Chart>,
}

/// Section of a JSON source holding a precomputed sentiment tally.
pub const SENTIMENT_SECTION: &str = "sentiment_distribution";

/// Recompute every KPI and chart over `rows`, a subset of `dataset`.
///
/// Each chart is built independently; a chart whose metrics are missing from
/// the dataset is simply left out.
pub fn build(
    rows: &[&Row],
    dataset: &Dataset,
    config: &DashboardConfig,
    registry: &MetricRegistry,
    view: &ViewSelection,
) -> Dashboard {
    let charts = [
        group_metric_chart(rows, config, registry, view),
        quadrant_chart(rows, config, registry),
        comparison_chart(rows, config, registry, view),
        trend_chart(rows, config, registry),
        correlation_chart(rows, config, registry),
        segments_chart(rows, registry),
        profile_chart(rows, registry),
        sentiment_chart(rows, dataset, config),
        themes_chart(rows, dataset, config),
    ]
    .into_iter()
    .flatten()
    .collect();

    Dashboard {
        kpis: kpi::evaluate_kpis(rows, dataset.len(), registry, &config.kpis),
        charts,
    }
}

/// The metric the primary chart shows: the user's pick if still available,
/// else the first registered metric.
pub fn primary_metric<'a>(registry: &'a MetricRegistry, view: &ViewSelection) -> Option<&'a Metric> {
    view.metric
        .as_deref()
        .and_then(|id| registry.get(id))
        .or_else(|| registry.iter().next())
}

fn value_range(metric: &Metric) -> (f64, f64) {
    (metric.def.scale.min.min(0.0), metric.def.scale.max)
}

fn group_records(series: &str, summaries: Vec<GroupSummary>) -> Vec<SummaryRecord> {
    summaries
        .into_iter()
        .map(|summary| SummaryRecord::Group {
            series: series.to_string(),
            summary,
        })
        .collect()
}

/// Mean of the selected metric per primary group, best first.
pub fn group_metric_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
    view: &ViewSelection,
) -> Option<Chart> {
    let field = config.group_field.as_deref()?;
    let metric = primary_metric(registry, view)?;

    let mut summaries = aggregate::group_means(rows, field, metric, None);
    aggregate::sort_by_mean_desc(&mut summaries);

    Some(Chart {
        id: "group_metric",
        title: format!("{} by {field}", metric.label()),
        kind: ChartKind::Bar,
        value_label: metric.label().to_string(),
        value_range: value_range(metric),
        categories: summaries.iter().map(|s| s.label.clone()).collect(),
        series: vec![metric.label().to_string()],
        records: group_records(metric.label(), summaries),
        guides: Vec::new(),
        selectable: config.drill_down.is_some(),
    })
}

/// Breakdown of one primary group (the selected bar) by the drill-down field.
/// Categories without responses are omitted.
pub fn drill_down_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
    view: &ViewSelection,
    group: &str,
) -> Option<Chart> {
    let field = config.group_field.as_deref()?;
    let spec = config.drill_down.as_ref()?;
    let metric = primary_metric(registry, view)?;

    let group_key = CellValue::parse(group);
    let in_group: Vec<&Row> = rows
        .iter()
        .copied()
        .filter(|r| r.value(field) == &group_key)
        .collect();

    let expected = aggregate::categories(&spec.categories);
    let summaries: Vec<GroupSummary> =
        aggregate::group_means(&in_group, &spec.field, metric, Some(expected.as_slice()))
            .into_iter()
            .filter(|s| s.count > 0)
            .collect();

    Some(Chart {
        id: "drill_down",
        title: format!("{group}: {} by {}", metric.label(), spec.label),
        kind: ChartKind::Bar,
        value_label: metric.label().to_string(),
        value_range: value_range(metric),
        categories: summaries.iter().map(|s| s.label.clone()).collect(),
        series: vec![metric.label().to_string()],
        records: group_records(metric.label(), summaries),
        guides: Vec::new(),
        selectable: false,
    })
}

/// Score vs. risk bubbles per primary group.
pub fn quadrant_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
) -> Option<Chart> {
    let field = config.group_field.as_deref()?;
    let spec = config.risk_quadrant.as_ref()?;
    let points = kpi::risk_quadrant(rows, field, registry, spec)?;
    let x_metric = registry.get(&spec.x_metric)?;
    let y_metric = registry.get(&spec.y_metric)?;

    Some(Chart {
        id: "risk_quadrant",
        title: format!("{} vs. {} by {field}", x_metric.label(), y_metric.label()),
        kind: ChartKind::Scatter,
        value_label: format!("{} ≥ {} (%)", y_metric.label(), spec.y_at_least),
        value_range: (0.0, 100.0),
        categories: points.iter().map(|p| p.label.clone()).collect(),
        series: vec![x_metric.label().to_string()],
        records: points.into_iter().map(SummaryRecord::Quadrant).collect(),
        guides: vec![Guide::Vertical(spec.x_cut), Guide::Horizontal(spec.y_cut)],
        selectable: false,
    })
}

/// Several metrics side by side for the selected demographic grouping.
/// Groups without responses are dropped.
pub fn comparison_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
    view: &ViewSelection,
) -> Option<Chart> {
    let spec = config
        .comparisons
        .get(view.comparison)
        .or_else(|| config.comparisons.first())?;
    let metrics = registry.select(&config.comparison_metrics);
    let first = metrics.first()?;

    let expected = aggregate::categories(&spec.categories);
    let occupied: Vec<String> = aggregate::group_means(rows, &spec.field, *first, Some(expected.as_slice()))
        .into_iter()
        .filter(|s| s.count > 0)
        .map(|s| s.label)
        .collect();

    let mut records = Vec::new();
    for metric in &metrics {
        let summaries = aggregate::group_means(rows, &spec.field, *metric, Some(expected.as_slice()))
            .into_iter()
            .filter(|s| occupied.contains(&s.label))
            .collect();
        records.extend(group_records(metric.label(), summaries));
    }

    Some(Chart {
        id: "comparison",
        title: format!("Comparison by {}", spec.label),
        kind: ChartKind::GroupedBar,
        value_label: "Mean score".to_string(),
        value_range: value_range(first),
        categories: occupied,
        series: metrics.iter().map(|m| m.label().to_string()).collect(),
        records,
        guides: Vec::new(),
        selectable: false,
    })
}

/// Metric means along the ordered trend categories.
pub fn trend_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
) -> Option<Chart> {
    let spec = config.trend.as_ref()?;
    let metrics = registry.select(&spec.metrics);
    let first = metrics.first()?;
    let expected = aggregate::categories(&spec.categories);

    let mut records = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    for metric in &metrics {
        let summaries: Vec<GroupSummary> =
            aggregate::group_means(rows, &spec.field, *metric, Some(expected.as_slice()))
                .into_iter()
                .filter(|s| s.count > 0)
                .collect();
        for s in &summaries {
            if !categories.contains(&s.label) {
                categories.push(s.label.clone());
            }
        }
        records.extend(group_records(metric.label(), summaries));
    }
    // Keep the configured order even if the first metric skipped a category.
    categories.sort_by_key(|c| spec.categories.iter().position(|e| e == c));

    Some(Chart {
        id: "trend",
        title: format!("Trend by {}", spec.label),
        kind: ChartKind::Line,
        value_label: "Mean score".to_string(),
        value_range: value_range(first),
        categories,
        series: metrics.iter().map(|m| m.label().to_string()).collect(),
        records,
        guides: Vec::new(),
        selectable: false,
    })
}

/// Pearson correlations between the configured metrics.
pub fn correlation_chart(
    rows: &[&Row],
    config: &DashboardConfig,
    registry: &MetricRegistry,
) -> Option<Chart> {
    let metrics = registry.select(&config.correlation_metrics);
    if metrics.len() < 2 {
        return None;
    }
    let cells = aggregate::correlation_matrix(rows, &metrics);

    Some(Chart {
        id: "correlation",
        title: "Correlation matrix".to_string(),
        kind: ChartKind::Heatmap,
        value_label: "Pearson r".to_string(),
        value_range: (-1.0, 1.0),
        categories: metrics.iter().map(|m| m.label().to_string()).collect(),
        series: Vec::new(),
        records: cells.into_iter().map(SummaryRecord::Correlation).collect(),
        guides: Vec::new(),
        selectable: false,
    })
}

/// Promoter / passive / detractor split of every recommendation question.
pub fn segments_chart(rows: &[&Row], registry: &MetricRegistry) -> Option<Chart> {
    let summaries = kpi::nps_summaries(rows, registry);
    if summaries.is_empty() {
        return None;
    }

    Some(Chart {
        id: "nps_segments",
        title: "Net Promoter breakdown".to_string(),
        kind: ChartKind::Segments,
        value_label: "Share of responses (%)".to_string(),
        value_range: (0.0, 100.0),
        categories: summaries.iter().map(|s| s.label.clone()).collect(),
        series: ["Detractors", "Passives", "Promoters"].map(String::from).to_vec(),
        records: summaries.into_iter().map(SummaryRecord::Segments).collect(),
        guides: Vec::new(),
        selectable: false,
    })
}

/// Mean of every registered metric on one radar. Needs three metrics.
pub fn profile_chart(rows: &[&Row], registry: &MetricRegistry) -> Option<Chart> {
    if registry.len() < 3 {
        return None;
    }
    let series = "Mean".to_string();
    let summaries: Vec<GroupSummary> = registry
        .iter()
        .map(|m| GroupSummary {
            label: m.label().to_string(),
            mean: aggregate::mean(rows, m),
            count: aggregate::values(rows, m).count(),
        })
        .collect();
    let lo = registry.iter().map(|m| m.def.scale.min).fold(0.0, f64::min);
    let hi = registry.iter().map(|m| m.def.scale.max).fold(f64::MIN, f64::max);
    // An empty subset draws nothing rather than a collapsed loop.
    let records = if summaries.iter().all(|s| s.mean.is_none()) {
        Vec::new()
    } else {
        group_records(&series, summaries.clone())
    };

    Some(Chart {
        id: "metric_profile",
        title: "Metric profile".to_string(),
        kind: ChartKind::Radar,
        value_label: "Mean score".to_string(),
        value_range: (lo, hi),
        categories: summaries.into_iter().map(|s| s.label).collect(),
        series: vec![series],
        records,
        guides: Vec::new(),
        selectable: false,
    })
}

/// Sentiment of the configured free-text answers in the subset. Without that
/// column, a precomputed tally in the source document is shown instead; it
/// covers every response and ignores filters.
pub fn sentiment_chart(rows: &[&Row], dataset: &Dataset, config: &DashboardConfig) -> Option<Chart> {
    let (title, tally) = match &config.text_analysis {
        Some(spec) if dataset.has_column(&spec.field) => (
            format!("Sentiment: {}", spec.label),
            text::sentiment_distribution(rows, &spec.field),
        ),
        _ => {
            let section = dataset.sections.get(SENTIMENT_SECTION)?;
            let tally: SentimentTally = serde_json::from_value(section.clone())
                .map_err(|e| log::warn!("Ignoring malformed '{SENTIMENT_SECTION}' section: {e}"))
                .ok()?;
            ("Sentiment (all responses)".to_string(), tally)
        }
    };

    Some(Chart {
        id: "sentiment",
        title,
        kind: ChartKind::Pie,
        value_label: "Share of comments (%)".to_string(),
        value_range: (0.0, 100.0),
        categories: Sentiment::ALL.iter().map(|s| s.name().to_string()).collect(),
        series: Vec::new(),
        records: tally.shares().into_iter().map(SummaryRecord::Share).collect(),
        guides: Vec::new(),
        selectable: false,
    })
}

/// Theme prevalence among the configured free-text answers, split by sentiment.
pub fn themes_chart(rows: &[&Row], dataset: &Dataset, config: &DashboardConfig) -> Option<Chart> {
    let spec = config.text_analysis.as_ref()?;
    if !dataset.has_column(&spec.field) {
        return None;
    }
    let summaries = text::theme_prevalence(rows, &spec.field, &spec.themes);

    Some(Chart {
        id: "themes",
        title: format!("Themes: {}", spec.label),
        kind: ChartKind::StackedBar,
        value_label: "Share of comments (%)".to_string(),
        value_range: (0.0, 100.0),
        categories: summaries.iter().map(|t| t.theme.clone()).collect(),
        series: Sentiment::ALL.iter().map(|s| s.name().to_string()).collect(),
        records: summaries.into_iter().map(SummaryRecord::Theme).collect(),
        guides: Vec::new(),
        selectable: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::MetricRegistry;
    use crate::data::loader::{parse_delimited, parse_json, LoadOptions};
    use crate::data::model::Dataset;

    const FACULTY: &str = "\
ResponseID,College,Gender,YearsAtInstitution,Q8_OverallSatisfaction,Q9_LikelihoodToRecommend,Q10_ConsideredLeaving,Q13_WorkLifeBalance,Q27_Belonging
1,Engineering,Woman,0-2 years,5,5,1,4,4
2,Engineering,Man,3-5 years,4,4,2,3,4
3,Business,Man,0-2 years,2,1,5,2,2
4,Business,Woman,16-20 years,3,3,4,3,3
5,Arts,Man,0-2 years,4,2,,4,5
";

    fn setup() -> (Dataset, DashboardConfig, MetricRegistry) {
        let config = DashboardConfig::faculty_satisfaction();
        let ds = parse_delimited(FACULTY.as_bytes(), b',', &LoadOptions::default()).unwrap();
        let (registry, _) = MetricRegistry::resolve(&config.metrics, &ds);
        (ds, config, registry)
    }

    fn rows(ds: &Dataset) -> Vec<&Row> {
        ds.rows.iter().collect()
    }

    fn chart<'a>(d: &'a Dashboard, id: &str) -> Option<&'a Chart> {
        d.charts.iter().find(|c| c.id == id)
    }

    #[test]
    fn builds_every_chart_whose_metrics_exist() {
        let (ds, config, registry) = setup();
        let d = build(&rows(&ds), &ds, &config, &registry, &ViewSelection::default());
        let ids: Vec<&str> = d.charts.iter().map(|c| c.id).collect();
        // Q22 and Q26 are absent: the heatmap still has three metrics.
        assert_eq!(
            ids,
            vec![
                "group_metric",
                "risk_quadrant",
                "comparison",
                "trend",
                "correlation",
                "nps_segments",
                "metric_profile"
            ]
        );
        assert_eq!(chart(&d, "correlation").unwrap().categories.len(), 3);
        assert_eq!(d.kpis.len(), config.kpis.len());
    }

    #[test]
    fn group_chart_is_sorted_and_follows_selected_metric() {
        let (ds, config, registry) = setup();
        let view = ViewSelection {
            metric: Some("Q27_Belonging".to_string()),
            comparison: 0,
        };
        let c = group_metric_chart(&rows(&ds), &config, &registry, &view).unwrap();
        assert_eq!(c.title, "Belonging by College");
        assert_eq!(c.categories, vec!["Arts", "Engineering", "Business"]);
        assert!(c.selectable);

        let fallback = ViewSelection {
            metric: Some("Q99".to_string()),
            comparison: 0,
        };
        let c = group_metric_chart(&rows(&ds), &config, &registry, &fallback).unwrap();
        assert!(c.title.starts_with("Overall Satisfaction"));
    }

    #[test]
    fn drill_down_omits_empty_categories() {
        let (ds, config, registry) = setup();
        let c = drill_down_chart(&rows(&ds), &config, &registry, &ViewSelection::default(), "Arts")
            .unwrap();
        assert_eq!(c.categories, vec!["Man"]);
        match &c.records[0] {
            SummaryRecord::Group { summary, .. } => {
                assert_eq!(summary.mean, Some(4.0));
                assert_eq!(summary.count, 1);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn comparison_keeps_only_groups_with_responses() {
        let (ds, config, registry) = setup();
        let c = comparison_chart(&rows(&ds), &config, &registry, &ViewSelection::default()).unwrap();
        assert_eq!(c.categories, vec!["Man", "Woman"]);
        // Q26 is missing, so three of the four comparison metrics remain.
        assert_eq!(c.series.len(), 3);
        assert_eq!(c.records.len(), 6);
    }

    #[test]
    fn trend_follows_configured_order() {
        let (ds, config, registry) = setup();
        let c = trend_chart(&rows(&ds), &config, &registry).unwrap();
        assert_eq!(c.categories, vec!["0-2 years", "3-5 years", "16-20 years"]);
    }

    #[test]
    fn empty_subset_still_renders() {
        let (ds, config, registry) = setup();
        let d = build(&[], &ds, &config, &registry, &ViewSelection::default());
        let group = chart(&d, "group_metric").unwrap();
        assert!(group.records.is_empty());
        let heat = chart(&d, "correlation").unwrap();
        assert!(heat.records.iter().all(|r| matches!(
            r,
            SummaryRecord::Correlation(c) if c.value == 0.0
        )));
    }

    #[test]
    fn profile_has_one_spoke_per_metric() {
        let (ds, _, registry) = setup();
        let c = profile_chart(&rows(&ds), &registry).unwrap();
        assert_eq!(c.kind, ChartKind::Radar);
        assert_eq!(c.categories.len(), registry.len());
        assert_eq!(c.value_range, (0.0, 5.0));
        assert!(matches!(
            &c.records[0],
            SummaryRecord::Group { summary, .. }
                if summary.label == "Overall Satisfaction" && summary.mean == Some(3.6)
        ));
        assert!(profile_chart(&[], &registry).unwrap().records.is_empty());
    }

    #[test]
    fn free_text_drives_sentiment_and_themes() {
        let config = DashboardConfig::staff_development();
        let text = "RespondentID,Department,Overall_NPS,Feedback\n\
                    a,IT,9,Great keynote\n\
                    b,IT,4,Rushed and confusing schedule\n\
                    c,HR,7,\n";
        let ds = parse_delimited(text.as_bytes(), b',', &LoadOptions::default()).unwrap();
        let all = rows(&ds);

        let pie = sentiment_chart(&all, &ds, &config).unwrap();
        assert_eq!(pie.kind, ChartKind::Pie);
        assert!(matches!(&pie.records[0], SummaryRecord::Share(s) if s.count == 1 && s.pct == 50.0));

        let themes = themes_chart(&all, &ds, &config).unwrap();
        assert_eq!(themes.categories, vec!["Session Timing & Duration", "Keynotes"]);
        // Only the unanswered row is left.
        assert!(themes_chart(&all[2..], &ds, &config).unwrap().records.is_empty());
        assert!(sentiment_chart(&all[2..], &ds, &config).unwrap().records.is_empty());
    }

    #[test]
    fn sentiment_falls_back_to_document_tally() {
        let config = DashboardConfig::staff_development();
        let text = r#"{"sentiment_distribution": {"positive": 6, "neutral": 3, "negative": 1},
                       "responses": [{"RespondentID": "a", "Overall_NPS": 9}]}"#;
        let ds = parse_json(text, &LoadOptions::default()).unwrap();

        let c = sentiment_chart(&rows(&ds), &ds, &config).unwrap();
        assert_eq!(c.title, "Sentiment (all responses)");
        assert!(matches!(&c.records[0], SummaryRecord::Share(s) if s.label == "Positive" && s.pct == 60.0));
        assert!(themes_chart(&rows(&ds), &ds, &config).is_none());

        let (plain, faculty, _) = setup();
        assert!(sentiment_chart(&rows(&plain), &plain, &faculty).is_none());
    }
}

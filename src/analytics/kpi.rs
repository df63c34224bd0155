use std::borrow::Borrow;

use super::aggregate::{self, NpsBreakdown};
use super::metrics::MetricRegistry;
use crate::config::{Bands, KpiSpec, QuadrantSpec};
use crate::data::model::Row;

// ---------------------------------------------------------------------------
// KPI cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Good,
    Warning,
    Critical,
    /// Informational value with no target (sample size).
    Neutral,
    NoData,
}

impl Band {
    pub fn classify(value: Option<f64>, bands: &Bands) -> Band {
        let Some(v) = value else {
            return Band::NoData;
        };
        let (good, warning) = if bands.higher_is_better {
            (v >= bands.good, v >= bands.warning)
        } else {
            (v < bands.good, v < bands.warning)
        };
        if good {
            Band::Good
        } else if warning {
            Band::Warning
        } else {
            Band::Critical
        }
    }
}

/// One headline number.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub label: String,
    /// Full-precision value; `None` means no data.
    pub value: Option<f64>,
    /// Formatted value ("3.87", "+17", "22.5%", "n/a").
    pub display: String,
    pub subtitle: String,
    pub band: Band,
}

/// Evaluate every KPI over the current subset. `total_rows` is the size of
/// the unfiltered dataset (for the sample-size card).
pub fn evaluate_kpis<R: Borrow<Row>>(
    rows: &[R],
    total_rows: usize,
    registry: &MetricRegistry,
    specs: &[KpiSpec],
) -> Vec<KpiCard> {
    specs
        .iter()
        .map(|spec| evaluate(rows, total_rows, registry, spec))
        .collect()
}

fn evaluate<R: Borrow<Row>>(
    rows: &[R],
    total_rows: usize,
    registry: &MetricRegistry,
    spec: &KpiSpec,
) -> KpiCard {
    let label = spec.label().to_string();
    let metric = spec.metric().and_then(|id| registry.get(id));

    match (spec, metric) {
        (KpiSpec::SampleSize { .. }, _) => {
            let n = rows.len();
            let share = (total_rows > 0).then(|| 100.0 * n as f64 / total_rows as f64);
            KpiCard {
                label,
                value: Some(n as f64),
                display: n.to_string(),
                subtitle: format!("{}% of {total_rows}", aggregate::display(share, 1)),
                band: Band::Neutral,
            }
        }
        (_, None) => KpiCard {
            label,
            value: None,
            display: aggregate::display(None, 0),
            subtitle: "not in dataset".to_string(),
            band: Band::NoData,
        },
        (KpiSpec::Mean { bands, .. }, Some(metric)) => {
            let value = aggregate::mean(rows, metric);
            KpiCard {
                label,
                value,
                display: aggregate::display(value, 2),
                subtitle: format!("out of {}", metric.def.scale.max),
                band: Band::classify(value, bands),
            }
        }
        (KpiSpec::Nps { bands, .. }, Some(metric)) => {
            let breakdown = aggregate::metric_nps(rows, metric);
            let value = breakdown.map(|b| b.score());
            KpiCard {
                label,
                value,
                display: breakdown.map_or_else(|| aggregate::display(None, 0), signed),
                subtitle: breakdown.map_or_else(String::new, |b| {
                    format!("{:.0}% promoters", b.promoter_pct())
                }),
                band: Band::classify(value, bands),
            }
        }
        (
            KpiSpec::PercentAtLeast {
                threshold, bands, ..
            },
            Some(metric),
        ) => {
            let value = aggregate::percentage_at_least(rows, metric, *threshold);
            let hits = aggregate::values(rows, metric)
                .filter(|v| v >= threshold)
                .count();
            KpiCard {
                label,
                value,
                display: value.map_or_else(|| aggregate::display(None, 0), |v| format!("{v:.1}%")),
                subtitle: format!("{hits} respondents at {threshold} or above"),
                band: Band::classify(value, bands),
            }
        }
    }
}

fn signed(b: NpsBreakdown) -> String {
    match b.rounded() {
        n if n > 0 => format!("+{n}"),
        n => n.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Risk quadrant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    /// High score, low risk.
    Healthy,
    /// Low score, high risk.
    Critical,
    /// Anything else, including groups without data.
    Watch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantPoint {
    pub label: String,
    /// Mean of the x metric.
    pub x: Option<f64>,
    /// Share (0–100) of the y metric at or above the spec threshold.
    pub y: Option<f64>,
    pub count: usize,
    pub quadrant: Quadrant,
}

/// One point per group of `group_field`. `None` when either metric is
/// unavailable.
pub fn risk_quadrant<R: Borrow<Row>>(
    rows: &[R],
    group_field: &str,
    registry: &MetricRegistry,
    spec: &QuadrantSpec,
) -> Option<Vec<QuadrantPoint>> {
    let x_metric = registry.get(&spec.x_metric)?;
    let y_metric = registry.get(&spec.y_metric)?;

    let points = aggregate::group_by(rows, group_field)
        .into_iter()
        .map(|g| {
            let x = aggregate::mean(&g.rows, x_metric);
            let y = aggregate::percentage_at_least(&g.rows, y_metric, spec.y_at_least);
            QuadrantPoint {
                label: g.label(),
                x,
                y,
                count: g.rows.len(),
                quadrant: classify_quadrant(x, y, spec),
            }
        })
        .collect();
    Some(points)
}

fn classify_quadrant(x: Option<f64>, y: Option<f64>, spec: &QuadrantSpec) -> Quadrant {
    match (x, y) {
        (Some(x), Some(y)) if x >= spec.x_cut && y < spec.y_cut => Quadrant::Healthy,
        (Some(x), Some(y)) if x < spec.x_cut && y >= spec.y_cut => Quadrant::Critical,
        _ => Quadrant::Watch,
    }
}

// ---------------------------------------------------------------------------
// NPS segments
// ---------------------------------------------------------------------------

/// Promoter / passive / detractor split of one recommendation question.
#[derive(Debug, Clone, PartialEq)]
pub struct NpsSummary {
    pub label: String,
    pub mean: Option<f64>,
    pub breakdown: Option<NpsBreakdown>,
    /// Share in the metric's top box, when it defines one.
    pub top_box: Option<f64>,
}

/// Segment split for every NPS-style metric in the registry.
pub fn nps_summaries<R: Borrow<Row>>(rows: &[R], registry: &MetricRegistry) -> Vec<NpsSummary> {
    registry
        .iter()
        .filter(|m| m.def.nps.is_some())
        .map(|m| NpsSummary {
            label: m.label().to_string(),
            mean: aggregate::mean(rows, m),
            breakdown: aggregate::metric_nps(rows, m),
            top_box: aggregate::top_box(rows, m),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::data::loader::{parse_delimited, LoadOptions};
    use crate::data::model::Dataset;

    const FACULTY: &str = "\
ResponseID,College,Q8_OverallSatisfaction,Q9_LikelihoodToRecommend,Q10_ConsideredLeaving,Q27_Belonging
1,Engineering,5,5,1,4
2,Engineering,4,4,2,4
3,Business,2,1,5,2
4,Business,3,3,4,3
5,Arts,4,2,,5
";

    fn faculty() -> (Dataset, DashboardConfig, MetricRegistry) {
        let ds = parse_delimited(FACULTY.as_bytes(), b',', &LoadOptions::default()).unwrap();
        let config = DashboardConfig::faculty_satisfaction();
        let (registry, _) = MetricRegistry::resolve(&config.metrics, &ds);
        (ds, config, registry)
    }

    #[test]
    fn bands_follow_direction() {
        let higher = Bands::higher(4.0, 3.5);
        assert_eq!(Band::classify(Some(4.2), &higher), Band::Good);
        assert_eq!(Band::classify(Some(3.6), &higher), Band::Warning);
        assert_eq!(Band::classify(Some(2.0), &higher), Band::Critical);
        assert_eq!(Band::classify(None, &higher), Band::NoData);

        let lower = Bands::lower(20.0, 30.0);
        assert_eq!(Band::classify(Some(10.0), &lower), Band::Good);
        assert_eq!(Band::classify(Some(25.0), &lower), Band::Warning);
        assert_eq!(Band::classify(Some(30.0), &lower), Band::Critical);
    }

    #[test]
    fn faculty_kpis() {
        let (ds, config, registry) = faculty();
        let cards = evaluate_kpis(&ds.rows, ds.len(), &registry, &config.kpis);
        let by_label = |l: &str| cards.iter().find(|c| c.label == l).unwrap();

        let sat = by_label("Overall Satisfaction");
        assert_eq!(sat.value, Some(3.6));
        assert_eq!(sat.display, "3.60");
        assert_eq!(sat.band, Band::Warning);

        // promoters 5,4 (2/5), detractors 1,2 (2/5)
        let enps = by_label("eNPS");
        assert_eq!(enps.value, Some(0.0));
        assert_eq!(enps.display, "0");

        // Q10 >= 4: rows 3 and 4 out of 4 valid answers
        let risk = by_label("Retention Risk");
        assert_eq!(risk.value, Some(50.0));
        assert_eq!(risk.display, "50.0%");
        assert_eq!(risk.band, Band::Critical);

        // Q26 is not in this dataset
        let psych = by_label("Psychological Safety");
        assert_eq!(psych.band, Band::NoData);
        assert_eq!(psych.display, "n/a");

        let n = by_label("Sample Size");
        assert_eq!(n.display, "5");
        assert_eq!(n.subtitle, "100.0% of 5");
    }

    #[test]
    fn empty_subset_yields_no_data_cards() {
        let (ds, config, registry) = faculty();
        let none: Vec<&Row> = Vec::new();
        let cards = evaluate_kpis(&none, ds.len(), &registry, &config.kpis);
        for card in cards.iter().filter(|c| c.band != Band::Neutral) {
            assert_eq!(card.value, None, "{}", card.label);
            assert_eq!(card.band, Band::NoData);
        }
    }

    #[test]
    fn quadrant_points_per_group() {
        let (ds, config, registry) = faculty();
        let spec = config.risk_quadrant.as_ref().unwrap();
        let points = risk_quadrant(&ds.rows, "College", &registry, spec).unwrap();
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Engineering", "Business", "Arts"]);

        assert_eq!(points[0].x, Some(4.5));
        assert_eq!(points[0].y, Some(0.0));
        assert_eq!(points[0].quadrant, Quadrant::Healthy);
        assert_eq!(points[1].x, Some(2.5));
        assert_eq!(points[1].y, Some(100.0));
        assert_eq!(points[1].quadrant, Quadrant::Critical);
        // Arts has no Q10 answers
        assert_eq!(points[2].y, None);
        assert_eq!(points[2].quadrant, Quadrant::Watch);
    }

    #[test]
    fn nps_summaries_cover_recommendation_metrics() {
        let (ds, _, registry) = faculty();
        let summaries = nps_summaries(&ds.rows, &registry);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].label, "Likelihood to Recommend");
        assert_eq!(summaries[0].breakdown.unwrap().passives(), 1);
        assert_eq!(summaries[0].top_box, None);
    }
}

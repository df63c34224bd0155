use std::borrow::Borrow;
use std::collections::BTreeMap;

use super::metrics::{Measure, Metric};
use crate::data::model::{CellValue, Row};

// ---------------------------------------------------------------------------
// Summary records
// ---------------------------------------------------------------------------

/// Mean of one metric within one group. `mean` is `None` when the group has
/// no valid answers; it must be shown as "no data", never as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub label: String,
    pub mean: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationCell {
    pub row: String,
    pub column: String,
    pub value: f64,
}

/// Promoter / passive / detractor tally over the valid answers of a question.
/// Holds at least one answer, so every share is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpsBreakdown {
    promoters: usize,
    passives: usize,
    detractors: usize,
}

impl NpsBreakdown {
    /// `None` for an empty tally.
    pub fn new(promoters: usize, passives: usize, detractors: usize) -> Option<Self> {
        let tally = NpsBreakdown {
            promoters,
            passives,
            detractors,
        };
        (tally.valid() > 0).then_some(tally)
    }

    pub fn promoters(&self) -> usize {
        self.promoters
    }

    pub fn passives(&self) -> usize {
        self.passives
    }

    pub fn detractors(&self) -> usize {
        self.detractors
    }

    /// Number of valid answers; never zero.
    pub fn valid(&self) -> usize {
        self.promoters + self.passives + self.detractors
    }

    pub fn promoter_pct(&self) -> f64 {
        pct(self.promoters, self.valid())
    }

    pub fn passive_pct(&self) -> f64 {
        pct(self.passives, self.valid())
    }

    pub fn detractor_pct(&self) -> f64 {
        pct(self.detractors, self.valid())
    }

    /// `100 × (promoter share − detractor share)`, full precision.
    pub fn score(&self) -> f64 {
        100.0 * (self.promoters as f64 - self.detractors as f64) / self.valid() as f64
    }

    /// Score rounded to the nearest integer (halves away from zero) for display.
    pub fn rounded(&self) -> i64 {
        self.score().round() as i64
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    100.0 * part as f64 / whole as f64
}

// ---------------------------------------------------------------------------
// Scalar aggregations
// ---------------------------------------------------------------------------

/// Valid numeric observations of `measure`, in row order.
pub fn values<'a, R, M>(rows: &'a [R], measure: &'a M) -> impl Iterator<Item = f64> + 'a
where
    R: Borrow<Row>,
    M: Measure + ?Sized,
{
    rows.iter()
        .filter_map(move |r| measure.measure(<R as Borrow<Row>>::borrow(r)))
}

/// Average of the valid values; `None` when there are none.
pub fn mean<R: Borrow<Row>, M: Measure + ?Sized>(rows: &[R], measure: &M) -> Option<f64> {
    let (sum, n) = values(rows, measure).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Share (0–100) of valid values that are `>= threshold`.
pub fn percentage_at_least<R: Borrow<Row>, M: Measure + ?Sized>(
    rows: &[R],
    measure: &M,
    threshold: f64,
) -> Option<f64> {
    share_where(rows, measure, |v| v >= threshold)
}

/// Share (0–100) of valid values that are `<= threshold`.
pub fn percentage_at_most<R: Borrow<Row>, M: Measure + ?Sized>(
    rows: &[R],
    measure: &M,
    threshold: f64,
) -> Option<f64> {
    share_where(rows, measure, |v| v <= threshold)
}

fn share_where<R, M, P>(rows: &[R], measure: &M, pred: P) -> Option<f64>
where
    R: Borrow<Row>,
    M: Measure + ?Sized,
    P: Fn(f64) -> bool,
{
    let (hits, n) = values(rows, measure).fold((0usize, 0usize), |(h, n), v| {
        (h + usize::from(pred(v)), n + 1)
    });
    (n > 0).then(|| pct(hits, n))
}

/// Net Promoter Score breakdown; `None` when there are no valid answers.
/// Shares use the valid-answer count as denominator.
pub fn net_promoter_score<R: Borrow<Row>, M: Measure + ?Sized>(
    rows: &[R],
    measure: &M,
    promoter_at_least: f64,
    detractor_at_most: f64,
) -> Option<NpsBreakdown> {
    let (mut promoters, mut passives, mut detractors) = (0, 0, 0);
    for v in values(rows, measure) {
        if v >= promoter_at_least {
            promoters += 1;
        } else if v <= detractor_at_most {
            detractors += 1;
        } else {
            passives += 1;
        }
    }
    NpsBreakdown::new(promoters, passives, detractors)
}

/// NPS with the metric's own thresholds; `None` for metrics without them.
pub fn metric_nps<R: Borrow<Row>>(rows: &[R], metric: &Metric) -> Option<NpsBreakdown> {
    let t = metric.def.nps?;
    net_promoter_score(rows, metric, t.promoter_at_least, t.detractor_at_most)
}

/// Top-2 Box share for metrics that define the band.
pub fn top_box<R: Borrow<Row>>(rows: &[R], metric: &Metric) -> Option<f64> {
    percentage_at_least(rows, metric, metric.def.top_box_at_least?)
}

/// Pearson product-moment correlation over rows where both values are valid.
///
/// Fewer than two pairs, or zero variance on either side, yields `0.0`
/// rather than NaN so heatmap colour scales stay well-defined.
pub fn pearson_correlation<R, A, B>(rows: &[R], a: &A, b: &B) -> f64
where
    R: Borrow<Row>,
    A: Measure + ?Sized,
    B: Measure + ?Sized,
{
    let pairs: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| {
            let r = <R as Borrow<Row>>::borrow(r);
            Some((a.measure(r)?, b.measure(r)?))
        })
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut num, mut den_x, mut den_y) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    if den_x == 0.0 || den_y == 0.0 {
        return 0.0;
    }
    (num / (den_x * den_y).sqrt()).clamp(-1.0, 1.0)
}

/// Every pair of `metrics`, row-major.
pub fn correlation_matrix<R: Borrow<Row>>(rows: &[R], metrics: &[&Metric]) -> Vec<CorrelationCell> {
    let mut cells = Vec::with_capacity(metrics.len() * metrics.len());
    for a in metrics {
        for b in metrics {
            cells.push(CorrelationCell {
                row: a.label().to_string(),
                column: b.label().to_string(),
                value: pearson_correlation(rows, *a, *b),
            });
        }
    }
    cells
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Rows sharing one category value.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    pub key: CellValue,
    pub rows: Vec<&'a Row>,
}

impl Group<'_> {
    pub fn label(&self) -> String {
        self.key.to_string()
    }
}

/// Partition rows by `field`, groups in first-seen order. Rows with no value
/// for `field` belong to no group.
pub fn group_by<'a, R: Borrow<Row>>(rows: &'a [R], field: &str) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: BTreeMap<&'a CellValue, usize> = BTreeMap::new();

    for r in rows {
        let row: &'a Row = <R as Borrow<Row>>::borrow(r);
        let key = row.value(field);
        if key.is_null() {
            continue;
        }
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                key: key.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

/// Partition rows into exactly the `expected` categories, in that order.
/// Categories with no rows are kept (empty); rows outside the list are ignored.
pub fn group_by_categories<'a, R: Borrow<Row>>(
    rows: &'a [R],
    field: &str,
    expected: &[CellValue],
) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = expected
        .iter()
        .map(|key| Group {
            key: key.clone(),
            rows: Vec::new(),
        })
        .collect();

    for r in rows {
        let row: &'a Row = <R as Borrow<Row>>::borrow(r);
        let value = row.value(field);
        if let Some(g) = groups.iter_mut().find(|g| &g.key == value) {
            g.rows.push(row);
        }
    }
    groups
}

/// Mean of `measure` per group. With `expected` categories every category is
/// reported (empty ones with `mean: None`); without, only occurring ones.
pub fn group_means<R: Borrow<Row>, M: Measure + ?Sized>(
    rows: &[R],
    field: &str,
    measure: &M,
    expected: Option<&[CellValue]>,
) -> Vec<GroupSummary> {
    let groups = match expected {
        Some(expected) if !expected.is_empty() => group_by_categories(rows, field, expected),
        _ => group_by(rows, field),
    };
    groups
        .iter()
        .map(|g| GroupSummary {
            label: g.label(),
            mean: mean(&g.rows, measure),
            count: g.rows.len(),
        })
        .collect()
}

/// Highest mean first; groups without data sink to the bottom.
pub fn sort_by_mean_desc(summaries: &mut [GroupSummary]) {
    summaries.sort_by(|a, b| match (a.mean, b.mean) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Parse configured category labels the same way the loader parses cells.
pub fn categories(labels: &[String]) -> Vec<CellValue> {
    labels.iter().map(|l| CellValue::parse(l)).collect()
}

/// Format a statistic that may be absent.
pub fn display(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

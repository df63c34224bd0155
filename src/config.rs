use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming a dashboard config file to open at start-up.
pub const CONFIG_ENV: &str = "SURVEY_LENS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dashboard config")]
    Json(#[from] serde_json::Error),
    #[error("invalid dashboard config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Metric definitions
// ---------------------------------------------------------------------------

/// Valid answer range of a score question, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub const LIKERT_5: Scale = Scale { min: 1.0, max: 5.0 };
    pub const ZERO_TO_TEN: Scale = Scale { min: 0.0, max: 10.0 };

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Promoter / detractor classification for recommendation-style questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpsThresholds {
    pub promoter_at_least: f64,
    pub detractor_at_most: f64,
}

/// One numeric survey question the dashboard knows how to aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Stable identifier referenced by the rest of the config.
    pub id: String,
    pub label: String,
    /// Column in the dataset.
    pub field: String,
    pub scale: Scale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps: Option<NpsThresholds>,
    /// Lower bound of the "Top-2 Box" band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_box_at_least: Option<f64>,
}

impl MetricDefinition {
    pub fn new(id: &str, label: &str, scale: Scale) -> Self {
        MetricDefinition {
            id: id.to_string(),
            label: label.to_string(),
            field: id.to_string(),
            scale,
            nps: None,
            top_box_at_least: None,
        }
    }

    pub fn with_nps(mut self, promoter_at_least: f64, detractor_at_most: f64) -> Self {
        self.nps = Some(NpsThresholds {
            promoter_at_least,
            detractor_at_most,
        });
        self
    }

    pub fn with_top_box(mut self, at_least: f64) -> Self {
        self.top_box_at_least = Some(at_least);
        self
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Slider constraining a metric to a minimum value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFilterSpec {
    pub metric: String,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    0.5
}

/// A category field to break results down by. An empty `categories` list
/// means "whatever values occur in the data, first-seen order".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingSpec {
    pub label: String,
    pub field: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl GroupingSpec {
    pub fn new(label: &str, field: &str, categories: &[&str]) -> Self {
        GroupingSpec {
            label: label.to_string(),
            field: field.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Metric means along an ordered category axis (e.g. tenure bands).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSpec {
    pub label: String,
    pub field: String,
    pub categories: Vec<String>,
    pub metrics: Vec<String>,
}

/// Per-group scatter of one metric's mean against the share of another
/// metric at or above `y_at_least`, split into quadrants by the cut lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadrantSpec {
    pub x_metric: String,
    pub y_metric: String,
    pub y_at_least: f64,
    pub x_cut: f64,
    pub y_cut: f64,
}

/// Keywords that tag a free-text comment with a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSpec {
    pub name: String,
    pub keywords: Vec<String>,
}

impl ThemeSpec {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        ThemeSpec {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Free-text question analysed for sentiment and recurring themes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysisSpec {
    pub label: String,
    pub field: String,
    #[serde(default)]
    pub themes: Vec<ThemeSpec>,
}

/// Traffic-light bands for a KPI value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub good: f64,
    pub warning: f64,
    #[serde(default = "default_higher_is_better")]
    pub higher_is_better: bool,
}

fn default_higher_is_better() -> bool {
    true
}

impl Bands {
    pub const fn higher(good: f64, warning: f64) -> Self {
        Bands {
            good,
            warning,
            higher_is_better: true,
        }
    }

    pub const fn lower(good: f64, warning: f64) -> Self {
        Bands {
            good,
            warning,
            higher_is_better: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KpiSpec {
    Mean {
        label: String,
        metric: String,
        bands: Bands,
    },
    Nps {
        label: String,
        metric: String,
        bands: Bands,
    },
    PercentAtLeast {
        label: String,
        metric: String,
        threshold: f64,
        bands: Bands,
    },
    SampleSize {
        label: String,
    },
}

impl KpiSpec {
    pub fn label(&self) -> &str {
        match self {
            KpiSpec::Mean { label, .. }
            | KpiSpec::Nps { label, .. }
            | KpiSpec::PercentAtLeast { label, .. }
            | KpiSpec::SampleSize { label } => label,
        }
    }

    pub fn metric(&self) -> Option<&str> {
        match self {
            KpiSpec::Mean { metric, .. }
            | KpiSpec::Nps { metric, .. }
            | KpiSpec::PercentAtLeast { metric, .. } => Some(metric),
            KpiSpec::SampleSize { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DashboardConfig
// ---------------------------------------------------------------------------

/// Everything that makes one survey dashboard different from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub title: String,
    /// Rows missing this field are dropped at load time.
    #[serde(default)]
    pub id_field: Option<String>,
    pub metrics: Vec<MetricDefinition>,
    #[serde(default)]
    pub category_filters: Vec<String>,
    #[serde(default)]
    pub threshold_filter: Option<ThresholdFilterSpec>,
    /// Primary grouping for the "metric by group" bar chart.
    #[serde(default)]
    pub group_field: Option<String>,
    /// Breakdown shown when a bar of the primary chart is selected.
    #[serde(default)]
    pub drill_down: Option<GroupingSpec>,
    #[serde(default)]
    pub comparisons: Vec<GroupingSpec>,
    #[serde(default)]
    pub comparison_metrics: Vec<String>,
    #[serde(default)]
    pub trend: Option<TrendSpec>,
    #[serde(default)]
    pub correlation_metrics: Vec<String>,
    #[serde(default)]
    pub risk_quadrant: Option<QuadrantSpec>,
    #[serde(default)]
    pub kpis: Vec<KpiSpec>,
    #[serde(default)]
    pub text_analysis: Option<TextAnalysisSpec>,
}

impl DashboardConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn metric(&self, id: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.id == id)
    }

    /// Check internal consistency; schema checks against a dataset happen
    /// later in the metric registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let mut ids = BTreeSet::new();
        for m in &self.metrics {
            if !ids.insert(m.id.as_str()) {
                return invalid(format!("metric id '{}' is defined twice", m.id));
            }
            if m.scale.min >= m.scale.max {
                return invalid(format!("metric '{}' has an empty scale", m.id));
            }
            if let Some(nps) = m.nps {
                if nps.detractor_at_most >= nps.promoter_at_least {
                    return invalid(format!(
                        "metric '{}': detractor threshold must be below promoter threshold",
                        m.id
                    ));
                }
            }
            if let Some(at_least) = m.top_box_at_least {
                if !m.scale.contains(at_least) {
                    return invalid(format!(
                        "metric '{}': top-box bound {at_least} is outside the scale",
                        m.id
                    ));
                }
            }
        }

        if let Some(t) = &self.threshold_filter {
            if t.min >= t.max {
                return invalid(format!("threshold filter on '{}' has an empty range", t.metric));
            }
            if t.step <= 0.0 {
                return invalid(format!("threshold filter on '{}' needs a positive step", t.metric));
            }
        }

        if let Some(text) = &self.text_analysis {
            let mut names = BTreeSet::new();
            for theme in &text.themes {
                if !names.insert(theme.name.as_str()) {
                    return invalid(format!("theme '{}' is defined twice", theme.name));
                }
                if theme.keywords.iter().all(|k| k.trim().is_empty()) {
                    return invalid(format!("theme '{}' has no keywords", theme.name));
                }
            }
        }

        let mut referenced: Vec<&str> = Vec::new();
        referenced.extend(self.threshold_filter.iter().map(|t| t.metric.as_str()));
        referenced.extend(self.comparison_metrics.iter().map(String::as_str));
        referenced.extend(self.correlation_metrics.iter().map(String::as_str));
        if let Some(trend) = &self.trend {
            referenced.extend(trend.metrics.iter().map(String::as_str));
        }
        if let Some(q) = &self.risk_quadrant {
            referenced.push(&q.x_metric);
            referenced.push(&q.y_metric);
        }
        referenced.extend(self.kpis.iter().filter_map(KpiSpec::metric));

        match referenced.into_iter().find(|id| !ids.contains(id)) {
            Some(id) => invalid(format!("unknown metric id '{id}'")),
            None => Ok(()),
        }
    }

    /// Faculty satisfaction survey: 1–5 Likert questions, eNPS on a 1–5
    /// recommendation question.
    pub fn faculty_satisfaction() -> Self {
        let likert = |id: &str, label: &str| MetricDefinition::new(id, label, Scale::LIKERT_5);

        DashboardConfig {
            title: "Faculty Satisfaction Survey".to_string(),
            id_field: Some("ResponseID".to_string()),
            metrics: vec![
                likert("Q8_OverallSatisfaction", "Overall Satisfaction").with_top_box(4.0),
                likert("Q9_LikelihoodToRecommend", "Likelihood to Recommend").with_nps(4.0, 2.0),
                likert("Q10_ConsideredLeaving", "Considered Leaving"),
                likert("Q13_WorkLifeBalance", "Work-Life Balance").with_top_box(4.0),
                likert("Q22_Compensation", "Compensation").with_top_box(4.0),
                likert("Q26_PsychologicalSafety", "Psychological Safety").with_top_box(4.0),
                likert("Q27_Belonging", "Belonging").with_top_box(4.0),
            ],
            category_filters: ["College", "Gender", "Rank", "Discipline", "YearsAtInstitution"]
                .map(String::from)
                .to_vec(),
            threshold_filter: Some(ThresholdFilterSpec {
                metric: "Q8_OverallSatisfaction".to_string(),
                min: 1.0,
                max: 5.0,
                step: 0.5,
            }),
            group_field: Some("College".to_string()),
            drill_down: Some(GroupingSpec::new(
                "Gender",
                "Gender",
                &["Man", "Woman", "Non-binary"],
            )),
            comparisons: vec![
                GroupingSpec::new("Gender", "Gender", &["Man", "Woman", "Non-binary"]),
                GroupingSpec::new(
                    "Race",
                    "Race",
                    &["White", "Asian", "Black or African American", "Hispanic or Latino/a/x"],
                ),
                GroupingSpec::new(
                    "Rank",
                    "Rank",
                    &["Professor", "Associate Professor", "Assistant Professor"],
                ),
                GroupingSpec::new(
                    "Discipline",
                    "Discipline",
                    &["STEM", "Social Sciences", "Humanities", "Business"],
                ),
            ],
            comparison_metrics: [
                "Q8_OverallSatisfaction",
                "Q27_Belonging",
                "Q26_PsychologicalSafety",
                "Q13_WorkLifeBalance",
            ]
            .map(String::from)
            .to_vec(),
            trend: Some(TrendSpec {
                label: "Years at Institution".to_string(),
                field: "YearsAtInstitution".to_string(),
                categories: [
                    "0-2 years",
                    "3-5 years",
                    "6-10 years",
                    "11-15 years",
                    "16-20 years",
                    "More than 20 years",
                ]
                .map(String::from)
                .to_vec(),
                metrics: ["Q8_OverallSatisfaction", "Q13_WorkLifeBalance", "Q27_Belonging"]
                    .map(String::from)
                    .to_vec(),
            }),
            correlation_metrics: [
                "Q8_OverallSatisfaction",
                "Q13_WorkLifeBalance",
                "Q22_Compensation",
                "Q27_Belonging",
                "Q26_PsychologicalSafety",
            ]
            .map(String::from)
            .to_vec(),
            risk_quadrant: Some(QuadrantSpec {
                x_metric: "Q8_OverallSatisfaction".to_string(),
                y_metric: "Q10_ConsideredLeaving".to_string(),
                y_at_least: 4.0,
                x_cut: 3.5,
                y_cut: 25.0,
            }),
            kpis: vec![
                KpiSpec::Mean {
                    label: "Overall Satisfaction".to_string(),
                    metric: "Q8_OverallSatisfaction".to_string(),
                    bands: Bands::higher(4.0, 3.5),
                },
                KpiSpec::Nps {
                    label: "eNPS".to_string(),
                    metric: "Q9_LikelihoodToRecommend".to_string(),
                    bands: Bands::higher(30.0, 10.0),
                },
                KpiSpec::PercentAtLeast {
                    label: "Retention Risk".to_string(),
                    metric: "Q10_ConsideredLeaving".to_string(),
                    threshold: 4.0,
                    bands: Bands::lower(20.0, 30.0),
                },
                KpiSpec::Mean {
                    label: "Belonging".to_string(),
                    metric: "Q27_Belonging".to_string(),
                    bands: Bands::higher(4.0, 3.5),
                },
                KpiSpec::Mean {
                    label: "Psychological Safety".to_string(),
                    metric: "Q26_PsychologicalSafety".to_string(),
                    bands: Bands::higher(4.0, 3.5),
                },
                KpiSpec::SampleSize {
                    label: "Sample Size".to_string(),
                },
            ],
            text_analysis: None,
        }
    }

    /// Staff development day feedback: 0–10 recommendation questions per
    /// session (promoters 9–10, detractors 0–6) and 0–10 event ratings.
    pub fn staff_development() -> Self {
        let nps = |id: &str, label: &str| {
            MetricDefinition::new(id, label, Scale::ZERO_TO_TEN)
                .with_nps(9.0, 6.0)
                .with_top_box(8.0)
        };
        let rating = |id: &str, label: &str| {
            MetricDefinition::new(id, label, Scale::ZERO_TO_TEN).with_top_box(8.0)
        };
        let sessions = [
            "Overall_NPS",
            "Morning_Keynote_NPS",
            "Fireside_NPS",
            "Afternoon_Keynote_NPS",
            "Morning_Breakout_NPS",
            "Afternoon_Breakout_NPS",
        ]
        .map(String::from)
        .to_vec();

        DashboardConfig {
            title: "Staff Development Day".to_string(),
            id_field: Some("RespondentID".to_string()),
            metrics: vec![
                nps("Overall_NPS", "Overall Event"),
                nps("Morning_Keynote_NPS", "Morning Keynote"),
                nps("Fireside_NPS", "Fireside Chat"),
                nps("Afternoon_Keynote_NPS", "Afternoon Keynote"),
                nps("Morning_Breakout_NPS", "Morning Breakout"),
                nps("Afternoon_Breakout_NPS", "Afternoon Breakout"),
                rating("Venue", "Venue"),
                rating("Organization_Flow", "Organization & Flow"),
                rating("Duration", "Duration"),
            ],
            category_filters: vec!["Department".to_string()],
            threshold_filter: Some(ThresholdFilterSpec {
                metric: "Overall_NPS".to_string(),
                min: 0.0,
                max: 10.0,
                step: 1.0,
            }),
            group_field: Some("Department".to_string()),
            drill_down: None,
            comparisons: vec![GroupingSpec::new("Department", "Department", &[])],
            comparison_metrics: sessions[1..].to_vec(),
            trend: None,
            correlation_metrics: ["Overall_NPS", "Venue", "Organization_Flow", "Duration"]
                .map(String::from)
                .to_vec(),
            risk_quadrant: None,
            kpis: vec![
                KpiSpec::Mean {
                    label: "Overall Satisfaction".to_string(),
                    metric: "Overall_NPS".to_string(),
                    bands: Bands::higher(8.0, 6.5),
                },
                KpiSpec::Nps {
                    label: "Net Promoter Score".to_string(),
                    metric: "Overall_NPS".to_string(),
                    bands: Bands::higher(30.0, 10.0),
                },
                KpiSpec::PercentAtLeast {
                    label: "Top-2 Box".to_string(),
                    metric: "Overall_NPS".to_string(),
                    threshold: 8.0,
                    bands: Bands::higher(70.0, 50.0),
                },
                KpiSpec::Mean {
                    label: "Venue Rating".to_string(),
                    metric: "Venue".to_string(),
                    bands: Bands::higher(8.0, 6.5),
                },
                KpiSpec::SampleSize {
                    label: "Total Responses".to_string(),
                },
            ],
            text_analysis: Some(TextAnalysisSpec {
                label: "Event feedback".to_string(),
                field: "Feedback".to_string(),
                themes: vec![
                    ThemeSpec::new(
                        "Session Timing & Duration",
                        &["time", "timing", "duration", "long", "short", "rushed", "downtime", "pacing", "schedule", "transition", "break"],
                    ),
                    ThemeSpec::new(
                        "Speaker/Facilitator Quality",
                        &["speaker", "facilitator", "presenter", "engaging", "informative", "disjointed", "hard to follow"],
                    ),
                    ThemeSpec::new(
                        "Content Relevance & Applicability",
                        &["relevant", "practical", "applicable", "useful", "content", "topic", "training", "skill"],
                    ),
                    ThemeSpec::new(
                        "Networking/Peer Interaction",
                        &["network", "colleague", "interact", "peer", "conversation", "connect"],
                    ),
                    ThemeSpec::new(
                        "Venue & Logistics",
                        &["venue", "room", "location", "food", "lunch", "breakfast", "catering", "setup"],
                    ),
                    ThemeSpec::new(
                        "Organization & Flow",
                        &["organization", "flow", "organized", "structure", "coordination"],
                    ),
                    ThemeSpec::new("Keynotes", &["keynote"]),
                    ThemeSpec::new("Breakouts", &["breakout", "session", "workshop"]),
                    ThemeSpec::new("Lunch/Fireside", &["fireside", "ai", "panel", "lunch"]),
                    ThemeSpec::new(
                        "Suggestions/Requests",
                        &["future", "would like", "suggest", "recommend", "next year", "more", "advanced", "deeper"],
                    ),
                ],
            }),
        }
    }

    /// Built-in dashboards, in the order the preset selector lists them.
    pub fn presets() -> Vec<DashboardConfig> {
        vec![Self::faculty_satisfaction(), Self::staff_development()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in DashboardConfig::presets() {
            preset.validate().unwrap();
        }
    }

    #[test]
    fn preset_survives_json_round_trip() {
        let preset = DashboardConfig::faculty_satisfaction();
        let text = serde_json::to_string_pretty(&preset).unwrap();
        assert_eq!(DashboardConfig::from_json(&text).unwrap(), preset);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let text = r#"{
            "title": "Pulse",
            "metrics": [{"id": "score", "label": "Score", "field": "Score", "scale": {"min": 1, "max": 5}}],
            "threshold_filter": {"metric": "score", "min": 1, "max": 5},
            "kpis": [{"kind": "mean", "label": "Avg", "metric": "score", "bands": {"good": 4, "warning": 3}}]
        }"#;
        let config = DashboardConfig::from_json(text).unwrap();
        assert_eq!(config.threshold_filter.unwrap().step, 0.5);
        assert!(config.comparisons.is_empty());
        match &config.kpis[0] {
            KpiSpec::Mean { bands, .. } => assert!(bands.higher_is_better),
            other => panic!("unexpected kpi {other:?}"),
        }
    }

    #[test]
    fn rejects_inconsistent_configs() {
        let mut config = DashboardConfig::faculty_satisfaction();
        config.correlation_metrics.push("Q99_Unknown".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("Q99_Unknown")));

        let mut config = DashboardConfig::staff_development();
        config.metrics[0].nps = Some(NpsThresholds {
            promoter_at_least: 6.0,
            detractor_at_most: 6.0,
        });
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::staff_development();
        let dup = config.metrics[0].clone();
        config.metrics.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_or_empty_themes() {
        let mut config = DashboardConfig::staff_development();
        if let Some(text) = config.text_analysis.as_mut() {
            text.themes.push(ThemeSpec::new("Keynotes", &["speech"]));
        }
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("defined twice")));

        let mut config = DashboardConfig::staff_development();
        if let Some(text) = config.text_analysis.as_mut() {
            text.themes.push(ThemeSpec::new("Parking", &[" "]));
        }
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("no keywords")));
    }

    #[test]
    fn rejects_nonsensical_slider_and_top_box() {
        let mut config = DashboardConfig::faculty_satisfaction();
        if let Some(t) = config.threshold_filter.as_mut() {
            t.min = 5.0;
        }
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("empty range")));

        let mut config = DashboardConfig::faculty_satisfaction();
        if let Some(t) = config.threshold_filter.as_mut() {
            t.step = 0.0;
        }
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("positive step")));

        let mut config = DashboardConfig::faculty_satisfaction();
        config.metrics[0].top_box_at_least = Some(8.0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("top-box")));
    }
}

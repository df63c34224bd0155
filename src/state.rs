use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::analytics::metrics::{MetricRegistry, SchemaIssue};
use crate::config::DashboardConfig;
use crate::dashboard::{self, Dashboard, ViewSelection};
use crate::data::export;
use crate::data::filter::{self, CategoryConstraint, Filter};
use crate::data::loader::{self, LoadOptions};
use crate::data::model::{CellValue, Dataset, Row};
use crate::render::Chart;
use crate::report;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct DashboardState {
    pub config: DashboardConfig,

    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Dataset>,

    /// File the dataset came from.
    pub source: Option<PathBuf>,

    /// Metrics of `config` available in `dataset`.
    pub registry: MetricRegistry,

    /// Configured metrics the dataset cannot provide.
    pub schema_issues: Vec<SchemaIssue>,

    pub filter: Filter,

    /// Indices of rows passing `filter` (cached).
    pub visible_indices: Vec<usize>,

    pub view: ViewSelection,

    /// Label of the primary group whose drill-down is open.
    pub drill_down: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            dataset: None,
            source: None,
            registry: MetricRegistry::default(),
            schema_issues: Vec::new(),
            filter: Filter::default(),
            visible_indices: Vec::new(),
            view: ViewSelection::default(),
            drill_down: None,
            status_message: None,
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            id_field: self.config.id_field.clone(),
        }
    }

    /// Load a file. On failure the previous dataset is discarded and the
    /// error becomes the status message, so nothing stale is rendered.
    pub fn load(&mut self, path: &Path) {
        match loader::load_file(path, &self.load_options()) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} responses ({} columns) from {}",
                    dataset.len(),
                    dataset.column_names.len(),
                    path.display()
                );
                self.set_dataset(dataset);
                self.source = Some(path.to_path_buf());
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.dataset = None;
                self.source = None;
                self.registry = MetricRegistry::default();
                self.schema_issues.clear();
                self.visible_indices.clear();
                self.drill_down = None;
                self.status_message = Some(format!("Error loading file: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset: resolve metrics and clear filters.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        let (registry, issues) = MetricRegistry::resolve(&self.config.metrics, &dataset);
        self.registry = registry;
        self.status_message = (!issues.is_empty()).then(|| {
            let list: Vec<String> = issues.iter().map(ToString::to_string).collect();
            list.join("\n")
        });
        self.schema_issues = issues;
        self.filter.reset();
        self.drill_down = None;
        self.dataset = Some(dataset);
        self.refilter();
    }

    /// Switch dashboard definition. The current file is reloaded since the
    /// config decides which rows are kept.
    pub fn set_config(&mut self, config: DashboardConfig) {
        log::info!("Switching dashboard to '{}'", config.title);
        self.config = config;
        self.view = ViewSelection::default();
        match self.source.clone() {
            Some(path) => self.load(&path),
            None => {
                if let Some(ds) = self.dataset.take() {
                    self.set_dataset(ds);
                }
            }
        }
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) {
        self.visible_indices = match &self.dataset {
            Some(ds) => filter::filtered_indices(&ds.rows, &self.filter),
            None => Vec::new(),
        };
        log::debug!("{} rows visible", self.visible_indices.len());
    }

    /// Toggle one value in a category filter. Ticking every value again
    /// removes the constraint.
    pub fn toggle_category(&mut self, field: &str, value: &CellValue) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let all = filter::all_values(ds, field);
        let mut selected = match self.filter.category(field) {
            CategoryConstraint::All => all.clone(),
            CategoryConstraint::OneOf(set) => set.clone(),
        };
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        let constraint = if selected == all {
            CategoryConstraint::All
        } else {
            CategoryConstraint::OneOf(selected)
        };
        self.filter.set_category(field, constraint);
        self.refilter();
    }

    pub fn is_selected(&self, field: &str, value: &CellValue) -> bool {
        self.filter.category(field).allows(value)
    }

    pub fn select_all(&mut self, field: &str) {
        self.filter.set_category(field, CategoryConstraint::All);
        self.refilter();
    }

    pub fn select_none(&mut self, field: &str) {
        self.filter
            .set_category(field, CategoryConstraint::OneOf(Default::default()));
        self.refilter();
    }

    /// Set or clear the minimum of the configured threshold filter. A minimum
    /// at the bottom of the slider range is no constraint.
    pub fn set_threshold(&mut self, min: Option<f64>) {
        let Some(spec) = &self.config.threshold_filter else {
            return;
        };
        let Some(field) = self.config.metric(&spec.metric).map(|m| m.field.clone()) else {
            return;
        };
        let min = min.filter(|&m| m > spec.min);
        self.filter.set_threshold(&field, min);
        self.refilter();
    }

    pub fn threshold(&self) -> Option<f64> {
        let spec = self.config.threshold_filter.as_ref()?;
        let def = self.config.metric(&spec.metric)?;
        self.filter.thresholds.get(&def.field).copied()
    }

    pub fn reset_filters(&mut self) {
        self.filter.reset();
        self.drill_down = None;
        self.refilter();
    }

    pub fn total_rows(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::len)
    }

    pub fn visible_rows(&self) -> Vec<&Row> {
        match &self.dataset {
            Some(ds) => self.visible_indices.iter().map(|&i| &ds.rows[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Everything to draw for the current state; `None` before a dataset loads.
    pub fn dashboard(&self) -> Option<Dashboard> {
        let ds = self.dataset.as_ref()?;
        Some(dashboard::build(
            &self.visible_rows(),
            ds,
            &self.config,
            &self.registry,
            &self.view,
        ))
    }

    pub fn drill_down_chart(&self) -> Option<Chart> {
        let group = self.drill_down.as_deref()?;
        dashboard::drill_down_chart(
            &self.visible_rows(),
            &self.config,
            &self.registry,
            &self.view,
            group,
        )
    }

    /// Human-readable list of active constraints.
    pub fn filter_descriptions(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (field, constraint) in &self.filter.categories {
            if let CategoryConstraint::OneOf(set) = constraint {
                let labels: Vec<String> = set.iter().map(ToString::to_string).collect();
                out.push(format!("{field}: {}", labels.join(", ")));
            }
        }
        for (field, min) in &self.filter.thresholds {
            let label = self
                .config
                .metrics
                .iter()
                .find(|m| &m.field == field)
                .map_or(field.as_str(), |m| m.label.as_str());
            out.push(format!("{label} ≥ {min}"));
        }
        out
    }

    /// Write the visible rows as CSV (or TSV for `.tsv` / `.txt` paths).
    pub fn export_visible(&self, path: &Path) -> Result<usize> {
        let ds = self.dataset.as_ref().context("no dataset loaded")?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
            _ => b',',
        };
        let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
        let rows = self.visible_rows();
        export::write_delimited(BufWriter::new(file), &ds.column_names, &rows, delimiter)
            .with_context(|| format!("could not write {}", path.display()))?;
        log::info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(rows.len())
    }

    /// Markdown report of the current dashboard.
    pub fn report(&self) -> Option<String> {
        let dashboard = self.dashboard()?;
        let title = self
            .dataset
            .as_ref()
            .and_then(Dataset::title)
            .unwrap_or(self.config.title.as_str());
        Some(report::build_report(
            title,
            &self.filter_descriptions(),
            self.visible_indices.len(),
            self.total_rows(),
            &dashboard,
        ))
    }

    pub fn write_report(&self, path: &Path) -> Result<()> {
        let text = self.report().context("no dataset loaded")?;
        std::fs::write(path, text).with_context(|| format!("could not write {}", path.display()))?;
        log::info!("Wrote report to {}", path.display());
        Ok(())
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DashboardConfig::faculty_satisfaction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACULTY: &str = "\
ResponseID,College,Gender,Q8_OverallSatisfaction,Q9_LikelihoodToRecommend,Q10_ConsideredLeaving
1,Engineering,Woman,5,5,1
2,Engineering,Man,4,4,2
3,Business,Man,2,1,5
,Business,Woman,3,3,4
5,Arts,Man,4,2,
";

    fn state() -> DashboardState {
        let mut state = DashboardState::default();
        let ds = loader::parse_delimited(FACULTY.as_bytes(), b',', &state.load_options()).unwrap();
        state.set_dataset(ds);
        state
    }

    #[test]
    fn rows_without_id_are_dropped_and_schema_gaps_reported() {
        let state = state();
        assert_eq!(state.total_rows(), 4);
        assert_eq!(state.visible_indices, vec![0, 1, 2, 3]);
        assert!(state.registry.get("Q27_Belonging").is_none());
        assert!(state.status_message.as_deref().unwrap().contains("Q27_Belonging"));
    }

    #[test]
    fn toggling_every_value_back_restores_identity() {
        let mut state = state();
        let arts = CellValue::parse("Arts");
        state.toggle_category("College", &arts);
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert!(!state.is_selected("College", &arts));

        state.toggle_category("College", &arts);
        assert!(state.filter.is_identity());
        assert_eq!(state.visible_indices.len(), 4);
    }

    #[test]
    fn unticking_a_value_keeps_rows_missing_that_field() {
        let mut state = DashboardState::default();
        let text = r#"[{"ResponseID": 1, "College": "Law", "Gender": "Woman"},
                       {"ResponseID": 2, "College": "Law"},
                       {"ResponseID": 3, "College": "Law", "Gender": "Man"}]"#;
        let ds = loader::parse_json(text, &state.load_options()).unwrap();
        state.set_dataset(ds);
        assert!(state.dataset.as_ref().unwrap().unique_values["Gender"].contains(&CellValue::Null));

        state.toggle_category("Gender", &CellValue::parse("Man"));
        assert_eq!(state.visible_indices, vec![0, 1]);
        state.toggle_category("Gender", &CellValue::Null);
        assert_eq!(state.visible_indices, vec![0]);
    }

    #[test]
    fn select_none_hides_everything_and_reset_restores() {
        let mut state = state();
        state.select_none("Gender");
        assert!(state.visible_indices.is_empty());
        assert!(state.dashboard().is_some());

        state.reset_filters();
        assert_eq!(state.visible_indices.len(), 4);
    }

    #[test]
    fn threshold_slider_filters_and_clears_at_minimum() {
        let mut state = state();
        state.set_threshold(Some(4.0));
        assert_eq!(state.visible_indices, vec![0, 1, 3]);
        assert_eq!(state.filter_descriptions(), vec!["Overall Satisfaction ≥ 4".to_string()]);

        state.set_threshold(Some(1.0));
        assert_eq!(state.threshold(), None);
        assert_eq!(state.visible_indices.len(), 4);
    }

    #[test]
    fn failed_load_clears_dataset() {
        let mut state = state();
        state.load(Path::new("does/not/exist.csv"));
        assert!(state.dataset.is_none());
        assert!(state.dashboard().is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error loading file"));
    }

    #[test]
    fn report_mentions_filters() {
        let mut state = state();
        state.toggle_category("College", &CellValue::parse("Arts"));
        let text = state.report().unwrap();
        assert!(text.starts_with("# Faculty Satisfaction Survey\nShowing 3 of 4 responses"));
        assert!(text.contains("- College: Business, Engineering"));
    }
}

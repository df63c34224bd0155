use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, Dataset, Row};

/// Selection label meaning "no constraint" for a category filter.
pub const ALL: &str = "all";

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Constraint on a category field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryConstraint {
    /// No constraint: every row passes.
    #[default]
    All,
    /// Row passes iff its value is in the set. An empty set hides every row.
    OneOf(BTreeSet<CellValue>),
}

impl CategoryConstraint {
    pub fn allows(&self, value: &CellValue) -> bool {
        match self {
            CategoryConstraint::All => true,
            CategoryConstraint::OneOf(allowed) => allowed.contains(value),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryConstraint::All)
    }

    /// Both constraints at once.
    pub fn and(&self, other: &CategoryConstraint) -> CategoryConstraint {
        match (self, other) {
            (CategoryConstraint::All, c) | (c, CategoryConstraint::All) => c.clone(),
            (CategoryConstraint::OneOf(a), CategoryConstraint::OneOf(b)) => {
                CategoryConstraint::OneOf(a.intersection(b).cloned().collect())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter – conjunction of constraints
// ---------------------------------------------------------------------------

/// A set of named constraints; a row is kept iff every constraint passes.
/// `Filter::default()` is the identity filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    /// Category field → allowed labels.
    pub categories: BTreeMap<String, CategoryConstraint>,
    /// Numeric field → minimum value (inclusive).
    pub thresholds: BTreeMap<String, f64>,
}

impl Filter {
    /// Build a filter from raw user selections.
    ///
    /// A selection list that is empty or contains [`ALL`] leaves the field
    /// unconstrained; a threshold that does not parse as a finite number is
    /// ignored. Nothing here can fail.
    pub fn from_selections<'a, I, S>(selections: I, thresholds: &[(&str, &str)]) -> Self
    where
        I: IntoIterator<Item = (&'a str, S)>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let mut filter = Filter::default();
        for (field, labels) in selections {
            let labels: Vec<String> = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
            if labels.is_empty() || labels.iter().any(|l| l.trim().eq_ignore_ascii_case(ALL)) {
                continue;
            }
            let allowed = labels.iter().map(|l| CellValue::parse(l)).collect();
            filter.set_category(field, CategoryConstraint::OneOf(allowed));
        }
        for (field, raw) in thresholds {
            match raw.trim().parse::<f64>() {
                Ok(min) if min.is_finite() => filter.set_threshold(field, Some(min)),
                _ => log::debug!("Ignoring unparsable threshold '{raw}' for {field}"),
            }
        }
        filter
    }

    /// Whether this is the identity filter.
    pub fn is_identity(&self) -> bool {
        self.thresholds.is_empty() && self.categories.values().all(CategoryConstraint::is_all)
    }

    /// Restore the identity filter.
    pub fn reset(&mut self) {
        self.categories.clear();
        self.thresholds.clear();
    }

    pub fn category(&self, field: &str) -> &CategoryConstraint {
        static UNCONSTRAINED: CategoryConstraint = CategoryConstraint::All;
        self.categories.get(field).unwrap_or(&UNCONSTRAINED)
    }

    pub fn set_category(&mut self, field: &str, constraint: CategoryConstraint) {
        if constraint.is_all() {
            self.categories.remove(field);
        } else {
            self.categories.insert(field.to_string(), constraint);
        }
    }

    /// Set (or clear, with `None`) the minimum for a numeric field.
    pub fn set_threshold(&mut self, field: &str, min: Option<f64>) {
        match min {
            Some(min) if min.is_finite() => {
                self.thresholds.insert(field.to_string(), min);
            }
            _ => {
                self.thresholds.remove(field);
            }
        }
    }

    /// The conjunction `self ∧ other`.
    pub fn and(&self, other: &Filter) -> Filter {
        let mut out = self.clone();
        for (field, constraint) in &other.categories {
            let merged = out.category(field).and(constraint);
            out.categories.insert(field.clone(), merged);
        }
        for (field, &min) in &other.thresholds {
            let merged = out.thresholds.get(field).map_or(min, |&cur| cur.max(min));
            out.thresholds.insert(field.clone(), merged);
        }
        out
    }

    /// Whether a single row satisfies every constraint.
    pub fn matches(&self, row: &Row) -> bool {
        self.categories
            .iter()
            .all(|(field, constraint)| constraint.allows(row.value(field)))
            && self
                .thresholds
                .iter()
                .all(|(field, &min)| row.number(field).is_some_and(|v| v >= min))
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Return indices of rows that pass the filter.
pub fn filtered_indices<R: Borrow<Row>>(rows: &[R], filter: &Filter) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| filter.matches(<R as Borrow<Row>>::borrow(row)))
        .map(|(i, _)| i)
        .collect()
}

/// The subset of `rows` passing the filter, in original order.
pub fn apply<'a, R: Borrow<Row>>(rows: &'a [R], filter: &Filter) -> Vec<&'a Row> {
    rows.iter()
        .map(<R as Borrow<Row>>::borrow)
        .filter(|row| filter.matches(row))
        .collect()
}

/// Every distinct value of `column`, i.e. the "everything ticked" selection
/// shown by the filter panel.
pub fn all_values(dataset: &Dataset, column: &str) -> BTreeSet<CellValue> {
    dataset.unique_values.get(column).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(college: &str, gender: Option<&str>, sat: Option<f64>) -> Row {
        let mut fields = BTreeMap::new();
        fields.insert("College".to_string(), CellValue::Label(college.to_string()));
        fields.insert(
            "Gender".to_string(),
            gender.map_or(CellValue::Null, |g| CellValue::Label(g.to_string())),
        );
        fields.insert(
            "Satisfaction".to_string(),
            sat.map_or(CellValue::Null, CellValue::Number),
        );
        Row::new(fields)
    }

    fn sample() -> Vec<Row> {
        vec![
            row("Engineering", Some("Woman"), Some(4.0)),
            row("Engineering", Some("Man"), Some(2.0)),
            row("Business", Some("Woman"), Some(5.0)),
            row("Arts", None, None),
            row("Business", Some("Non-binary"), Some(3.0)),
        ]
    }

    fn one_of(labels: &[&str]) -> CategoryConstraint {
        CategoryConstraint::OneOf(labels.iter().map(|l| CellValue::parse(l)).collect())
    }

    #[test]
    fn identity_filter_keeps_every_row() {
        let rows = sample();
        let kept = apply(&rows, &Filter::default());
        assert_eq!(kept.len(), rows.len());
        assert!(kept.iter().zip(&rows).all(|(a, b)| *a == b));
    }

    #[test]
    fn category_and_threshold_are_conjunctive() {
        let rows = sample();
        let mut f = Filter::default();
        f.set_category("College", one_of(&["Engineering", "Business"]));
        f.set_threshold("Satisfaction", Some(3.0));
        assert_eq!(filtered_indices(&rows, &f), vec![0, 2, 4]);
    }

    #[test]
    fn threshold_excludes_missing_values() {
        let rows = sample();
        let mut f = Filter::default();
        f.set_threshold("Satisfaction", Some(1.0));
        assert_eq!(filtered_indices(&rows, &f), vec![0, 1, 2, 4]);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let rows = sample();
        let mut f = Filter::default();
        f.set_category("Gender", CategoryConstraint::OneOf(BTreeSet::new()));
        assert!(apply(&rows, &f).is_empty());
    }

    #[test]
    fn selections_treat_all_and_garbage_as_no_op() {
        let f = Filter::from_selections(
            [("College", vec!["all", "Arts"]), ("Gender", vec![])],
            &[("Satisfaction", "not a number")],
        );
        assert!(f.is_identity());

        let f = Filter::from_selections([("Gender", vec!["Woman"])], &[("Satisfaction", "4")]);
        assert_eq!(filtered_indices(&sample(), &f), vec![0, 2]);
    }

    #[test]
    fn composition_equals_conjunction() {
        let rows = sample();
        let mut f1 = Filter::default();
        f1.set_category("College", one_of(&["Engineering", "Business"]));
        f1.set_threshold("Satisfaction", Some(2.0));
        let mut f2 = Filter::default();
        f2.set_category("College", one_of(&["Business", "Arts"]));
        f2.set_category("Gender", one_of(&["Woman", "Non-binary"]));
        f2.set_threshold("Satisfaction", Some(4.0));

        let first = apply(&rows, &f1);
        let stepwise = apply(&first, &f2);
        let combined = apply(&rows, &f1.and(&f2));
        assert_eq!(stepwise, combined);
        assert_eq!(combined.len(), 1);
    }

    #[test]
    fn reset_restores_identity() {
        let mut f = Filter::from_selections([("College", vec!["Arts"])], &[("Satisfaction", "2")]);
        assert!(!f.is_identity());
        f.reset();
        assert_eq!(f, Filter::default());
    }
}

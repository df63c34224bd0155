use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Deserialize;
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// CellValue – a single answer in a survey response
// ---------------------------------------------------------------------------

/// A dynamically-typed survey answer: a score, a category label, or nothing.
/// Used as a `BTreeSet` key by the filter widgets, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Likert / 0–10 score or any other finite number.
    Number(f64),
    /// Category label ("Engineering", "Woman", "3-5 years", ...).
    Label(String),
    /// Skipped or empty answer.
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                Label(_) => 2,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Label(a), Label(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Number(f) => f.to_bits().hash(state),
            CellValue::Label(s) => s.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Label(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, "<missing>"),
        }
    }
}

impl CellValue {
    /// Coerce a raw text cell: numeric-looking text becomes a number,
    /// empty text (or `NaN`) becomes null, everything else stays a label.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            Ok(_) => CellValue::Null,
            Err(_) => CellValue::Label(s.to_string()),
        }
    }

    /// The numeric value, if this cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text written back to a delimited file. Inverse of [`CellValue::parse`].
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one survey response
// ---------------------------------------------------------------------------

static MISSING: CellValue = CellValue::Null;

/// A single survey response (one row of the source table).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Field name → answer. Fields absent from the map read as null.
    pub fields: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(fields: BTreeMap<String, CellValue>) -> Self {
        Row { fields }
    }

    /// The answer for `field`, or null when the row has no such field.
    pub fn value(&self, field: &str) -> &CellValue {
        self.fields.get(field).unwrap_or(&MISSING)
    }

    /// The numeric answer for `field`, if present.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field).as_f64()
    }
}

// ---------------------------------------------------------------------------
// SurveyMetadata – the optional `metadata` section of a JSON document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SurveyMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub total_responses: Option<u64>,
    /// Anything else the producer wrote (survey dates, department counts, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded survey
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// All responses, in source order.
    pub rows: Vec<Row>,
    /// Field names in first-seen order (CSV header order).
    pub column_names: Vec<String>,
    /// For each column the sorted set of distinct values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
    /// Document metadata, when the source was a sectioned JSON document.
    pub metadata: Option<SurveyMetadata>,
    /// Pre-aggregated sections carried verbatim from a JSON document.
    pub sections: BTreeMap<String, JsonValue>,
}

impl Dataset {
    /// Build column indices from the loaded rows. `schema` fixes the column
    /// order; columns that only appear in rows are appended in first-seen order.
    /// Every row is padded with nulls so it carries every column.
    pub fn from_rows(schema: Vec<String>, mut rows: Vec<Row>) -> Self {
        let mut column_names = schema;
        let mut known: BTreeSet<String> = column_names.iter().cloned().collect();
        for row in &rows {
            for col in row.fields.keys() {
                if known.insert(col.clone()) {
                    column_names.push(col.clone());
                }
            }
        }

        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();
        for row in &mut rows {
            for col in &column_names {
                let val = row.fields.entry(col.clone()).or_insert(CellValue::Null);
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }

        Dataset {
            rows,
            column_names,
            unique_values,
            metadata: None,
            sections: BTreeMap::new(),
        }
    }

    /// Number of responses.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Display title: metadata title if the document carried one.
    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }
}

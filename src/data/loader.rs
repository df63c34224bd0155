use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, Dataset, Row, SurveyMetadata};

/// Keys under which a sectioned JSON document may carry its response rows.
const ROW_SECTION_KEYS: [&str; 4] = ["rows", "responses", "records", "data"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a dataset could not be loaded. The `Display` text is shown to the user.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("malformed delimited text")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Shape(String),
}

/// Loader behaviour that depends on the dashboard, not the file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Rows whose value for this field is missing are dropped.
    pub id_field: Option<String>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`        – array of response objects, or a sectioned document
/// * `.csv`         – comma-delimited table with a header row
/// * `.tsv`, `.txt` – tab-delimited table with a header row
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    match ext.as_str() {
        "json" => {
            let text = std::fs::read_to_string(path).map_err(io_err)?;
            parse_json(&text, options)
        }
        "csv" => parse_delimited(std::fs::File::open(path).map_err(io_err)?, b',', options),
        "tsv" | "txt" => {
            parse_delimited(std::fs::File::open(path).map_err(io_err)?, b'\t', options)
        }
        other => Err(LoadError::UnsupportedExtension(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Table layout: header row with field names, one response per line.
/// Short lines are padded with nulls; empty cells become null.
pub fn parse_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    options: &LoadOptions,
) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: BTreeMap<String, CellValue> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = record.get(i).map(CellValue::parse).unwrap_or(CellValue::Null);
                (name.clone(), value)
            })
            .collect();
        rows.push(Row::new(fields));
    }

    Ok(finish(headers, rows, options))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Two accepted shapes:
///
/// ```json
/// [ { "ResponseID": 1, "College": "Engineering", "Q8_OverallSatisfaction": 4 }, ... ]
/// ```
///
/// or a sectioned document whose response rows sit under `rows`,
/// `responses`, `records` or `data`:
///
/// ```json
/// {
///   "metadata": { "title": "Staff Development Day 2025", "total_responses": 120 },
///   "overall_metrics": { ... },
///   "responses": [ { ... }, ... ]
/// }
/// ```
pub fn parse_json(text: &str, options: &LoadOptions) -> Result<Dataset, LoadError> {
    let root: JsonValue = serde_json::from_str(text)?;

    let (records, metadata, sections) = match root {
        JsonValue::Array(records) => (records, None, BTreeMap::new()),
        JsonValue::Object(mut doc) => {
            let key = ROW_SECTION_KEYS
                .iter()
                .find(|k| doc.get(**k).is_some_and(JsonValue::is_array))
                .ok_or_else(|| {
                    LoadError::Shape(format!(
                        "JSON document has no response array (expected one of: {})",
                        ROW_SECTION_KEYS.join(", ")
                    ))
                })?;
            let records = match doc.remove(*key) {
                Some(JsonValue::Array(records)) => records,
                _ => Vec::new(),
            };
            let metadata = doc
                .remove("metadata")
                .map(serde_json::from_value::<SurveyMetadata>)
                .transpose()?;
            (records, metadata, doc.into_iter().collect())
        }
        _ => {
            return Err(LoadError::Shape(
                "expected a JSON array of responses or a sectioned document".to_string(),
            ))
        }
    };

    let mut schema: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Shape(format!("response {i} is not a JSON object")))?;

        let mut fields = BTreeMap::new();
        for (key, val) in obj {
            if seen.insert(key.clone()) {
                schema.push(key.clone());
            }
            fields.insert(key.clone(), json_to_cell(val));
        }
        rows.push(Row::new(fields));
    }

    let mut dataset = finish(schema, rows, options);
    dataset.metadata = metadata;
    dataset.sections = sections;
    Ok(dataset)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::parse(s),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => CellValue::Number(f),
            _ => CellValue::Label(n.to_string()),
        },
        JsonValue::Null => CellValue::Null,
        JsonValue::Bool(b) => CellValue::Label(b.to_string()),
        other => CellValue::Label(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Shared post-processing
// ---------------------------------------------------------------------------

/// Drop rows without an identifier and build the column index.
fn finish(schema: Vec<String>, rows: Vec<Row>, options: &LoadOptions) -> Dataset {
    let total = rows.len();
    let rows: Vec<Row> = match &options.id_field {
        Some(id) => {
            if !schema.iter().any(|c| c == id) {
                log::warn!("Identifier field '{id}' not present in the data; every row will be dropped");
            }
            rows.into_iter().filter(|r| !r.value(id).is_null()).collect()
        }
        None => rows,
    };
    if rows.len() < total {
        log::warn!("Dropped {} of {total} rows lacking an identifier", total - rows.len());
    }
    Dataset::from_rows(schema, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id() -> LoadOptions {
        LoadOptions {
            id_field: Some("ResponseID".to_string()),
        }
    }

    #[test]
    fn csv_coerces_cells_and_drops_rows_without_id() {
        let text = "ResponseID,College,Q8_OverallSatisfaction\n\
                    1,Engineering,4\n\
                    ,Business,5\n\
                    3,Arts,\n";
        let ds = parse_delimited(text.as_bytes(), b',', &with_id()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, vec!["ResponseID", "College", "Q8_OverallSatisfaction"]);
        assert_eq!(ds.rows[0].number("Q8_OverallSatisfaction"), Some(4.0));
        assert_eq!(ds.rows[0].value("College"), &CellValue::Label("Engineering".into()));
        assert!(ds.rows[1].value("Q8_OverallSatisfaction").is_null());
    }

    #[test]
    fn short_lines_are_padded_with_nulls() {
        let text = "ResponseID\tGender\tScore\n7\tWoman\n";
        let ds = parse_delimited(text.as_bytes(), b'\t', &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.rows[0].value("Score").is_null());
    }

    #[test]
    fn json_array_of_records() {
        let text = r#"[{"ResponseID": 1, "Gender": "Man", "Score": "4"},
                       {"ResponseID": 2, "Gender": null, "Score": 9.5}]"#;
        let ds = parse_json(text, &with_id()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, vec!["ResponseID", "Gender", "Score"]);
        assert_eq!(ds.rows[0].number("Score"), Some(4.0));
        assert!(ds.rows[1].value("Gender").is_null());
        assert!(ds.metadata.is_none());
    }

    #[test]
    fn sectioned_json_keeps_metadata_and_sections() {
        let text = r#"{
            "metadata": {"title": "Staff Development Day", "total_responses": 2, "survey_end": "2025-03-01"},
            "overall_metrics": {"nps": {"nps_value": 41.0}},
            "responses": [{"ResponseID": "a1", "Overall_NPS": 10}, {"ResponseID": "a2", "Overall_NPS": 6}]
        }"#;
        let ds = parse_json(text, &with_id()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.title(), Some("Staff Development Day"));
        let meta = ds.metadata.as_ref().unwrap();
        assert_eq!(meta.total_responses, Some(2));
        assert!(meta.extra.contains_key("survey_end"));
        assert!(ds.sections.contains_key("overall_metrics"));
    }

    #[test]
    fn malformed_sources_report_errors() {
        assert!(matches!(
            parse_json("{not json", &LoadOptions::default()),
            Err(LoadError::Json(_))
        ));
        assert!(matches!(
            parse_json(r#"{"metadata": {}}"#, &LoadOptions::default()),
            Err(LoadError::Shape(_))
        ));
        assert!(matches!(
            parse_json(r#"[1, 2]"#, &LoadOptions::default()),
            Err(LoadError::Shape(_))
        ));
        assert!(matches!(
            load_file(Path::new("survey.xlsx"), &LoadOptions::default()),
            Err(LoadError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
        assert!(matches!(
            load_file(Path::new("/nonexistent/survey.csv"), &LoadOptions::default()),
            Err(LoadError::Io { .. })
        ));
    }
}

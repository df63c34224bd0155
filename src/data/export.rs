use std::borrow::Borrow;
use std::io::Write;

use super::model::Row;

/// Write `rows` as a delimited table with a header row.
///
/// Columns follow `schema`; missing values are written as empty cells, so
/// loading the output with the same delimiter reproduces the rows.
pub fn write_delimited<W: Write, R: Borrow<Row>>(
    writer: W,
    schema: &[String],
    rows: &[R],
    delimiter: u8,
) -> Result<(), csv::Error> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    out.write_record(schema)?;
    for row in rows {
        let row = <R as Borrow<Row>>::borrow(row);
        out.write_record(schema.iter().map(|field| row.value(field).to_field()))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{self, Filter};
    use crate::data::loader::{parse_delimited, parse_json, LoadOptions};

    const SOURCE: &str = "ResponseID,College,Gender,Q8_OverallSatisfaction\n\
                          1,Engineering,Woman,4\n\
                          2,\"Arts, Letters\",,2.5\n\
                          3,Business,Man,\n\
                          4,Engineering,Man,5\n";

    #[test]
    fn filtered_subset_survives_a_round_trip() {
        let ds = parse_delimited(SOURCE.as_bytes(), b',', &LoadOptions::default()).unwrap();
        let mut f = Filter::default();
        f.set_threshold("Q8_OverallSatisfaction", Some(2.0));
        let subset = filter::apply(&ds.rows, &f);
        assert_eq!(subset.len(), 3);

        let mut buf = Vec::new();
        write_delimited(&mut buf, &ds.column_names, &subset, b',').unwrap();
        let reparsed = parse_delimited(buf.as_slice(), b',', &LoadOptions::default()).unwrap();

        assert_eq!(reparsed.column_names, ds.column_names);
        assert_eq!(reparsed.rows.len(), subset.len());
        assert!(reparsed.rows.iter().zip(&subset).all(|(a, b)| a == *b));
    }

    #[test]
    fn sparse_json_rows_survive_a_round_trip() {
        let text = r#"[{"ResponseID": 1, "College": "Law", "Gender": "Woman", "Q8": 4},
                       {"ResponseID": 2, "College": "Arts", "Q8": 3},
                       {"ResponseID": 3, "Gender": "Man"}]"#;
        let ds = parse_json(text, &LoadOptions::default()).unwrap();

        let mut buf = Vec::new();
        write_delimited(&mut buf, &ds.column_names, &ds.rows, b',').unwrap();
        let reparsed = parse_delimited(buf.as_slice(), b',', &LoadOptions::default()).unwrap();

        assert_eq!(reparsed.column_names, ds.column_names);
        assert_eq!(reparsed.rows, ds.rows);
        assert_eq!(reparsed.unique_values, ds.unique_values);
    }

    #[test]
    fn header_follows_schema_order() {
        let ds = parse_delimited(SOURCE.as_bytes(), b',', &LoadOptions::default()).unwrap();
        let mut buf = Vec::new();
        write_delimited(&mut buf, &ds.column_names, &ds.rows[..1], b'\t').unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "ResponseID\tCollege\tGender\tQ8_OverallSatisfaction\n1\tEngineering\tWoman\t4\n"
        );
    }
}

//! Multi-view batch output: CSV, JSON, language partitions, binarized view.
//!
//! Consumes a fully materialized batch — the field union cannot be computed
//! until every record has been seen, so writing is a barrier after
//! extraction, never a streaming operation. Every view over one batch uses
//! the same discipline: header = lexicographically sorted union of field
//! names in the view's partition, absent fields as empty cells, lists
//! flattened to `"; "` in CSV and kept native in JSON. Files are written to
//! a `.tmp` sibling and renamed into place so readers never observe a
//! half-written view.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::OutputConfig;
use crate::models::{FieldValue, Record, Suggestion};

/// Create the output directory tree. Idempotent; an unwritable location is
/// a fatal configuration error.
pub fn ensure_output_dirs(output: &OutputConfig) -> Result<()> {
    for dir in [
        &output.images_dir,
        &output.data_dir,
        &output.suggestions_dir,
        &output.partitioned_dir,
    ] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Sorted union of all field names appearing in the batch.
pub fn field_union<'a>(records: &[&'a Record]) -> Vec<&'a str> {
    let mut names = BTreeSet::new();
    for record in records {
        for name in record.keys() {
            names.insert(name.as_str());
        }
    }
    names.into_iter().collect()
}

/// Write every view for one run's batch.
pub fn write_views(
    output: &OutputConfig,
    records: &[Record],
    suggestions: &[Suggestion],
) -> Result<()> {
    ensure_output_dirs(output)?;

    let all: Vec<&Record> = records.iter().collect();

    let records_csv = output.data_dir.join("records.csv");
    write_atomic(&records_csv, &render_csv(&all)?)?;
    let records_json = output.data_dir.join("records.json");
    write_atomic(&records_json, &render_json(&all)?)?;
    eprintln!(
        "Exported {} records to {} and {}",
        records.len(),
        records_csv.display(),
        records_json.display()
    );

    if !suggestions.is_empty() {
        let suggestion_records: Vec<Record> = suggestions.iter().map(|s| s.to_record()).collect();
        let refs: Vec<&Record> = suggestion_records.iter().collect();
        let suggestions_csv = output.suggestions_dir.join("suggestions.csv");
        write_atomic(&suggestions_csv, &render_csv(&refs)?)?;
        let suggestions_json = output.suggestions_dir.join("suggestions.json");
        write_atomic(&suggestions_json, &render_json(&refs)?)?;
        eprintln!(
            "Exported {} suggestions to {} and {}",
            suggestions.len(),
            suggestions_csv.display(),
            suggestions_json.display()
        );
    }

    for (language, partition) in partition_by_language(records) {
        let path = output.partitioned_dir.join(format!("{}_data.csv", language));
        write_atomic(&path, &render_csv(&partition)?)?;
        eprintln!("Exported {} {} records to {}", partition.len(), language, path.display());
    }

    let binary_path = output.partitioned_dir.join("binary_data.csv");
    write_atomic(&binary_path, &render_binary_csv(&all)?)?;
    eprintln!("Exported binarized view to {}", binary_path.display());

    Ok(())
}

/// Group records by their `detected_language` metadata field.
fn partition_by_language(records: &[Record]) -> BTreeMap<String, Vec<&Record>> {
    let mut partitions: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        let language = match record.get("detected_language") {
            Some(FieldValue::Text(lang)) if !lang.is_empty() => lang.clone(),
            _ => "english".to_string(),
        };
        partitions.entry(language).or_default().push(record);
    }
    partitions
}

/// Primary CSV projection: values via [`FieldValue::csv_cell`].
fn render_csv(records: &[&Record]) -> Result<Vec<u8>> {
    let header = field_union(records);
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(&header)?;
        for record in records {
            let row: Vec<String> = header
                .iter()
                .map(|name| record.get(*name).map_or_else(String::new, FieldValue::csv_cell))
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Binarized CSV projection: values via [`FieldValue::binarize`], absent
/// fields as 0. Same union/ordering discipline as the primary CSV so rows
/// align column-for-column across views.
fn render_binary_csv(records: &[&Record]) -> Result<Vec<u8>> {
    let header = field_union(records);
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(&header)?;
        for record in records {
            let row: Vec<String> = header
                .iter()
                .map(|name| {
                    record
                        .get(*name)
                        .map_or(0, FieldValue::binarize)
                        .to_string()
                })
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Full-fidelity JSON array: every field and nested list exactly as
/// produced.
fn render_json(records: &[&Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

/// Write via a temporary sibling and an atomic rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Output path has no file name: {}", path.display()))?;
    let tmp = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    std::fs::write(&tmp, bytes)
        .with_context(|| format!("Cannot write output file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move output file into place: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn parse_csv(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(bytes);
        let mut rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        let header = rows.remove(0);
        (header, rows)
    }

    #[test]
    fn header_is_sorted_union_and_rows_are_never_ragged() {
        let a = record(&[
            ("zebra", FieldValue::Text("z".into())),
            ("alpha", FieldValue::Number(1.0)),
        ]);
        let b = record(&[
            ("mike", FieldValue::Text("m".into())),
            ("alpha", FieldValue::Null),
        ]);
        let bytes = render_csv(&[&a, &b]).unwrap();
        let (header, rows) = parse_csv(&bytes);

        assert_eq!(header, vec!["alpha", "mike", "zebra"]);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), header.len());
        }
        // Absent fields are empty cells, not omissions.
        assert_eq!(rows[0], vec!["1", "", "z"]);
        assert_eq!(rows[1], vec!["", "m", ""]);
    }

    #[test]
    fn lists_flatten_in_csv_but_round_trip_in_json() {
        let a = record(&[(
            "safety_issues",
            FieldValue::List(vec!["cracked slab".into(), "loose railing".into()]),
        )]);
        let csv_bytes = render_csv(&[&a]).unwrap();
        let (_, rows) = parse_csv(&csv_bytes);
        assert_eq!(rows[0][0], "cracked slab; loose railing");

        let json_bytes = render_json(&[&a]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json_bytes).unwrap();
        assert_eq!(
            parsed[0]["safety_issues"],
            serde_json::json!(["cracked slab", "loose railing"])
        );
    }

    #[test]
    fn binary_view_aligns_with_primary_view() {
        let a = record(&[
            ("cost", FieldValue::Number(120.0)),
            ("condition", FieldValue::Text("poor".into())),
        ]);
        let b = record(&[
            ("cost", FieldValue::Number(0.0)),
            ("notes", FieldValue::Null),
        ]);
        let primary = render_csv(&[&a, &b]).unwrap();
        let binary = render_binary_csv(&[&a, &b]).unwrap();
        let (primary_header, _) = parse_csv(&primary);
        let (binary_header, binary_rows) = parse_csv(&binary);

        assert_eq!(primary_header, binary_header);
        assert_eq!(binary_header, vec!["condition", "cost", "notes"]);
        assert_eq!(binary_rows[0], vec!["1", "1", "0"]);
        assert_eq!(binary_rows[1], vec!["0", "0", "0"]);
    }

    #[test]
    fn partitions_group_by_detected_language() {
        let english = record(&[("detected_language", FieldValue::Text("english".into()))]);
        let arabic = record(&[("detected_language", FieldValue::Text("arabic".into()))]);
        let untagged = record(&[("other", FieldValue::Null)]);
        let records = vec![english, arabic, untagged];
        let partitions = partition_by_language(&records);

        assert_eq!(partitions["english"].len(), 2);
        assert_eq!(partitions["arabic"].len(), 1);
    }

    #[test]
    fn write_views_leaves_no_tmp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            images_dir: tmp.path().join("images"),
            data_dir: tmp.path().join("data"),
            suggestions_dir: tmp.path().join("suggestions"),
            partitioned_dir: tmp.path().join("output"),
        };
        let records = vec![record(&[
            ("detected_language", FieldValue::Text("english".into())),
            ("building_name", FieldValue::Text("Tower".into())),
        ])];
        write_views(&output, &records, &[]).unwrap();

        assert!(output.data_dir.join("records.csv").exists());
        assert!(output.data_dir.join("records.json").exists());
        assert!(output.partitioned_dir.join("english_data.csv").exists());
        assert!(output.partitioned_dir.join("binary_data.csv").exists());
        // No suggestions → no suggestion files.
        assert!(!output.suggestions_dir.join("suggestions.csv").exists());

        let leftovers: Vec<_> = walkdir::WalkDir::new(tmp.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

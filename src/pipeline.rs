//! Pipeline orchestration.
//!
//! Coordinates the full run: corpus scan → per-document extraction,
//! language routing, schema construction, structured extraction, metadata
//! augmentation, suggestion generation → multi-view export. Documents are
//! processed sequentially and independently; no cross-document state exists
//! besides the final consolidation, which runs strictly after the batch is
//! materialized because the field union needs every record first.
//!
//! Per-document failures degrade in place — a corrupt file or a dead
//! provider still yields a row. Only a missing corpus root and unwritable
//! output directories abort the run.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::export;
use crate::extract;
use crate::language::{detect_language, Language};
use crate::models::{DocumentRef, ExtractedContent, FieldValue, Record, Suggestion};
use crate::progress::{JsonProgress, ProgressReporter, RunProgressEvent, StderrProgress};
use crate::provider;
use crate::scanner;
use crate::schema;
use crate::structuring::{self, DocumentContext};
use crate::suggest;

pub struct RunOptions {
    /// Process only the first N discovered documents.
    pub limit: Option<usize>,
    /// Discovery and counts only: no extraction, no provider calls, no writes.
    pub dry_run: bool,
    /// Emit machine-readable progress lines instead of the human format.
    pub json_progress: bool,
}

pub async fn run_pipeline(config: &Config, options: &RunOptions) -> Result<()> {
    let reporter: Box<dyn ProgressReporter> = if options.json_progress {
        Box::new(JsonProgress)
    } else {
        Box::new(StderrProgress)
    };

    reporter.report(RunProgressEvent::Discovering {
        layout: config.corpus.layout.clone(),
    });
    let mut documents = scanner::scan_corpus(&config.corpus)?;

    if let Some(limit) = options.limit {
        documents.truncate(limit);
    }

    if options.dry_run {
        println!("run {} (dry-run)", config.corpus.layout);
        println!("  documents found: {}", documents.len());
        return Ok(());
    }

    // Surface unwritable output locations before any provider spend.
    export::ensure_output_dirs(&config.output)?;

    let generator = provider::create_generator(&config.extraction)?;

    let mut rng: StdRng = match config.schema.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let total = documents.len() as u64;
    let mut records: Vec<Record> = Vec::with_capacity(documents.len());
    let mut suggestions: Vec<Suggestion> = Vec::new();
    let mut degraded = 0u64;
    let mut arabic_documents = 0u64;

    for (index, document) in documents.iter().enumerate() {
        reporter.report(RunProgressEvent::Processing {
            n: index as u64 + 1,
            total,
            source_id: document.source_id(),
        });

        let record_id = new_record_id();
        let content = extract::extract_document(document, &config.output.images_dir, &record_id);

        let language = detect_language(&content.text);
        if language == Language::Arabic {
            arabic_documents += 1;
        }

        // A sampled schema is rebuilt per document and never reused.
        let field_schema = match config.schema.mode.as_str() {
            "sampled" => schema::sampled_schema(
                language,
                config.schema.min_fields,
                config.schema.max_fields,
                &mut rng,
            ),
            _ => schema::inspection_schema(),
        };

        let timestamp = chrono::Utc::now().to_rfc3339();
        let context = DocumentContext {
            record_id: record_id.clone(),
            source_file: document.file_name.clone(),
            classification: document.classification.clone(),
            timestamp: timestamp.clone(),
        };

        let outcome = structuring::extract_record(
            generator.as_ref(),
            &config.extraction,
            &content.text,
            &field_schema,
            &context,
            language,
        )
        .await;
        if content.parse_failed || outcome.fell_back {
            degraded += 1;
        }

        let mut record = outcome.record;
        augment_record(&mut record, document, &record_id, &content, language, &timestamp);

        if config.suggestions.enabled {
            let generated = suggest::generate_suggestions(
                generator.as_ref(),
                &config.suggestions,
                &record,
                &record_id,
            )
            .await;
            suggestions.extend(generated);
        }

        records.push(record);
    }

    reporter.report(RunProgressEvent::Writing {
        records: records.len() as u64,
        suggestions: suggestions.len() as u64,
    });
    export::write_views(&config.output, &records, &suggestions)?;

    println!("run {}", config.corpus.layout);
    println!("  documents processed: {}", records.len());
    println!("  suggestions generated: {}", suggestions.len());
    println!("  degraded documents: {}", degraded);
    println!("  arabic documents: {}", arabic_documents);
    println!("  english documents: {}", total - arabic_documents);
    println!("ok");

    Ok(())
}

/// Directory keys and record ids use a fresh short unique id per document,
/// not the document name, so concurrent or repeated runs cannot collide.
fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Stamp the pipeline-computed metadata onto a record. This is a required
/// post-step for every record, extraction outcome notwithstanding — and
/// classification tags always come from the scanner, so a parent document's
/// tags reach its record unchanged no matter what the provider echoed.
fn augment_record(
    record: &mut Record,
    document: &DocumentRef,
    record_id: &str,
    content: &ExtractedContent,
    language: Language,
    timestamp: &str,
) {
    record.insert("record_id".into(), FieldValue::Text(record_id.to_string()));
    record.insert("source_file".into(), FieldValue::Text(document.file_name.clone()));
    record.insert(
        "detected_language".into(),
        FieldValue::Text(language.as_str().to_string()),
    );
    record.insert(
        "processing_timestamp".into(),
        FieldValue::Text(timestamp.to_string()),
    );
    record.insert(
        "image_count".into(),
        FieldValue::Number(content.images.len() as f64),
    );
    record.insert(
        "image_paths".into(),
        FieldValue::List(
            content
                .images
                .iter()
                .map(|image| image.path.display().to_string())
                .collect(),
        ),
    );
    record.insert(
        "document_size_mb".into(),
        FieldValue::Number(document_size_mb(document)),
    );

    if let Some(tags) = &document.classification {
        record.insert("city_name".into(), FieldValue::Text(tags.city.clone()));
        record.insert(
            "building_category".into(),
            FieldValue::Text(tags.category.clone()),
        );
        record.insert(
            "building_type".into(),
            FieldValue::Text(tags.building_type.clone()),
        );
        record.insert(
            "building_name".into(),
            FieldValue::Text(tags.building.clone()),
        );
    }
}

/// File size in megabytes, rounded to two decimals. A vanished file counts
/// as zero rather than failing the record.
fn document_size_mb(document: &DocumentRef) -> f64 {
    let bytes = std::fs::metadata(&document.path).map(|m| m.len()).unwrap_or(0);
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

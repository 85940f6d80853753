//! Core data models used throughout doc-distill.
//!
//! These types represent the documents, extracted content, field values, and
//! suggestion records that flow through the extraction and reporting pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Taxonomy tags attached to a document discovered under the nested corpus
/// layout (`root/city/category/type/building/<reports>/*.pdf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub city: String,
    pub category: String,
    pub building_type: String,
    pub building: String,
}

/// A discovered source document. Immutable once produced by the scanner.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub file_name: String,
    /// `None` for documents discovered under the flat layout.
    pub classification: Option<Classification>,
}

impl DocumentRef {
    /// Identity string used in diagnostics and progress output.
    pub fn source_id(&self) -> String {
        match &self.classification {
            Some(c) => format!(
                "{}/{}/{}/{}/{}",
                c.city, c.category, c.building_type, c.building, self.file_name
            ),
            None => self.file_name.clone(),
        }
    }
}

/// One embedded raster image persisted during extraction, addressed by
/// `(page, index)` so multiple images on one page stay distinct.
#[derive(Debug, Clone)]
pub struct SavedImage {
    pub page: u32,
    pub index: u32,
    pub path: PathBuf,
}

/// Everything the extractor produced for one document. Owned by the pipeline
/// for the lifetime of that document's processing.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// All pages' text concatenated in page order, no injected separators.
    pub text: String,
    pub images: Vec<SavedImage>,
    /// True when the document could not be opened at all. The pipeline still
    /// produces a row for it.
    pub parse_failed: bool,
}

/// A single field value inside a record.
///
/// Records are mappings with possibly-differing key sets, never fixed-shape
/// structs: sampled schemas change per document, so consumers reconcile via
/// field union rather than positional access.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl FieldValue {
    /// CSV projection. Lists collapse to a `"; "`-joined string since CSV has
    /// no native list type; the JSON view keeps them intact.
    pub fn csv_cell(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::List(items) => items.join("; "),
        }
    }

    /// Presence/positivity projection for the binarized view.
    ///
    /// Numbers map to 1 iff strictly positive, strings iff non-empty after
    /// trimming, lists iff their CSV projection is non-empty after trimming,
    /// null always to 0. Total and deterministic.
    pub fn binarize(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Text(s) => u8::from(!s.trim().is_empty()),
            FieldValue::Number(n) => u8::from(*n > 0.0),
            FieldValue::List(items) => u8::from(!items.join("; ").trim().is_empty()),
        }
    }
}

/// Render an f64 the way the CSV views expect: integral values without a
/// trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A structured record produced for one document: schema fields plus the
/// pipeline's fixed metadata fields, keyed by field name.
pub type Record = BTreeMap<String, FieldValue>;

/// A derived improvement suggestion for one record.
///
/// `category`, `title`, `description`, and `priority` are required; a
/// candidate payload missing any of them fails validation and is dropped.
/// Identity and lineage fields are stamped by the generator, not trusted
/// from the model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub suggestion_id: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(alias = "suggestion_type")]
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, alias = "ai_confidence")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub generated_at: String,
}

impl Suggestion {
    /// Flatten into the generic record shape so suggestion views share the
    /// union/sort discipline of the primary views.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("suggestion_id".into(), FieldValue::Text(self.suggestion_id.clone()));
        record.insert("record_id".into(), FieldValue::Text(self.record_id.clone()));
        record.insert("category".into(), FieldValue::Text(self.category.clone()));
        record.insert("title".into(), FieldValue::Text(self.title.clone()));
        record.insert("description".into(), FieldValue::Text(self.description.clone()));
        record.insert("priority".into(), FieldValue::Text(self.priority.clone()));
        record.insert(
            "estimated_cost".into(),
            self.estimated_cost.map_or(FieldValue::Null, FieldValue::Number),
        );
        record.insert(
            "timeline".into(),
            self.timeline.clone().map_or(FieldValue::Null, FieldValue::Text),
        );
        record.insert("benefits".into(), FieldValue::List(self.benefits.clone()));
        record.insert("risks".into(), FieldValue::List(self.risks.clone()));
        record.insert("requirements".into(), FieldValue::List(self.requirements.clone()));
        record.insert(
            "confidence".into(),
            self.confidence.map_or(FieldValue::Null, FieldValue::Number),
        );
        record.insert("generated_at".into(), FieldValue::Text(self.generated_at.clone()));
        record
    }
}

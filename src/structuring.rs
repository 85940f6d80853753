//! Structured extraction: (text, schema) → validated record.
//!
//! Builds the extraction prompt (bounded excerpt + machine-readable schema +
//! context metadata to echo), invokes the generative capability, and
//! validates every returned field against its declared semantic type.
//! Fields that fail validation become null rather than failing the record;
//! a failed call becomes a deterministic fallback record rather than an
//! error, so the batch always carries one row per document.

use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::language::Language;
use crate::models::{format_number, Classification, FieldValue, Record};
use crate::provider::Generator;
use crate::schema::{FieldKind, FieldSchema};

/// Context metadata echoed through the prompt and stamped onto every record
/// by the pipeline, extraction outcome notwithstanding.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub record_id: String,
    pub source_file: String,
    pub classification: Option<Classification>,
    pub timestamp: String,
}

/// The outcome of one structured-extraction attempt.
pub struct ExtractionOutcome {
    /// Schema-shaped record: every schema field present, valid values kept,
    /// invalid or missing ones null (or a domain default on fallback).
    pub record: Record,
    /// True when the provider call failed and the record is the fallback.
    pub fell_back: bool,
}

/// Extract a schema-shaped record from document text.
///
/// Never returns an error: provider failures and schema mismatches degrade
/// to the fallback record with a stderr diagnostic.
pub async fn extract_record(
    generator: &dyn Generator,
    config: &ExtractionConfig,
    text: &str,
    schema: &FieldSchema,
    context: &DocumentContext,
    language: Language,
) -> ExtractionOutcome {
    let prompt = build_prompt(text, schema, context, language, config.excerpt_chars);
    let response_schema = schema.to_response_schema();

    match generator.generate(&prompt, Some(&response_schema)).await {
        Ok(Value::Object(payload)) => {
            let mut record = Record::new();
            for field in &schema.fields {
                let value = payload
                    .get(&field.name)
                    .map_or(FieldValue::Null, |v| validate_value(field.kind, v));
                record.insert(field.name.clone(), value);
            }
            ExtractionOutcome {
                record,
                fell_back: false,
            }
        }
        Ok(other) => {
            eprintln!(
                "warning: {} returned a non-object payload for {}: using fallback record ({})",
                generator.name(),
                context.record_id,
                kind_of(&other)
            );
            ExtractionOutcome {
                record: fallback_record(schema),
                fell_back: true,
            }
        }
        Err(e) => {
            eprintln!(
                "warning: extraction failed for {}: {}: using fallback record",
                context.record_id, e
            );
            ExtractionOutcome {
                record: fallback_record(schema),
                fell_back: true,
            }
        }
    }
}

/// Validate one payload value against a declared semantic type. Anything
/// that does not fit becomes null.
pub fn validate_value(kind: FieldKind, value: &Value) -> FieldValue {
    match (kind, value) {
        (_, Value::Null) => FieldValue::Null,
        (FieldKind::Text | FieldKind::Date, Value::String(s)) => FieldValue::Text(s.clone()),
        (FieldKind::Number, Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() => FieldValue::Number(f),
            _ => FieldValue::Null,
        },
        // Models routinely quote numbers; accept plain numeric strings with
        // thousands separators.
        (FieldKind::Number, Value::String(s)) => {
            match s.trim().replace(',', "").parse::<f64>() {
                Ok(f) if f.is_finite() => FieldValue::Number(f),
                _ => FieldValue::Null,
            }
        }
        (FieldKind::TextList, Value::Array(items)) => FieldValue::List(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => n.as_f64().map(format_number),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => FieldValue::Null,
    }
}

/// The minimal fallback record: every schema field null except the domain
/// sentinels, which stay explicit so downstream filters can tell "the
/// extractor said nothing" from "the document said nothing".
fn fallback_record(schema: &FieldSchema) -> Record {
    let mut record = Record::new();
    for field in &schema.fields {
        let value = match field.name.as_str() {
            "structural_condition" | "maintenance_status" => {
                FieldValue::Text("undetermined".to_string())
            }
            "priority_level" => FieldValue::Text("medium".to_string()),
            "safety_issues" | "required_repairs" => FieldValue::List(Vec::new()),
            _ => FieldValue::Null,
        };
        record.insert(field.name.clone(), value);
    }
    record
}

/// First `max_chars` characters of `text`, never splitting a codepoint.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn build_prompt(
    text: &str,
    schema: &FieldSchema,
    context: &DocumentContext,
    language: Language,
    excerpt_chars: usize,
) -> String {
    let excerpt = excerpt(text, excerpt_chars);
    let schema_json = serde_json::to_string_pretty(&schema.to_response_schema())
        .unwrap_or_else(|_| "{}".to_string());
    let notes = context_notes(context);

    match language {
        Language::Arabic => format!(
            "حلل التقرير الفني التالي واستخرج المعلومات المهمة:\n\n\
             محتوى التقرير:\n{excerpt}\n\n\
             استخرج وقم ببناء البيانات وفقاً لهذا المخطط:\n{schema_json}\n\n\
             ملاحظات:\n{notes}\n\n\
             أرجع فقط بيانات JSON المطابقة للمخطط تماماً."
        ),
        Language::English => format!(
            "Analyze the following technical report and extract the important information.\n\n\
             Report content:\n{excerpt}\n\n\
             Extract and structure the data according to this schema:\n{schema_json}\n\n\
             Notes:\n{notes}\n\n\
             Return only the JSON data matching the schema exactly."
        ),
    }
}

/// Context metadata the model is asked to echo back verbatim.
fn context_notes(context: &DocumentContext) -> String {
    let mut notes = vec![
        format!("- record_id: {}", context.record_id),
        format!("- source_file: {}", context.source_file),
        format!("- processing_timestamp: {}", context.timestamp),
    ];
    if let Some(tags) = &context.classification {
        notes.push(format!("- city_name: {}", tags.city));
        notes.push(format!("- building_category: {}", tags.category));
        notes.push(format!("- building_type: {}", tags.building_type));
        notes.push(format!("- building_name: {}", tags.building));
    }
    notes.join("\n")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::inspection_schema;
    use anyhow::bail;
    use async_trait::async_trait;

    /// Test generator returning a canned payload (or failing).
    struct CannedGenerator(Option<Value>);

    #[async_trait]
    impl Generator for CannedGenerator {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _prompt: &str, _schema: Option<&Value>) -> anyhow::Result<Value> {
            match &self.0 {
                Some(value) => Ok(value.clone()),
                None => bail!("simulated provider outage"),
            }
        }
    }

    fn context() -> DocumentContext {
        DocumentContext {
            record_id: "rec-123".to_string(),
            source_file: "report.pdf".to_string(),
            classification: None,
            timestamp: "2026-08-06T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn valid_fields_kept_and_invalid_fields_nulled() {
        let schema = inspection_schema();
        let payload = serde_json::json!({
            "building_name": "Tower B",
            "floors_count": "12",
            "total_area": 850.5,
            "construction_year": "nineteen-eighty",
            "safety_issues": ["cracked slab", 3],
            "unrelated_field": "dropped",
        });
        let outcome = extract_record(
            &CannedGenerator(Some(payload)),
            &ExtractionConfig::default(),
            "some text",
            &schema,
            &context(),
            Language::English,
        )
        .await;

        assert!(!outcome.fell_back);
        let record = outcome.record;
        assert_eq!(record["building_name"], FieldValue::Text("Tower B".into()));
        assert_eq!(record["floors_count"], FieldValue::Number(12.0));
        assert_eq!(record["total_area"], FieldValue::Number(850.5));
        assert_eq!(record["construction_year"], FieldValue::Null);
        assert_eq!(
            record["safety_issues"],
            FieldValue::List(vec!["cracked slab".into(), "3".into()])
        );
        // Absent schema fields are present and null.
        assert_eq!(record["inspector_name"], FieldValue::Null);
        // Extra payload keys never leak into the record.
        assert!(!record.contains_key("unrelated_field"));
        // Field set equals the schema's key set.
        assert_eq!(record.len(), schema.fields.len());
    }

    #[tokio::test]
    async fn provider_failure_yields_fallback_sentinels() {
        let schema = inspection_schema();
        let outcome = extract_record(
            &CannedGenerator(None),
            &ExtractionConfig::default(),
            "some text",
            &schema,
            &context(),
            Language::English,
        )
        .await;

        assert!(outcome.fell_back);
        let record = outcome.record;
        assert_eq!(
            record["structural_condition"],
            FieldValue::Text("undetermined".into())
        );
        assert_eq!(
            record["maintenance_status"],
            FieldValue::Text("undetermined".into())
        );
        assert_eq!(record["priority_level"], FieldValue::Text("medium".into()));
        assert_eq!(record["safety_issues"], FieldValue::List(vec![]));
        assert_eq!(record["estimated_cost"], FieldValue::Null);
    }

    #[tokio::test]
    async fn non_object_payload_is_a_schema_mismatch() {
        let schema = inspection_schema();
        let outcome = extract_record(
            &CannedGenerator(Some(serde_json::json!(["not", "an", "object"]))),
            &ExtractionConfig::default(),
            "some text",
            &schema,
            &context(),
            Language::English,
        )
        .await;
        assert!(outcome.fell_back);
    }

    #[test]
    fn number_validation_accepts_separated_numerals_only() {
        assert_eq!(
            validate_value(FieldKind::Number, &serde_json::json!("1,250,000")),
            FieldValue::Number(1_250_000.0)
        );
        assert_eq!(
            validate_value(FieldKind::Number, &serde_json::json!("about thirty")),
            FieldValue::Null
        );
        assert_eq!(
            validate_value(FieldKind::Number, &serde_json::json!(true)),
            FieldValue::Null
        );
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "تقرير فني عن المبنى";
        let cut = excerpt(text, 6);
        assert_eq!(cut.chars().count(), 6);
        assert!(text.starts_with(cut));
        assert_eq!(excerpt("short", 100), "short");
    }

    #[test]
    fn prompt_embeds_excerpt_schema_and_context() {
        let schema = inspection_schema();
        let prompt = build_prompt("The load-bearing wall", &schema, &context(), Language::English, 8000);
        assert!(prompt.contains("The load-bearing wall"));
        assert!(prompt.contains("structural_condition"));
        assert!(prompt.contains("rec-123"));
        assert!(prompt.contains("report.pdf"));
    }
}

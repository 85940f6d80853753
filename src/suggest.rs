//! Derived improvement suggestions for extracted records.
//!
//! Summarizes a record's key fields into a second prompt (missing fields
//! render as an "undetermined" placeholder, never as a null), asks the
//! provider for 3–5 candidate suggestions, and validates each candidate
//! independently. A candidate that fails validation is dropped with a
//! diagnostic; a failed call yields an empty list. Partial success is the
//! steady state here, not an exception path.

use serde_json::Value;

use crate::config::SuggestionsConfig;
use crate::models::{FieldValue, Record, Suggestion};
use crate::provider::Generator;

/// Generate zero or more validated suggestions for one record.
///
/// Never returns an error: every failure mode degrades to fewer (or no)
/// suggestions so the parent record's processing is unaffected.
pub async fn generate_suggestions(
    generator: &dyn Generator,
    config: &SuggestionsConfig,
    record: &Record,
    record_id: &str,
) -> Vec<Suggestion> {
    let prompt = build_prompt(record, record_id);

    let payload = match generator.generate(&prompt, None).await {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("warning: suggestion generation failed for {}: {}", record_id, e);
            return Vec::new();
        }
    };

    // A single-object response is coerced to a one-element list.
    let candidates = match payload {
        Value::Array(items) => items,
        Value::Object(_) => vec![payload],
        other => {
            eprintln!(
                "warning: suggestion payload for {} is neither list nor object, dropping: {}",
                record_id, other
            );
            return Vec::new();
        }
    };

    let timestamp = chrono::Utc::now().to_rfc3339();
    let mut suggestions = Vec::new();

    for candidate in candidates {
        if suggestions.len() >= config.max_per_record {
            break;
        }
        match serde_json::from_value::<Suggestion>(candidate) {
            Ok(mut suggestion) => {
                // Identity and lineage are stamped here, not trusted from
                // the model response.
                suggestion.suggestion_id =
                    uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
                suggestion.record_id = record_id.to_string();
                suggestion.generated_at = timestamp.clone();
                suggestions.push(suggestion);
            }
            Err(e) => {
                eprintln!(
                    "warning: dropping invalid suggestion candidate for {}: {}",
                    record_id, e
                );
            }
        }
    }

    suggestions
}

/// Key record fields summarized for the prompt. Absent or null fields read
/// as "undetermined" so the prompt text never carries a hole.
const SUMMARY_FIELDS: &[(&str, &str)] = &[
    ("building_name", "Building name"),
    ("city_name", "City"),
    ("building_category", "Category"),
    ("building_type", "Type"),
    ("structural_condition", "Structural condition"),
    ("maintenance_status", "Maintenance status"),
    ("safety_issues", "Safety issues"),
    ("required_repairs", "Required repairs"),
    ("priority_level", "Priority level"),
];

fn build_prompt(record: &Record, record_id: &str) -> String {
    let summary: String = SUMMARY_FIELDS
        .iter()
        .map(|(name, label)| format!("- {}: {}\n", label, summary_field(record, name)))
        .collect();
    let schema = serde_json::to_string_pretty(&suggestion_response_schema())
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "Based on the following building information, generate improvement suggestions:\n\n\
         {summary}\n\
         Generate 3-5 distinct suggestions covering structural and safety work, \
         maintenance, modernization, energy efficiency, and general appearance. \
         For each suggestion give its category, a title and description, a priority \
         level, an estimated cost, a timeline, and the expected benefits, potential \
         risks, and requirements.\n\n\
         Return the suggestions as a JSON list where each item matches this schema:\n\
         {schema}\n\n\
         Notes:\n\
         - record_id: {record_id}\n\
         Return only a JSON list containing 3-5 suggestions."
    )
}

fn summary_field(record: &Record, name: &str) -> String {
    match record.get(name) {
        Some(FieldValue::List(items)) if !items.is_empty() => items.join(", "),
        Some(FieldValue::Text(s)) if !s.trim().is_empty() => s.clone(),
        Some(value @ FieldValue::Number(_)) => value.csv_cell(),
        _ => "undetermined".to_string(),
    }
}

/// The shape each candidate is validated against, rendered for the prompt.
fn suggestion_response_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "description": "Type of suggestion (structural, safety, maintenance, enhancement)" },
            "title": { "type": "string", "description": "Suggestion title" },
            "description": { "type": "string", "description": "Detailed description of the suggestion" },
            "priority": { "type": "string", "description": "Priority level (critical, high, medium, low)" },
            "estimated_cost": { "type": "number", "description": "Estimated implementation cost" },
            "timeline": { "type": "string", "description": "Recommended timeline for implementation" },
            "benefits": { "type": "array", "items": { "type": "string" }, "description": "Expected benefits" },
            "risks": { "type": "array", "items": { "type": "string" }, "description": "Potential risks" },
            "requirements": { "type": "array", "items": { "type": "string" }, "description": "Requirements for implementation" },
            "confidence": { "type": "number", "description": "Confidence score (0-1)" }
        },
        "required": ["category", "title", "description", "priority"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;

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

    fn valid_candidate(title: &str) -> Value {
        serde_json::json!({
            "category": "structural",
            "title": title,
            "description": "Reinforce the load-bearing columns.",
            "priority": "high",
            "benefits": ["longer service life"],
        })
    }

    #[tokio::test]
    async fn invalid_candidates_are_dropped_without_affecting_siblings() {
        let payload = serde_json::json!([
            valid_candidate("Reinforce columns"),
            { "category": "safety", "priority": "high" },
            valid_candidate("Seal roof cracks"),
        ]);
        let suggestions = generate_suggestions(
            &CannedGenerator(Some(payload)),
            &SuggestionsConfig::default(),
            &Record::new(),
            "rec-1",
        )
        .await;

        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.record_id == "rec-1"));
        assert!(suggestions.iter().all(|s| !s.suggestion_id.is_empty()));
        assert!(suggestions.iter().all(|s| !s.generated_at.is_empty()));
        assert_ne!(suggestions[0].suggestion_id, suggestions[1].suggestion_id);
    }

    #[tokio::test]
    async fn single_object_payload_is_coerced_to_one_element_list() {
        let suggestions = generate_suggestions(
            &CannedGenerator(Some(valid_candidate("Install fire doors"))),
            &SuggestionsConfig::default(),
            &Record::new(),
            "rec-2",
        )
        .await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Install fire doors");
    }

    #[tokio::test]
    async fn call_failure_yields_empty_list() {
        let suggestions = generate_suggestions(
            &CannedGenerator(None),
            &SuggestionsConfig::default(),
            &Record::new(),
            "rec-3",
        )
        .await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn garbage_payload_yields_empty_list() {
        let suggestions = generate_suggestions(
            &CannedGenerator(Some(serde_json::json!("just a string"))),
            &SuggestionsConfig::default(),
            &Record::new(),
            "rec-4",
        )
        .await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn candidate_count_is_capped() {
        let payload = Value::Array((0..9).map(|i| valid_candidate(&format!("s{i}"))).collect());
        let config = SuggestionsConfig {
            enabled: true,
            max_per_record: 5,
        };
        let suggestions =
            generate_suggestions(&CannedGenerator(Some(payload)), &config, &Record::new(), "rec-5")
                .await;
        assert_eq!(suggestions.len(), 5);
    }

    #[test]
    fn summary_renders_undetermined_for_missing_fields() {
        let mut record = Record::new();
        record.insert("building_name".into(), FieldValue::Text("Tower B".into()));
        record.insert("structural_condition".into(), FieldValue::Null);
        record.insert(
            "safety_issues".into(),
            FieldValue::List(vec!["cracked slab".into(), "exposed rebar".into()]),
        );

        let prompt = build_prompt(&record, "rec-6");
        assert!(prompt.contains("Building name: Tower B"));
        assert!(prompt.contains("Structural condition: undetermined"));
        assert!(prompt.contains("Safety issues: cracked slab, exposed rebar"));
        assert!(prompt.contains("City: undetermined"));
    }
}
